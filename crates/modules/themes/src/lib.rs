//! Theme-scoped custom property tables and themed rule expansion.
//!
//! A theme is a named alternate property table selected by a selector
//! scoping convention: a rule belongs to a theme when the theme identifier
//! appears as an exact class name in its selector. Rules without a theme
//! class belong to the distinguished `"default"` theme.

#![forbid(unsafe_code)]

use once_cell::sync::Lazy;
use props_syntax::{Stylesheet, parse_value};
use props_variables::{CustomProperties, is_custom_property_name};
use std::collections::{HashMap, HashSet};

/// Identifier of the distinguished theme every un-scoped rule belongs to.
pub const DEFAULT_THEME: &str = "default";

static EMPTY_TABLE: Lazy<CustomProperties> = Lazy::new(CustomProperties::new);

/// Custom property tables per theme, plus the distinguished default table.
#[derive(Clone, Debug, Default)]
pub struct ThemeSet {
    /// Table used by rules not scoped to any configured theme.
    pub default: CustomProperties,
    /// Tables keyed by configured theme identifier.
    pub themes: HashMap<String, CustomProperties>,
}

impl ThemeSet {
    /// Table for a theme identifier. `"default"` yields the default table;
    /// an identifier without a table yields a shared empty one, so its
    /// `var()` references stay as written.
    pub fn table(&self, theme: &str) -> &CustomProperties {
        if theme == DEFAULT_THEME {
            return &self.default;
        }
        self.themes.get(theme).unwrap_or(&EMPTY_TABLE)
    }
}

/// Collect custom property definitions from every declaration in the sheet.
///
/// Collection is flat and non-cascading: declarations anywhere in the sheet
/// contribute to one table, in document order, later definitions overwriting
/// earlier ones. Definitions that fail to tokenize are skipped.
pub fn collect_local(stylesheet: &Stylesheet) -> CustomProperties {
    let mut table = CustomProperties::new();
    for rule in &stylesheet.rules {
        for declaration in &rule.declarations {
            if !is_custom_property_name(&declaration.name) {
                continue;
            }
            match parse_value(&declaration.value) {
                Ok(tokens) => {
                    table.insert(declaration.name.clone(), tokens);
                }
                Err(error) => {
                    log::warn!(
                        "skipping untokenizable definition {}: {error}",
                        declaration.name
                    );
                }
            }
        }
    }
    table
}

/// Merge imported tables with locally collected definitions.
///
/// The effective default table is the imported default overridden by the
/// local table. Named themes keep their imported tables untouched: local
/// declarations are never theme-scoped, since the stylesheet has no per-theme
/// sectioning syntax.
pub fn merge_theme_set(imported: ThemeSet, local: CustomProperties) -> ThemeSet {
    let mut merged = imported;
    merged.default.extend(local);
    merged
}

/// Whether `selector` contains `theme` as an exact class name.
///
/// The class must end at a non-name character, so `.darkroom` does not match
/// theme `dark` while `.dark .btn` and `div.dark > a` both do.
pub fn selector_has_theme(selector: &str, theme: &str) -> bool {
    if theme.is_empty() {
        return false;
    }
    let mut offset = 0;
    while let Some(pos) = selector[offset..].find('.') {
        let class_start = offset + pos + 1;
        let rest = &selector[class_start..];
        if let Some(tail) = rest.strip_prefix(theme)
            && tail.chars().next().is_none_or(|next| !is_name_char(next))
        {
            return true;
        }
        offset = class_start;
    }
    false
}

fn is_name_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '-'
}

/// First configured theme the selector belongs to, if any.
pub fn selector_theme<'config>(selector: &str, themes: &'config [String]) -> Option<&'config str> {
    themes
        .iter()
        .map(String::as_str)
        .find(|theme| selector_has_theme(selector, theme))
}

/// Selector of a rule's clone scoped to a theme.
pub fn scope_selector(theme: &str, selector: &str) -> String {
    format!(".{theme} {selector}")
}

/// Clone every un-scoped rule once per theme, scoping the clone's selector.
///
/// Builds a fresh rule list rather than inserting into the list being
/// walked: clones land immediately before their origin rule, in theme-list
/// order. A clone is skipped when a rule with the same selector already
/// exists anywhere in the sheet, so re-running the expansion adds nothing.
pub fn expand_themed_rules(stylesheet: &mut Stylesheet, themes: &[String]) {
    if themes.is_empty() {
        return;
    }
    let mut selectors: HashSet<String> = stylesheet
        .rules
        .iter()
        .map(|rule| rule.selector.clone())
        .collect();
    let mut expanded = Vec::with_capacity(stylesheet.rules.len() * (themes.len() + 1));
    for rule in stylesheet.rules.drain(..) {
        if selector_theme(&rule.selector, themes).is_none() {
            for theme in themes {
                let scoped = scope_selector(theme, &rule.selector);
                if selectors.contains(&scoped) {
                    continue;
                }
                let mut clone = rule.clone();
                clone.selector.clone_from(&scoped);
                expanded.push(clone);
                selectors.insert(scoped);
            }
        }
        expanded.push(rule);
    }
    stylesheet.rules = expanded;
}
