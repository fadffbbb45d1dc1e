//! The declaration transformer: routes each declaration to the right theme
//! table and splices resolved values into the sheet.

use crate::TransformOptions;
use props_syntax::{Declaration, StyleRule, Stylesheet, parse_value, render};
use props_themes::{DEFAULT_THEME, ThemeSet, expand_themed_rules, selector_has_theme, selector_theme};
use props_variables::{CustomProperties, is_custom_property_name, resolve_references};

/// Flat transform: every eligible declaration resolves against one table.
pub(crate) fn transform_flat(
    stylesheet: &mut Stylesheet,
    table: &CustomProperties,
    options: &TransformOptions,
) {
    transform_pass(stylesheet, table, None, options);
}

/// Full transform. With themes configured, the sheet is expanded first and
/// then gets one pass for `"default"` plus one per configured theme, each
/// against that theme's table.
pub(crate) fn transform_properties(
    stylesheet: &mut Stylesheet,
    tables: &ThemeSet,
    options: &TransformOptions,
) {
    if options.themes.is_empty() {
        transform_flat(stylesheet, &tables.default, options);
        return;
    }
    expand_themed_rules(stylesheet, &options.themes);
    transform_pass(stylesheet, tables.table(DEFAULT_THEME), Some(DEFAULT_THEME), options);
    for theme in &options.themes {
        transform_pass(stylesheet, tables.table(theme), Some(theme), options);
    }
}

/// One resolution pass over the whole sheet against one table.
///
/// A changed value either replaces the declaration in place or, in preserve
/// mode, is inserted as a new declaration immediately before the original,
/// which keeps its `var()` for runtime fallback. Unchanged (including
/// cyclic) values cause no mutation.
fn transform_pass(
    stylesheet: &mut Stylesheet,
    table: &CustomProperties,
    current_theme: Option<&str>,
    options: &TransformOptions,
) {
    for rule in &mut stylesheet.rules {
        let in_current_theme = rule_in_theme(rule, current_theme, &options.themes);
        let mut index = 0;
        while index < rule.declarations.len() {
            let resolved_value = resolve_declaration(rule, index, table, options);
            match resolved_value {
                Some(value) if in_current_theme => {
                    if options.preserve {
                        let original = &rule.declarations[index];
                        let resolved = Declaration {
                            name: original.name.clone(),
                            value,
                            important: original.important,
                        };
                        rule.declarations.insert(index, resolved);
                        index += 2;
                    } else {
                        rule.declarations[index].value = value;
                        index += 1;
                    }
                }
                _ => index += 1,
            }
        }
    }
}

/// Resolved value text for the declaration at `index`, when it is eligible
/// and resolution changes it.
fn resolve_declaration(
    rule: &StyleRule,
    index: usize,
    table: &CustomProperties,
    options: &TransformOptions,
) -> Option<String> {
    let declaration = &rule.declarations[index];
    if !is_transformable(declaration) || is_ignored(options, rule, declaration) {
        return None;
    }
    match parse_value(&declaration.value) {
        Ok(tokens) => {
            let resolved = render(&resolve_references(&tokens, table));
            (resolved != declaration.value).then_some(resolved)
        }
        Err(error) => {
            log::warn!(
                "leaving untokenizable value untouched for {}: {error}",
                declaration.name
            );
            None
        }
    }
}

/// Whether the rule belongs to the theme of the current pass. Without
/// theming every rule is in scope; the default pass takes every rule that is
/// scoped to no configured theme.
fn rule_in_theme(rule: &StyleRule, current_theme: Option<&str>, themes: &[String]) -> bool {
    match current_theme {
        None => true,
        Some(theme) if theme == DEFAULT_THEME => selector_theme(&rule.selector, themes).is_none(),
        Some(theme) => selector_has_theme(&rule.selector, theme),
    }
}

fn is_ignored(options: &TransformOptions, rule: &StyleRule, declaration: &Declaration) -> bool {
    options
        .ignore
        .as_ref()
        .is_some_and(|predicate| predicate(rule, declaration))
}

/// Cheap pre-filter: not a definition, and the raw text carries at least one
/// `var(...)` usage at a non-name boundary, before any tokenization happens.
fn is_transformable(declaration: &Declaration) -> bool {
    !is_custom_property_name(&declaration.name) && has_var_reference(&declaration.value)
}

fn has_var_reference(value: &str) -> bool {
    // ASCII lowering keeps byte offsets aligned with the original text.
    let lowered = value.to_ascii_lowercase();
    let mut offset = 0;
    while let Some(found) = lowered[offset..].find("var(") {
        let position = offset + found;
        let boundary = lowered[..position]
            .chars()
            .next_back()
            .is_none_or(|previous| !is_name_char(previous));
        if boundary
            && let Some(close) = lowered[position + 4..].find(')')
            && close > 0
        {
            return true;
        }
        offset = position + 4;
    }
    false
}

fn is_name_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '-'
}

#[cfg(test)]
mod tests {
    use super::has_var_reference;

    #[test]
    fn prefilter_requires_a_name_boundary() {
        assert!(has_var_reference("var(--color)"));
        assert!(has_var_reference("calc(var(--gap) * 2)"));
        assert!(has_var_reference("VAR(--color)"));
        assert!(!has_var_reference("invar(--color)"));
        assert!(!has_var_reference("var()"));
        assert!(!has_var_reference("var("));
        assert!(!has_var_reference("red"));
    }
}
