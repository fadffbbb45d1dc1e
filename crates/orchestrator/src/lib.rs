//! Build-time resolution of CSS custom properties, with optional theming.
//!
//! This crate coordinates the module crates: custom property tables are
//! collected from the stylesheet and from import sources, merged with
//! defined precedence, exported to configured sinks, and substituted into
//! the sheet's declarations. The stylesheet model and tokenizer live in
//! `props_syntax`, `var()` resolution in `props_variables`, and theme tables
//! plus rule expansion in `props_themes`.

mod error;
mod exports;
mod sources;
mod transform;

pub use error::TransformError;
pub use exports::{ExportHandler, ExportSink, SinkKind, write_to_exports};
pub use sources::{
    ImportSource, ImportedTables, SourceDocument, SourceKind, SourceProvider,
    collect_from_sources,
};

pub use props_syntax::{
    Declaration, FunctionToken, StyleRule, Stylesheet, ValueParseError, ValueToken,
    parse_stylesheet, parse_value, render,
};
pub use props_themes::{
    DEFAULT_THEME, ThemeSet, collect_local, expand_themed_rules, merge_theme_set,
    scope_selector, selector_has_theme, selector_theme,
};
pub use props_variables::{CustomProperties, is_custom_property_name, resolve_references};

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Predicate marking rules/declarations the transform must leave alone.
pub type IgnorePredicate = Arc<dyn Fn(&StyleRule, &Declaration) -> bool + Send + Sync>;

/// Configuration of one engine instance.
#[derive(Clone)]
pub struct TransformOptions {
    /// Keep the original `var()` declaration and insert the resolved one
    /// before it, instead of overwriting in place.
    pub preserve: bool,
    /// Theme identifiers, in routing order. Empty disables theming.
    pub themes: Vec<String>,
    /// Sources to import custom properties from.
    pub import_from: Vec<ImportSource>,
    /// Destinations to export the merged tables to.
    pub export_to: Vec<ExportSink>,
    /// Rules/declarations the transform must skip.
    pub ignore: Option<IgnorePredicate>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            preserve: true,
            themes: Vec::new(),
            import_from: Vec::new(),
            export_to: Vec::new(),
            ignore: None,
        }
    }
}

/// A configured engine, applied to any number of stylesheets.
///
/// Import sources are collected once per engine and reused across
/// invocations; the collected tables are read-only afterwards, so one engine
/// can serve a whole build.
pub struct CustomPropertiesEngine {
    options: TransformOptions,
    imported: OnceCell<ImportedTables>,
}

impl CustomPropertiesEngine {
    /// Create an engine from its configuration.
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            imported: OnceCell::new(),
        }
    }

    /// Whether the configuration needs no external IO.
    pub fn is_synchronous(&self) -> bool {
        self.options.import_from.is_empty() && self.options.export_to.is_empty()
    }

    /// Purely in-memory flat transform: collect the sheet's own definitions
    /// and substitute them. Theming goes through [`Self::transform`].
    pub fn transform_sync(&self, stylesheet: &mut Stylesheet) {
        let local = collect_local(stylesheet);
        transform::transform_flat(stylesheet, &local, &self.options);
    }

    /// Full pipeline: await import collection, merge with the sheet's own
    /// definitions, write all export sinks to completion, then run the
    /// declaration transformer against the very same merged tables.
    ///
    /// Short-circuits to the in-memory flat pass when no IO and no themes
    /// are configured.
    ///
    /// # Errors
    /// Fails without touching the stylesheet when a source is unavailable or
    /// an export sink write fails.
    pub async fn transform(&self, stylesheet: &mut Stylesheet) -> Result<()> {
        if self.is_synchronous() && self.options.themes.is_empty() {
            self.transform_sync(stylesheet);
            return Ok(());
        }

        let imported = self
            .imported
            .get_or_try_init(|| collect_from_sources(&self.options.import_from))
            .await?;
        let local = collect_local(stylesheet);
        let imported_set = ThemeSet {
            default: imported.default.clone(),
            themes: imported.themed.clone(),
        };
        let tables = merge_theme_set(imported_set, local);

        write_to_exports(&tables, &self.options.export_to).await?;

        transform::transform_properties(stylesheet, &tables, &self.options);
        Ok(())
    }
}
