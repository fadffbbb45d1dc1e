//! Export sinks for the merged custom property tables.

use crate::error::TransformError;
use anyhow::Result;
use futures::future::BoxFuture;
use props_syntax::render;
use props_themes::ThemeSet;
use props_variables::CustomProperties;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callable sink receiving the final merged tables.
pub type ExportHandler = Arc<dyn Fn(ThemeSet) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// File formats a sink file can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkKind {
    /// A stylesheet with one block per table.
    Css,
    /// The structured-object form.
    Json,
}

/// One configured export destination.
#[derive(Clone)]
pub enum ExportSink {
    /// A file destination.
    File {
        /// Path of the file to write.
        path: PathBuf,
        /// File format; inferred from the extension when `None`.
        kind: Option<SinkKind>,
    },
    /// Host-defined persistence.
    Custom(ExportHandler),
}

impl ExportSink {
    /// Convenience constructor for a file sink with an inferred format.
    pub fn to_path(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            kind: None,
        }
    }
}

/// Document shape written by JSON sinks.
#[derive(Serialize)]
struct JsonExport {
    #[serde(rename = "custom-properties")]
    custom_properties: BTreeMap<String, String>,
    #[serde(
        rename = "themed-custom-properties",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    themed_custom_properties: BTreeMap<String, BTreeMap<String, String>>,
}

/// Write the merged tables to every configured sink, awaiting completion.
///
/// # Errors
/// The first failing file sink aborts with [`TransformError::ExportFailed`];
/// custom sinks propagate their own errors. Nothing is retried.
pub async fn write_to_exports(tables: &ThemeSet, sinks: &[ExportSink]) -> Result<()> {
    for sink in sinks {
        match sink {
            ExportSink::Custom(handler) => handler(tables.clone()).await?,
            ExportSink::File { path, kind } => {
                let kind = kind.unwrap_or_else(|| infer_kind(path));
                let contents = match kind {
                    SinkKind::Css => render_css(tables),
                    SinkKind::Json => render_json(tables)?,
                };
                tokio::fs::write(path, contents).await.map_err(|error| {
                    TransformError::ExportFailed {
                        target: path.display().to_string(),
                        reason: error.to_string(),
                    }
                })?;
                log::debug!("exported custom properties to {}", path.display());
            }
        }
    }
    Ok(())
}

fn infer_kind(path: &Path) -> SinkKind {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(extension) if extension.eq_ignore_ascii_case("css") => SinkKind::Css,
        _ => SinkKind::Json,
    }
}

/// Rendered text per property name, in sorted order for stable output.
fn rendered_entries(table: &CustomProperties) -> BTreeMap<String, String> {
    table
        .iter()
        .map(|(name, tokens)| (name.clone(), render(tokens)))
        .collect()
}

fn render_css(tables: &ThemeSet) -> String {
    let mut out = String::new();
    push_block(&mut out, ":root", &tables.default);
    let themes: BTreeMap<_, _> = tables.themes.iter().collect();
    for (theme, table) in themes {
        out.push('\n');
        push_block(&mut out, &format!(".{theme}"), table);
    }
    out
}

fn push_block(out: &mut String, selector: &str, table: &CustomProperties) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{selector} {{");
    for (name, value) in rendered_entries(table) {
        let _ = writeln!(out, "\t{name}: {value};");
    }
    let _ = writeln!(out, "}}");
}

fn render_json(tables: &ThemeSet) -> Result<String> {
    let document = JsonExport {
        custom_properties: rendered_entries(&tables.default),
        themed_custom_properties: tables
            .themes
            .iter()
            .map(|(theme, table)| (theme.clone(), rendered_entries(table)))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}
