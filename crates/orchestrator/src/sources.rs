//! Import sources for custom property tables.
//!
//! A source is an in-memory document, an async callable producing one, or a
//! file reference whose type is inferred from its extension. Values are
//! tokenized at collection time; sources merge in list order, later wins per
//! key.

use crate::error::TransformError;
use anyhow::Result;
use futures::future::BoxFuture;
use props_syntax::parse_value;
use props_variables::CustomProperties;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callable source producing a document, possibly asynchronously.
pub type SourceProvider =
    Arc<dyn Fn() -> BoxFuture<'static, Result<SourceDocument>> + Send + Sync>;

/// File types an import file can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// A JSON document.
    Json,
    /// A generic structured-object document.
    Object,
}

/// One configured import source.
#[derive(Clone)]
pub enum ImportSource {
    /// An in-memory document.
    Object(SourceDocument),
    /// A callable producing a document.
    Provider(SourceProvider),
    /// A file reference.
    File {
        /// Path of the file to read.
        path: PathBuf,
        /// File type; inferred from the extension when `None`.
        kind: Option<SourceKind>,
    },
}

impl ImportSource {
    /// Convenience constructor for a file source with an inferred type.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            kind: None,
        }
    }
}

/// The structured shape a source resolves to: raw-text values, keyed by
/// property name, with an optional per-theme section.
#[derive(Clone, Debug, Default)]
pub struct SourceDocument {
    /// `customProperties` / `custom-properties`.
    pub custom_properties: HashMap<String, String>,
    /// `themedCustomProperties` / `themed-custom-properties`, keyed by theme.
    pub themed_custom_properties: HashMap<String, HashMap<String, String>>,
}

impl SourceDocument {
    /// Read the document shape out of a parsed JSON value.
    ///
    /// A top level that is not an object coerces to an empty document;
    /// scalar values are stringified the way they would appear in CSS text,
    /// so `10` becomes `"10"`.
    pub fn from_json(root: &JsonValue) -> Self {
        let mut document = Self::default();
        let Some(object) = root.as_object() else {
            return document;
        };
        for key in ["customProperties", "custom-properties"] {
            if let Some(map) = object.get(key).and_then(JsonValue::as_object) {
                for (name, value) in map {
                    document
                        .custom_properties
                        .insert(name.clone(), scalar_text(value));
                }
            }
        }
        for key in ["themedCustomProperties", "themed-custom-properties"] {
            if let Some(section) = object.get(key).and_then(JsonValue::as_object) {
                for (theme, entries) in section {
                    let Some(entries) = entries.as_object() else {
                        continue;
                    };
                    let target = document
                        .themed_custom_properties
                        .entry(theme.clone())
                        .or_default();
                    for (name, value) in entries {
                        target.insert(name.clone(), scalar_text(value));
                    }
                }
            }
        }
        document
    }
}

fn scalar_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        JsonValue::Number(number) => number.to_string(),
        JsonValue::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

/// Tables collected from all import sources, before local merging.
#[derive(Clone, Debug, Default)]
pub struct ImportedTables {
    /// Merged default table.
    pub default: CustomProperties,
    /// Merged per-theme tables.
    pub themed: HashMap<String, CustomProperties>,
}

/// Load and merge every configured source, in list order.
///
/// # Errors
/// Fails with [`TransformError::SourceUnavailable`] when a file is missing,
/// unreadable, or not valid JSON; a callable source propagates its own
/// error.
pub async fn collect_from_sources(sources: &[ImportSource]) -> Result<ImportedTables> {
    let mut tables = ImportedTables::default();
    for source in sources {
        let document = load_source(source).await?;
        merge_document(&mut tables, &document);
    }
    log::debug!(
        "collected {} default and {} themed custom property tables from {} sources",
        tables.default.len(),
        tables.themed.len(),
        sources.len()
    );
    Ok(tables)
}

async fn load_source(source: &ImportSource) -> Result<SourceDocument> {
    match source {
        ImportSource::Object(document) => Ok(document.clone()),
        ImportSource::Provider(provider) => provider().await,
        ImportSource::File { path, kind } => {
            let kind = kind.unwrap_or_else(|| infer_kind(path));
            load_file(path, kind).await
        }
    }
}

fn infer_kind(path: &Path) -> SourceKind {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(extension) if extension.eq_ignore_ascii_case("json") => SourceKind::Json,
        _ => SourceKind::Object,
    }
}

async fn load_file(path: &Path, kind: SourceKind) -> Result<SourceDocument> {
    // Both kinds go through structured-object access; JSON is the one object
    // format the engine reads natively. Module-style sources are covered by
    // `ImportSource::Provider`.
    match kind {
        SourceKind::Json | SourceKind::Object => {
            let text = tokio::fs::read_to_string(path).await.map_err(|error| {
                TransformError::SourceUnavailable {
                    source: path.display().to_string(),
                    reason: error.to_string(),
                }
            })?;
            let root: JsonValue =
                serde_json::from_str(&text).map_err(|error| TransformError::SourceUnavailable {
                    source: path.display().to_string(),
                    reason: error.to_string(),
                })?;
            Ok(SourceDocument::from_json(&root))
        }
    }
}

fn merge_document(tables: &mut ImportedTables, document: &SourceDocument) {
    // Sorted iteration keeps logs and within-document insertion order
    // deterministic.
    let entries: BTreeMap<_, _> = document.custom_properties.iter().collect();
    for (name, value) in entries {
        insert_tokenized(&mut tables.default, name, value);
    }
    for (theme, section) in &document.themed_custom_properties {
        let target = tables.themed.entry(theme.clone()).or_default();
        let themed_entries: BTreeMap<_, _> = section.iter().collect();
        for (name, value) in themed_entries {
            insert_tokenized(target, name, value);
        }
    }
}

fn insert_tokenized(table: &mut CustomProperties, name: &str, value: &str) {
    match parse_value(value) {
        Ok(tokens) => {
            table.insert(name.to_owned(), tokens);
        }
        Err(error) => {
            log::warn!("skipping untokenizable imported value for {name}: {error}");
        }
    }
}
