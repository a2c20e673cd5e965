//! Document load/save with schema validation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::StoreError;

const DOCUMENT_SCHEMA: &str = include_str!("../../schemas/document.schema.json");

/// Durable home of the document.
///
/// `load` returns exactly what was stored; it never repairs or normalizes
/// content, so a non-compliant document loads as-is.
pub trait DocumentStore {
    fn load(&self) -> Result<Document, StoreError>;
    fn save(&self, document: &Document) -> Result<(), StoreError>;
}

/// JSON file store. Writes are atomic (temp file + rename).
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    path: PathBuf,
}

impl FileDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for FileDocumentStore {
    fn load(&self) -> Result<Document, StoreError> {
        debug!(path = %self.path.display(), "loading document");
        let contents = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                StoreError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let value: Value = serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        validate_schema(&self.path, &value)?;
        let document: Document =
            serde_json::from_value(value).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        debug!(sections = document.sections.len(), "document loaded");
        Ok(document)
    }

    fn save(&self, document: &Document) -> Result<(), StoreError> {
        debug!(path = %self.path.display(), sections = document.sections.len(), "writing document");
        let mut buf = serde_json::to_string_pretty(document)?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}

pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}

fn validate_schema(path: &Path, value: &Value) -> Result<(), StoreError> {
    let schema_err = |messages| StoreError::Schema {
        path: path.to_path_buf(),
        messages,
    };
    let schema: Value = serde_json::from_str(DOCUMENT_SCHEMA)?;
    let compiled =
        validator_for(&schema).map_err(|err| schema_err(vec![format!("invalid schema: {err}")]))?;
    if compiled.is_valid(value) {
        return Ok(());
    }
    let messages = compiled
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    Err(schema_err(messages))
}
