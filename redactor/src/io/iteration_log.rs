//! Iteration logging helpers for `.redactor/iterations/`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::types::{Action, Deviation};
use crate::document::Document;
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize)]
pub struct IterationMeta {
    pub iter: u32,
    pub action: Action,
    /// Deviations found at Assess time, before the action ran.
    pub deviations: Vec<Deviation>,
    pub confirmation: Option<String>,
    /// Collaborator failure that prevented the action, if any.
    pub error: Option<String>,
    pub started_at: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct IterationPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub document_before_path: PathBuf,
    pub document_after_path: PathBuf,
}

impl IterationPaths {
    pub fn new(root: &Path, iter: u32) -> Self {
        let dir = root
            .join(".redactor")
            .join("iterations")
            .join(iter.to_string());
        Self {
            dir: dir.clone(),
            meta_path: dir.join("meta.json"),
            document_before_path: dir.join("document.before.json"),
            document_after_path: dir.join("document.after.json"),
        }
    }
}

pub struct IterationWriteRequest<'a> {
    pub root: &'a Path,
    pub meta: &'a IterationMeta,
    pub document_before: &'a Document,
    pub document_after: &'a Document,
}

pub fn write_iteration(request: &IterationWriteRequest<'_>) -> Result<IterationPaths, StoreError> {
    let paths = IterationPaths::new(request.root, request.meta.iter);
    fs::create_dir_all(&paths.dir).map_err(|source| StoreError::Write {
        path: paths.dir.clone(),
        source,
    })?;

    write_json(&paths.meta_path, request.meta)?;
    write_json(&paths.document_before_path, request.document_before)?;
    write_json(&paths.document_after_path, request.document_after)?;

    Ok(paths)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    fs::write(path, buf).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
