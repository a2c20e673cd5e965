//! Initialization helpers for `.redactor/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::config::{RedactorConfig, write_config};
use super::document_store::{DocumentStore, FileDocumentStore};
use super::session_state::{SessionState, write_session_state};
use crate::document::Document;

/// All canonical paths within `.redactor/` for a workspace root.
#[derive(Debug, Clone)]
pub struct RedactorPaths {
    pub root: PathBuf,
    pub redactor_dir: PathBuf,
    pub iterations_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub document_path: PathBuf,
    pub session_path: PathBuf,
    pub messages_path: PathBuf,
    pub config_path: PathBuf,
}

impl RedactorPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let redactor_dir = root.join(".redactor");
        Self {
            root: root.clone(),
            redactor_dir: redactor_dir.clone(),
            iterations_dir: redactor_dir.join("iterations"),
            gitignore_path: redactor_dir.join(".gitignore"),
            document_path: redactor_dir.join("document.json"),
            session_path: redactor_dir.join("session.json"),
            messages_path: redactor_dir.join("messages.json"),
            config_path: redactor_dir.join("config.toml"),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.document_path.is_file()
    }
}

/// Options for `init_workspace`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub title: String,
    pub subtitle: String,
    /// If true, overwrite existing redactor-owned files.
    pub force: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        let doc = crate::document::default_document();
        Self {
            title: doc.title,
            subtitle: doc.subtitle,
            force: false,
        }
    }
}

/// Create `.redactor/` scaffolding in `root` with an empty document.
///
/// Fails if `.redactor/` already exists unless `options.force` is set.
pub fn init_workspace(root: &Path, options: &InitOptions) -> Result<RedactorPaths> {
    let paths = RedactorPaths::new(root);
    if paths.redactor_dir.exists() && !paths.redactor_dir.is_dir() {
        return Err(anyhow!(
            "redactor init: .redactor exists but is not a directory"
        ));
    }
    if paths.redactor_dir.exists() && !options.force {
        return Err(anyhow!(
            "redactor init: .redactor already exists (use --force to overwrite)"
        ));
    }

    create_dir(&paths.redactor_dir)?;
    create_dir(&paths.iterations_dir)?;
    fs::write(&paths.gitignore_path, REDACTOR_GITIGNORE)
        .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;

    FileDocumentStore::new(&paths.document_path)
        .save(&Document::new(&options.title, &options.subtitle))?;
    write_config(&paths.config_path, &RedactorConfig::default())?;
    write_session_state(&paths.session_path, &SessionState::default())?;

    info!(root = %root.display(), "initialized redactor workspace");
    Ok(paths)
}

/// Initialize `root` with default options unless a document already exists.
pub fn ensure_workspace(root: &Path) -> Result<RedactorPaths> {
    let paths = RedactorPaths::new(root);
    if paths.is_initialized() {
        return Ok(paths);
    }
    init_workspace(
        root,
        &InitOptions {
            force: true,
            ..InitOptions::default()
        },
    )
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

const REDACTOR_GITIGNORE: &str = "iterations/\n";
