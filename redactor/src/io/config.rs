//! Redactor configuration stored under `.redactor/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Redactor configuration (TOML).
///
/// Meant to be edited by hand. Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RedactorConfig {
    /// Hard cap on Assess-Plan-Act iterations per loop invocation.
    pub max_iterations: u32,

    /// How many times a failed research call is retried before the loop stops.
    pub research_retries: u32,

    pub research: ResearchConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchBackend {
    /// Spawn `research.command` with the prompt on stdin.
    Command,
    /// Offline deterministic answers.
    Canned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResearchConfig {
    pub backend: ResearchBackend,

    /// Command to execute for research (e.g. `["codex","exec","-"]`).
    pub command: Vec<String>,

    pub timeout_secs: u64,

    /// Discard research stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            backend: ResearchBackend::Command,
            command: vec![
                "codex".to_string(),
                "exec".to_string(),
                "--skip-git-repo-check".to_string(),
                "-".to_string(),
            ],
            timeout_secs: 5 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for RedactorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            research_retries: 1,
            research: ResearchConfig::default(),
        }
    }
}

impl RedactorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self.research.timeout_secs == 0 {
            return Err(anyhow!("research.timeout_secs must be > 0"));
        }
        if self.research.output_limit_bytes == 0 {
            return Err(anyhow!("research.output_limit_bytes must be > 0"));
        }
        if self.research.backend == ResearchBackend::Command
            && (self.research.command.is_empty() || self.research.command[0].trim().is_empty())
        {
            return Err(anyhow!("research.command must be a non-empty array"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RedactorConfig::default()`.
pub fn load_config(path: &Path) -> Result<RedactorConfig> {
    if !path.exists() {
        let cfg = RedactorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RedactorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RedactorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RedactorConfig::default());
        assert_eq!(cfg.max_iterations, 16);
        assert_eq!(cfg.research_retries, 1);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = RedactorConfig {
            max_iterations: 4,
            research: ResearchConfig {
                backend: ResearchBackend::Canned,
                ..ResearchConfig::default()
            },
            ..RedactorConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_iterations = 3\n[research]\nbackend = \"canned\"\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_iterations, 3);
        assert_eq!(cfg.research.backend, ResearchBackend::Canned);
        assert_eq!(cfg.research.timeout_secs, 300);
    }

    #[test]
    fn rejects_zero_iteration_cap() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_iterations = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_iterations must be > 0"));
    }

    #[test]
    fn canned_backend_does_not_need_a_command() {
        let cfg = RedactorConfig {
            research: ResearchConfig {
                backend: ResearchBackend::Canned,
                command: Vec::new(),
                ..ResearchConfig::default()
            },
            ..RedactorConfig::default()
        };
        cfg.validate().expect("valid");
    }
}
