//! CLI tests for `redactor check` and `redactor edit`.
//!
//! Spawns the binary against a temp workspace and verifies exit codes and the
//! document left on disk.

use std::path::Path;
use std::process::{Command, Output};

use redactor::core::policy::Policy;
use redactor::exit_codes;
use redactor::io::config::{RedactorConfig, ResearchBackend, write_config};
use redactor::io::document_store::{DocumentStore, FileDocumentStore};
use redactor::io::init::{InitOptions, RedactorPaths, init_workspace};
use redactor::io::messages::{MessageKind, MessageLog};

fn redactor(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_redactor"))
        .current_dir(root)
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("run redactor")
}

fn canned_workspace(root: &Path) -> RedactorPaths {
    let paths = init_workspace(
        root,
        &InitOptions {
            title: "Bananas".to_string(),
            subtitle: String::new(),
            force: false,
        },
    )
    .expect("init");
    let mut cfg = RedactorConfig::default();
    cfg.research.backend = ResearchBackend::Canned;
    write_config(&paths.config_path, &cfg).expect("write config");
    paths
}

#[test]
fn check_on_fresh_workspace_is_noncompliant() {
    let temp = tempfile::tempdir().expect("tempdir");
    let init = redactor(temp.path(), &["init", "--title", "Bananas"]);
    assert_eq!(init.status.code(), Some(exit_codes::OK));

    let check = redactor(temp.path(), &["check"]);
    assert_eq!(check.status.code(), Some(exit_codes::NONCOMPLIANT));
    let stdout = String::from_utf8_lossy(&check.stdout);
    assert!(stdout.contains("Introduction"));
    assert!(stdout.contains("Conclusion"));
}

#[test]
fn check_without_workspace_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let check = redactor(temp.path(), &["check"]);
    assert_eq!(check.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&check.stderr).contains("redactor init"));
}

#[test]
fn edit_with_canned_research_converges() {
    let temp = tempfile::tempdir().expect("tempdir");
    let paths = canned_workspace(temp.path());

    let edit = redactor(temp.path(), &["edit", "add", "a", "section", "about", "bananas"]);
    assert_eq!(edit.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&edit.stdout).trim(),
        "Added a section about bananas at position 1."
    );

    let document = FileDocumentStore::new(&paths.document_path)
        .load()
        .expect("load");
    assert_eq!(document.sections.len(), 3);
    assert!(Policy::methodology().check(&document).is_empty());

    let check = redactor(temp.path(), &["check"]);
    assert_eq!(check.status.code(), Some(exit_codes::OK));

    let messages = MessageLog::new(&paths.messages_path).load().expect("messages");
    assert_eq!(messages[0].kind, MessageKind::UserInput);
    assert!(messages.iter().all(|m| !m.is_loading));
}

#[test]
fn delete_out_of_range_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    canned_workspace(temp.path());

    let delete = redactor(temp.path(), &["delete", "4"]);
    assert_eq!(delete.status.code(), Some(exit_codes::INVALID));
}
