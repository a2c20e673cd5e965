//! `redactor` command-line interface.
//!
//! Works on the `.redactor/` workspace of the current directory (or `--root`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use redactor::conversation::handle_message;
use redactor::core::edit::{delete_section, update_text_section};
use redactor::core::methodology::METHODOLOGY;
use redactor::core::planner::MethodologyPlanner;
use redactor::core::policy::Policy;
use redactor::error::RedactorError;
use redactor::exit_codes;
use redactor::io::config::load_config;
use redactor::io::document_store::{DocumentStore, FileDocumentStore};
use redactor::io::init::{InitOptions, RedactorPaths, init_workspace};
use redactor::io::messages::MessageLog;
use redactor::io::research::researcher_from_config;
use redactor::logging;
use redactor::looping::{LoopOutcome, LoopStop, run_loop};
use redactor::step::StepEnv;

#[derive(Parser)]
#[command(
    name = "redactor",
    version,
    about = "Self-correcting report editor"
)]
struct Cli {
    /// Workspace root containing `.redactor/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.redactor/` with an empty document.
    Init {
        #[arg(long, default_value = "Untitled report")]
        title: String,
        #[arg(long, default_value = "")]
        subtitle: String,
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Send a request (e.g. "add a section about bananas") and run the edit loop.
    Edit {
        #[arg(required = true, num_args = 1..)]
        instruction: Vec<String>,
    },
    /// Run the edit loop on the pending request, if any.
    Resume,
    /// List methodology deviations; exits 2 when there are any.
    Check,
    /// List the document's sections.
    Sections,
    /// Print the document as Markdown.
    Render,
    /// Replace the body of a text section.
    Update { index: usize, text: String },
    /// Delete a section.
    Delete { index: usize },
    /// Print the editorial methodology.
    Methodology,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = cli.root.as_path();
    match cli.command {
        Command::Init {
            title,
            subtitle,
            force,
        } => {
            let paths = init_workspace(
                root,
                &InitOptions {
                    title,
                    subtitle,
                    force,
                },
            )?;
            println!("initialized {}", paths.redactor_dir.display());
            Ok(exit_codes::OK)
        }
        Command::Edit { instruction } => cmd_edit(root, &instruction.join(" ")),
        Command::Resume => cmd_resume(root),
        Command::Check => cmd_check(root),
        Command::Sections => {
            println!("{}", open_store(root)?.load()?.section_listing());
            Ok(exit_codes::OK)
        }
        Command::Render => {
            println!("{}", open_store(root)?.load()?.to_markdown());
            Ok(exit_codes::OK)
        }
        Command::Update { index, text } => {
            let store = open_store(root)?;
            let next = update_text_section(&store.load()?, index, &text)?;
            store.save(&next)?;
            println!("Section {index} updated.");
            Ok(exit_codes::OK)
        }
        Command::Delete { index } => {
            let store = open_store(root)?;
            let next = delete_section(&store.load()?, index)?;
            store.save(&next)?;
            println!("Section {index} deleted.");
            Ok(exit_codes::OK)
        }
        Command::Methodology => {
            print!("{METHODOLOGY}");
            Ok(exit_codes::OK)
        }
    }
}

fn open_paths(root: &Path) -> Result<RedactorPaths> {
    let paths = RedactorPaths::new(root);
    if !paths.is_initialized() {
        return Err(anyhow!(
            "missing {} (run `redactor init`)",
            paths.document_path.display()
        ));
    }
    Ok(paths)
}

fn open_store(root: &Path) -> Result<FileDocumentStore> {
    Ok(FileDocumentStore::new(open_paths(root)?.document_path))
}

fn cmd_edit(root: &Path, input: &str) -> Result<i32> {
    let paths = open_paths(root)?;
    let cfg = load_config(&paths.config_path)?;
    let store = FileDocumentStore::new(&paths.document_path);
    let researcher = researcher_from_config(&cfg.research, &paths.root)?;
    let policy = Policy::methodology();
    let env = StepEnv {
        paths: &paths,
        store: &store,
        researcher: &researcher,
        planner: &MethodologyPlanner,
        policy: &policy,
    };
    let messages = MessageLog::new(&paths.messages_path);

    let reply = handle_message(&env, &messages, &cfg.loop_config(), input, |step| {
        eprintln!("[{}] {}", step.iter, step.confirmation);
    })
    .context("record conversation")?;
    println!("{}", reply.message.content);
    Ok(exit_code(&reply.outcome))
}

fn cmd_resume(root: &Path) -> Result<i32> {
    let paths = open_paths(root)?;
    let cfg = load_config(&paths.config_path)?;
    let store = FileDocumentStore::new(&paths.document_path);
    let researcher = researcher_from_config(&cfg.research, &paths.root)?;
    let policy = Policy::methodology();
    let env = StepEnv {
        paths: &paths,
        store: &store,
        researcher: &researcher,
        planner: &MethodologyPlanner,
        policy: &policy,
    };

    let outcome = run_loop(&env, &cfg.loop_config(), |step| {
        eprintln!("[{}] {}", step.iter, step.confirmation);
    });
    match &outcome {
        Ok(outcome) => println!("{}", outcome.message),
        Err(err) => eprintln!("{err}"),
    }
    Ok(exit_code(&outcome))
}

fn cmd_check(root: &Path) -> Result<i32> {
    let document = open_store(root)?.load()?;
    let deviations = Policy::methodology().check(&document);
    if deviations.is_empty() {
        println!("The report follows the methodology.");
        return Ok(exit_codes::OK);
    }
    for deviation in &deviations {
        println!("{deviation}");
    }
    Ok(exit_codes::NONCOMPLIANT)
}

fn exit_code(outcome: &Result<LoopOutcome, RedactorError>) -> i32 {
    match outcome {
        Ok(outcome) if outcome.stop == LoopStop::Converged => exit_codes::OK,
        Ok(_) => exit_codes::NONCOMPLIANT,
        Err(RedactorError::PolicyViolationUnresolved { .. }) => exit_codes::UNRESOLVED,
        Err(_) => exit_codes::INVALID,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_with_title() {
        let cli = Cli::parse_from(["redactor", "init", "--title", "Bananas", "--force"]);
        assert!(matches!(
            cli.command,
            Command::Init { ref title, force: true, .. } if title == "Bananas"
        ));
    }

    #[test]
    fn parse_edit_joins_words() {
        let cli = Cli::parse_from(["redactor", "edit", "add", "a", "kpi", "for", "revenue"]);
        match cli.command {
            Command::Edit { instruction } => {
                assert_eq!(instruction.join(" "), "add a kpi for revenue")
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn parse_global_root_after_subcommand() {
        let cli = Cli::parse_from(["redactor", "check", "--root", "/tmp/report"]);
        assert_eq!(cli.root, PathBuf::from("/tmp/report"));
        assert!(matches!(cli.command, Command::Check));
    }

    #[test]
    fn unresolved_loop_maps_to_unresolved_code() {
        let err = RedactorError::PolicyViolationUnresolved {
            iterations: 3,
            deviations: Vec::new(),
        };
        assert_eq!(exit_code(&Err(err)), exit_codes::UNRESOLVED);
    }
}
