//! Test-only helpers: document builders, scripted collaborators and temp workspaces.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use tempfile::TempDir;

use crate::core::planner::Planner;
use crate::core::policy::Policy;
use crate::core::types::Instruction;
use crate::document::{Document, Section};
use crate::error::{ResearchError, StoreError};
use crate::io::document_store::{DocumentStore, FileDocumentStore};
use crate::io::init::{InitOptions, RedactorPaths, init_workspace};
use crate::io::research::{CannedResearcher, Researcher};
use crate::io::session_state::{SessionState, load_session_state, write_session_state};
use crate::step::StepEnv;

/// Document titled "Bananas" with the given sections.
pub fn doc_with(sections: Vec<Section>) -> Document {
    Document {
        title: "Bananas".to_string(),
        subtitle: String::new(),
        sections,
    }
}

/// A compliant introduction section.
pub fn intro() -> Section {
    Section::text("## Introduction\n\nAbout bananas.")
}

/// A compliant conclusion section.
pub fn conclusion() -> Section {
    Section::text("## Conclusion\n\nEat more bananas.")
}

/// Researcher that replays fixed answers in order and records every query.
///
/// Running out of answers is reported as a research failure.
pub struct ScriptedResearcher {
    answers: Mutex<VecDeque<String>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedResearcher {
    pub fn new(answers: Vec<&str>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(str::to_string).collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl Researcher for ScriptedResearcher {
    fn research(&self, topic: &str, _document: &Document) -> Result<String, ResearchError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(topic.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .ok_or_else(|| ResearchError::new(topic, "no scripted answer left"))
    }
}

/// Researcher that always fails.
pub struct FailingResearcher;

impl Researcher for FailingResearcher {
    fn research(&self, topic: &str, _document: &Document) -> Result<String, ResearchError> {
        Err(ResearchError::new(topic, "backend unavailable"))
    }
}

/// Fails the first `failures` calls, then answers like [`CannedResearcher`].
pub struct FlakyResearcher {
    failures: u32,
    calls: Mutex<u32>,
}

impl FlakyResearcher {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

impl Researcher for FlakyResearcher {
    fn research(&self, topic: &str, document: &Document) -> Result<String, ResearchError> {
        let call = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| ResearchError::new(topic, "poisoned"))?;
            *calls += 1;
            *calls
        };
        if call <= self.failures {
            return Err(ResearchError::new(topic, "transient failure"));
        }
        CannedResearcher.research(topic, document)
    }
}

/// Store that loads from disk but refuses every save.
pub struct ReadOnlyStore(pub FileDocumentStore);

impl DocumentStore for ReadOnlyStore {
    fn load(&self) -> Result<Document, StoreError> {
        self.0.load()
    }

    fn save(&self, _document: &Document) -> Result<(), StoreError> {
        Err(StoreError::Write {
            path: self.0.path().to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

/// An initialized `.redactor/` workspace in a temp directory.
pub struct TestWorkspace {
    _temp: TempDir,
    pub paths: RedactorPaths,
    pub store: FileDocumentStore,
}

impl TestWorkspace {
    pub fn new(title: &str) -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let paths = init_workspace(
            temp.path(),
            &InitOptions {
                title: title.to_string(),
                subtitle: String::new(),
                force: false,
            },
        )?;
        let store = FileDocumentStore::new(&paths.document_path);
        Ok(Self {
            _temp: temp,
            paths,
            store,
        })
    }

    pub fn env<'a, R, P>(
        &'a self,
        researcher: &'a R,
        planner: &'a P,
        policy: &'a Policy,
    ) -> StepEnv<'a, FileDocumentStore, R, P>
    where
        R: Researcher,
        P: Planner,
    {
        StepEnv {
            paths: &self.paths,
            store: &self.store,
            researcher,
            planner,
            policy,
        }
    }

    /// Replace the document's sections, keeping its title.
    pub fn seed(&self, sections: Vec<Section>) -> Result<()> {
        let mut doc = self.store.load()?;
        doc.sections = sections;
        self.store.save(&doc)?;
        Ok(())
    }

    pub fn set_instruction(&self, instruction: Instruction) -> Result<()> {
        let mut session = self.load_session()?;
        session.pending_instruction = Some(instruction);
        write_session_state(&self.paths.session_path, &session)?;
        Ok(())
    }

    pub fn load_document(&self) -> Result<Document> {
        Ok(self.store.load()?)
    }

    pub fn load_session(&self) -> Result<SessionState> {
        Ok(load_session_state(&self.paths.session_path)?)
    }
}
