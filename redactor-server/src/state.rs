//! Shared application state for the editing server.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

/// Progress events broadcast to SSE clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// One edit was saved.
    StepApplied {
        conversation_id: String,
        iter: u32,
        confirmation: String,
    },
    /// A message was answered.
    EditCompleted {
        conversation_id: String,
        stop: String,
    },
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Holds one `conversations/<id>/` workspace per conversation.
    pub data_dir: PathBuf,
    /// Force the offline research backend for every conversation.
    pub canned_research: bool,
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, canned_research: bool) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            data_dir,
            canned_research,
            event_tx: Arc::new(event_tx),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Workspace root of a conversation, or `None` for ids that are not a
    /// plain file name.
    pub fn conversation_dir(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id.len() <= 64
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.data_dir.join("conversations").join(id))
    }

    /// Lock serializing edits to one conversation.
    pub fn conversation_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(id.to_string()).or_default().clone()
    }

    /// Forget the lock of `id` once no other request holds or awaits it.
    pub fn release_conversation_lock(&self, id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(id);
        }
    }

    #[cfg(test)]
    pub fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_dir_rejects_path_tricks() {
        let state = AppState::new(PathBuf::from("/data"), true);
        assert_eq!(
            state.conversation_dir("abc-1"),
            Some(PathBuf::from("/data/conversations/abc-1"))
        );
        assert_eq!(state.conversation_dir(".."), None);
        assert_eq!(state.conversation_dir("a/b"), None);
        assert_eq!(state.conversation_dir(""), None);
    }

    #[test]
    fn same_conversation_shares_a_lock() {
        let state = AppState::new(PathBuf::from("/data"), true);
        let a = state.conversation_lock("x");
        let b = state.conversation_lock("x");
        let c = state.conversation_lock("y");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn released_lock_is_forgotten_only_when_idle() {
        let state = AppState::new(PathBuf::from("/data"), true);
        let first = state.conversation_lock("x");
        let waiting = state.conversation_lock("x");

        state.release_conversation_lock("x", first);
        assert_eq!(state.tracked_locks(), 1);

        state.release_conversation_lock("x", waiting);
        assert_eq!(state.tracked_locks(), 0);
    }
}
