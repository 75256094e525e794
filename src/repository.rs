//! Account-scoped load/replace access to the persisted layout document.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::error::StoreError;
use crate::layout::LayoutDocument;

/// Single-document read/replace access to an account's stored layout.
pub trait LayoutRepository {
    /// Returns the stored document, or `None` when the account has none.
    fn load(&self, account_id: &str) -> Result<Option<LayoutDocument>, StoreError>;

    /// Replaces the stored document wholesale.
    fn save(&mut self, account_id: &str, document: &LayoutDocument) -> Result<(), StoreError>;
}

/// Stored document with list entries left unparsed, so one bad entry does not
/// discard the rest.
#[derive(Debug, serde::Deserialize)]
struct RawLayoutDocument {
    #[serde(default)]
    widgets: Vec<serde_json::Value>,
    #[serde(default)]
    layout: Vec<serde_json::Value>,
}

/// Parses a stored layout blob.
///
/// A blob that is not a document at all counts as absent. Individual list
/// entries that fail to parse are dropped, leaving the sanitizer to restore
/// their ids from defaults.
pub fn parse_layout_blob(account_id: &str, text: &str) -> Option<LayoutDocument> {
    let raw = match serde_json::from_str::<RawLayoutDocument>(text) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(
                "Stored dashboard layout for account {} is not a valid document. Using defaults. error={}",
                account_id, err
            );
            return None;
        }
    };
    Some(LayoutDocument {
        widgets: parse_entries(account_id, "widget", raw.widgets),
        layout: parse_entries(account_id, "layout item", raw.layout),
    })
}

fn parse_entries<T: serde::de::DeserializeOwned>(
    account_id: &str,
    kind: &str,
    values: Vec<serde_json::Value>,
) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(
                    "Dropping malformed {} from stored layout for account {}: {}",
                    kind, account_id, err
                );
                None
            }
        })
        .collect()
}

#[derive(Debug, Default)]
struct MemoryRepositoryState {
    blobs: HashMap<String, String>,
    fail_loads: bool,
    fail_saves: bool,
    save_count: usize,
}

/// In-memory repository. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryRepositoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MemoryRepositoryState) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    /// Stores a raw JSON blob for an account, bypassing serialization.
    pub fn put_raw(&self, account_id: &str, blob: &str) {
        self.with_state(|state| {
            state.blobs.insert(account_id.to_string(), blob.to_string());
        });
    }

    /// Returns the raw JSON blob stored for an account.
    pub fn raw(&self, account_id: &str) -> Option<String> {
        self.with_state(|state| state.blobs.get(account_id).cloned())
    }

    /// Returns the parsed document stored for an account.
    pub fn stored(&self, account_id: &str) -> Option<LayoutDocument> {
        self.raw(account_id)
            .and_then(|blob| serde_json::from_str(&blob).ok())
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.with_state(|state| state.fail_loads = fail);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.with_state(|state| state.fail_saves = fail);
    }

    /// Number of successful saves since creation.
    pub fn save_count(&self) -> usize {
        self.with_state(|state| state.save_count)
    }
}

impl LayoutRepository for MemoryRepository {
    fn load(&self, account_id: &str) -> Result<Option<LayoutDocument>, StoreError> {
        self.with_state(|state| {
            if state.fail_loads {
                return Err(StoreError::Unavailable("load rejected".to_string()));
            }
            Ok(state
                .blobs
                .get(account_id)
                .and_then(|blob| parse_layout_blob(account_id, blob)))
        })
    }

    fn save(&mut self, account_id: &str, document: &LayoutDocument) -> Result<(), StoreError> {
        let blob = serde_json::to_string(document)?;
        self.with_state(|state| {
            if state.fail_saves {
                return Err(StoreError::Unavailable("save rejected".to_string()));
            }
            state.blobs.insert(account_id.to_string(), blob);
            state.save_count += 1;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{LayoutRepository, MemoryRepository};
    use crate::layout::default_layout_document;

    #[test]
    fn test_clones_share_storage() {
        let repository = MemoryRepository::new();
        let mut writer = repository.clone();
        writer
            .save("acct", &default_layout_document())
            .expect("save should succeed");
        assert_eq!(repository.save_count(), 1);
        assert_eq!(repository.stored("acct"), Some(default_layout_document()));
    }

    #[test]
    fn test_malformed_blob_loads_as_absent() {
        let repository = MemoryRepository::new();
        repository.put_raw("acct", "{\"widgets\": 7");
        assert_eq!(repository.load("acct").expect("load"), None);
        assert_eq!(repository.load("other").expect("load"), None);
    }

    #[test]
    fn test_injected_failures_surface_as_errors() {
        let mut repository = MemoryRepository::new();
        repository.set_fail_saves(true);
        assert!(repository.save("acct", &default_layout_document()).is_err());
        assert_eq!(repository.save_count(), 0);
        repository.set_fail_loads(true);
        assert!(repository.load("acct").is_err());
    }

    #[test]
    fn test_malformed_entry_is_dropped_without_losing_the_rest() {
        let repository = MemoryRepository::new();
        repository.put_raw(
            "acct",
            r#"{"widgets":[{"id":"stats","visible":false},{"visible":true}],
                "layout":[{"i":"totalBalance","x":0,"y":0,"w":4},
                          {"i":"stats","x":4,"y":0,"w":8,"h":2}]}"#,
        );
        let document = repository.load("acct").expect("load").expect("document");
        assert_eq!(document.widgets.len(), 1);
        assert!(!document.widgets[0].visible);
        assert_eq!(document.layout.len(), 1);
        assert_eq!(document.layout[0].id, "stats");
    }

    #[test]
    fn test_non_list_sections_load_as_absent() {
        let repository = MemoryRepository::new();
        repository.put_raw("acct", r#"{"widgets":{"stats":true},"layout":[]}"#);
        assert_eq!(repository.load("acct").expect("load"), None);
    }
}
