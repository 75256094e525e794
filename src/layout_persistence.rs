//! Loading and self-healing write-back of an account's layout document.

use log::{debug, info, warn};

use crate::error::StoreError;
use crate::layout::LayoutDocument;
use crate::repository::LayoutRepository;
use crate::sanitize::sanitize_with_report;

/// Loads the account's layout and reconciles it against `defaults` on a grid
/// of `columns` columns.
///
/// When the sanitized document differs from what was stored (or nothing was
/// stored), it is written back so later loads see the corrected shape. A failed
/// write-back is logged and does not fail the load. Only a failed fetch is an
/// error.
pub fn hydrate_layout(
    repository: &mut dyn LayoutRepository,
    account_id: &str,
    defaults: &LayoutDocument,
    columns: i32,
) -> Result<LayoutDocument, StoreError> {
    let loaded = repository.load(account_id)?;
    let outcome = sanitize_with_report(loaded.as_ref(), defaults, columns);

    if outcome.used_defaults {
        info!(
            "No usable dashboard layout stored for account {}. Using defaults.",
            account_id
        );
    }
    if !outcome.dropped_ids.is_empty() {
        info!(
            "Dropped unknown or duplicate widget ids from stored layout: {:?}",
            outcome.dropped_ids
        );
    }
    if !outcome.filled_ids.is_empty() && !outcome.used_defaults {
        info!(
            "Filled missing widget ids from defaults: {:?}",
            outcome.filled_ids
        );
    }

    if loaded.as_ref() != Some(&outcome.document) {
        debug!("Writing sanitized layout back for account {}", account_id);
        if let Err(err) = repository.save(account_id, &outcome.document) {
            warn!(
                "Failed to write sanitized layout back for account {}: {}",
                account_id, err
            );
        }
    }

    Ok(outcome.document)
}

#[cfg(test)]
mod tests {
    use super::hydrate_layout;
    use crate::layout::{default_layout_document, GRID_COLUMNS};
    use crate::repository::{LayoutRepository, MemoryRepository};

    #[test]
    fn test_first_load_writes_defaults() {
        let mut repository = MemoryRepository::new();
        let defaults = default_layout_document();
        let document = hydrate_layout(&mut repository, "acct", &defaults, GRID_COLUMNS).expect("hydrate");
        assert_eq!(document, defaults);
        assert_eq!(repository.stored("acct"), Some(defaults));
        assert_eq!(repository.save_count(), 1);
    }

    #[test]
    fn test_clean_document_is_not_rewritten() {
        let mut repository = MemoryRepository::new();
        let defaults = default_layout_document();
        repository.save("acct", &defaults).expect("seed");
        hydrate_layout(&mut repository, "acct", &defaults, GRID_COLUMNS).expect("hydrate");
        assert_eq!(repository.save_count(), 1);
    }

    #[test]
    fn test_drifted_document_is_healed_in_storage() {
        let mut repository = MemoryRepository::new();
        let defaults = default_layout_document();
        repository.put_raw(
            "acct",
            r#"{"widgets":[{"id":"stats","visible":false},{"id":"legacyNews","visible":true}],
                "layout":[{"i":"stats","x":0,"y":0,"w":6,"h":2},{"i":"legacyNews","x":6,"y":0,"w":6,"h":2}]}"#,
        );

        let document = hydrate_layout(&mut repository, "acct", &defaults, GRID_COLUMNS).expect("hydrate");
        assert_eq!(document.widgets.len(), defaults.widgets.len());
        assert!(document.widget("legacyNews").is_none());
        assert_eq!(repository.stored("acct"), Some(document.clone()));

        let reloaded = hydrate_layout(&mut repository, "acct", &defaults, GRID_COLUMNS).expect("hydrate");
        assert_eq!(reloaded, document);
        assert_eq!(repository.save_count(), 1);
    }

    #[test]
    fn test_failed_write_back_still_returns_sanitized_layout() {
        let mut repository = MemoryRepository::new();
        repository.set_fail_saves(true);
        let defaults = default_layout_document();
        let document = hydrate_layout(&mut repository, "acct", &defaults, GRID_COLUMNS).expect("hydrate");
        assert_eq!(document, defaults);
    }

    #[test]
    fn test_failed_fetch_is_an_error() {
        let mut repository = MemoryRepository::new();
        repository.set_fail_loads(true);
        assert!(hydrate_layout(&mut repository, "acct", &default_layout_document(), GRID_COLUMNS).is_err());
    }

    #[test]
    fn test_one_bad_item_keeps_other_customizations() {
        let mut repository = MemoryRepository::new();
        let defaults = default_layout_document();
        let mut customized = defaults.clone();
        customized.widgets[1].visible = false;
        let mut blob = serde_json::to_value(&customized).expect("serialize");
        blob["layout"][0]
            .as_object_mut()
            .expect("layout item object")
            .remove("h");
        repository.put_raw("acct", &blob.to_string());

        let document =
            hydrate_layout(&mut repository, "acct", &defaults, GRID_COLUMNS).expect("hydrate");
        assert!(!document.widget("stats").expect("stats").visible);
        assert_eq!(document.item("totalBalance"), defaults.item("totalBalance"));
        assert_eq!(document.layout.len(), defaults.layout.len());

        let stored = repository.stored("acct").expect("healed document");
        assert!(!stored.widget("stats").expect("stats").visible);
        assert_eq!(stored, document);
    }
}
