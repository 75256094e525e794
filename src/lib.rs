//! Dashboard widget layout engine: per-account layout persistence, sanitizing
//! of stored documents, edit-mode state, drag-reorder and debounced autosave.

pub mod autosave;
pub mod config;
pub mod config_persistence;
pub mod error;
pub mod layout;
pub mod layout_manager;
pub mod layout_persistence;
pub mod protocol;
pub mod reorder;
pub mod repository;
pub mod sanitize;
pub mod settings_db;
pub mod store;
