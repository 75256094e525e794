//! In-memory layout store: edit mode, dirty tracking, saves, and reset undo.

use log::{debug, error, info, warn};

use crate::error::{LayoutError, StoreError};
use crate::layout::{LayoutDocument, LayoutItem, WidgetDescriptor, GRID_COLUMNS};
use crate::layout_persistence::hydrate_layout;
use crate::repository::LayoutRepository;

/// Whether the dashboard accepts layout edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Viewing,
    Customizing,
}

/// Why a save is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// User pressed save. Success leaves edit mode.
    Explicit,
    /// Debounce timer fired. Success keeps the current mode.
    Autosave,
}

/// Document captured at the start of a save.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    pub document: LayoutDocument,
    pub trigger: SaveTrigger,
    epoch: u64,
}

/// Read-only view of the store published to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    pub widgets: Vec<WidgetDescriptor>,
    pub layout: Vec<LayoutItem>,
    pub mode: EditMode,
    pub has_changes: bool,
    pub is_saving: bool,
    pub can_undo_reset: bool,
}

/// Sole mutable owner of an account's layout during a session.
pub struct LayoutStore {
    account_id: String,
    defaults: LayoutDocument,
    current: LayoutDocument,
    mode: EditMode,
    has_changes: bool,
    is_saving: bool,
    // Bumped on every local mutation so a save only clears the dirty flag for
    // the state it actually wrote.
    epoch: u64,
    reset_undo: Option<LayoutDocument>,
    columns: i32,
}

impl LayoutStore {
    /// Creates a clean store around an already sanitized document.
    pub fn new(account_id: &str, defaults: LayoutDocument, document: LayoutDocument) -> Self {
        Self {
            account_id: account_id.to_string(),
            defaults,
            current: document,
            mode: EditMode::Viewing,
            has_changes: false,
            is_saving: false,
            epoch: 0,
            reset_undo: None,
            columns: GRID_COLUMNS,
        }
    }

    /// Sets the grid width used when reloaded documents are sanitized.
    pub fn with_grid_columns(mut self, columns: i32) -> Self {
        self.columns = columns.max(1);
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn defaults(&self) -> &LayoutDocument {
        &self.defaults
    }

    pub fn document(&self) -> &LayoutDocument {
        &self.current
    }

    pub fn widgets(&self) -> &[WidgetDescriptor] {
        &self.current.widgets
    }

    pub fn layout(&self) -> &[LayoutItem] {
        &self.current.layout
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn is_customizing(&self) -> bool {
        self.mode == EditMode::Customizing
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    pub fn can_undo_reset(&self) -> bool {
        self.reset_undo.is_some()
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            widgets: self.current.widgets.clone(),
            layout: self.current.layout.clone(),
            mode: self.mode,
            has_changes: self.has_changes,
            is_saving: self.is_saving,
            can_undo_reset: self.reset_undo.is_some(),
        }
    }

    fn ensure_customizing(&self) -> Result<(), LayoutError> {
        if self.mode != EditMode::Customizing {
            return Err(LayoutError::NotCustomizing);
        }
        Ok(())
    }

    fn mark_changed(&mut self) {
        self.has_changes = true;
        self.epoch = self.epoch.wrapping_add(1);
        self.reset_undo = None;
    }

    pub fn begin_customizing(&mut self) {
        if self.mode != EditMode::Customizing {
            debug!("Entering layout edit mode");
        }
        self.mode = EditMode::Customizing;
    }

    /// Flips visibility of one widget. Unknown ids are ignored and return `false`.
    pub fn toggle_widget_visibility(&mut self, id: &str) -> Result<bool, LayoutError> {
        self.ensure_customizing()?;
        let Some(widget) = self.current.widgets.iter_mut().find(|widget| widget.id == id) else {
            debug!("Ignoring visibility toggle for unknown widget {:?}", id);
            return Ok(false);
        };
        widget.visible = !widget.visible;
        self.mark_changed();
        Ok(true)
    }

    /// Replaces the grid layout wholesale.
    pub fn update_layout(&mut self, layout: Vec<LayoutItem>) -> Result<(), LayoutError> {
        self.ensure_customizing()?;
        self.current.layout = layout;
        self.mark_changed();
        Ok(())
    }

    /// Captures the current document for writing and flags the save as in flight.
    pub fn begin_save(&mut self, trigger: SaveTrigger) -> Result<SaveTicket, LayoutError> {
        if self.is_saving {
            return Err(LayoutError::SaveInFlight);
        }
        self.is_saving = true;
        Ok(SaveTicket {
            document: self.current.clone(),
            trigger,
            epoch: self.epoch,
        })
    }

    /// Applies the result of a save started with [`Self::begin_save`].
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), StoreError>,
    ) -> Result<(), LayoutError> {
        self.is_saving = false;
        match result {
            Ok(()) => {
                if ticket.epoch == self.epoch {
                    self.has_changes = false;
                    self.reset_undo = None;
                } else {
                    debug!("Layout changed while saving. Keeping unsaved-changes flag.");
                }
                if ticket.trigger == SaveTrigger::Explicit {
                    self.mode = EditMode::Viewing;
                }
                info!("Saved dashboard layout for account {}", self.account_id);
                Ok(())
            }
            Err(err) => {
                error!(
                    "Failed to save dashboard layout for account {}: {}",
                    self.account_id, err
                );
                self.has_changes = true;
                Err(err.into())
            }
        }
    }

    /// Writes the current document as one atomic replace.
    pub fn save(
        &mut self,
        repository: &mut dyn LayoutRepository,
        trigger: SaveTrigger,
    ) -> Result<(), LayoutError> {
        let ticket = self.begin_save(trigger)?;
        let result = repository.save(&self.account_id, &ticket.document);
        self.finish_save(ticket, result)
    }

    /// Replaces local and stored layout with defaults, keeping the previous
    /// document for [`Self::undo_reset`].
    pub fn reset(&mut self, repository: &mut dyn LayoutRepository) -> Result<(), LayoutError> {
        if self.is_saving {
            return Err(LayoutError::SaveInFlight);
        }
        let previous = std::mem::replace(&mut self.current, self.defaults.clone());
        self.epoch = self.epoch.wrapping_add(1);
        self.reset_undo = Some(previous);
        match repository.save(&self.account_id, &self.defaults) {
            Ok(()) => {
                info!("Reset dashboard layout for account {}", self.account_id);
                self.has_changes = false;
                Ok(())
            }
            Err(err) => {
                error!(
                    "Failed to persist layout reset for account {}: {}",
                    self.account_id, err
                );
                self.has_changes = true;
                Err(err.into())
            }
        }
    }

    /// Restores the document replaced by the last reset. Returns `false` when
    /// there is nothing to restore.
    pub fn undo_reset(&mut self) -> bool {
        let Some(previous) = self.reset_undo.take() else {
            return false;
        };
        self.current = previous;
        self.has_changes = true;
        self.epoch = self.epoch.wrapping_add(1);
        true
    }

    /// Drops local edits by reloading the stored document, and leaves edit mode.
    ///
    /// On a failed fetch the store falls back to defaults and the error is
    /// returned for the caller to surface.
    pub fn cancel_customization(
        &mut self,
        repository: &mut dyn LayoutRepository,
    ) -> Result<(), StoreError> {
        let reloaded = hydrate_layout(repository, &self.account_id, &self.defaults, self.columns);
        let result = match reloaded {
            Ok(document) => {
                self.current = document;
                Ok(())
            }
            Err(err) => {
                warn!(
                    "Failed to reload dashboard layout for account {}. Using defaults. error={}",
                    self.account_id, err
                );
                self.current = self.defaults.clone();
                Err(err)
            }
        };
        self.mode = EditMode::Viewing;
        self.has_changes = false;
        self.epoch = self.epoch.wrapping_add(1);
        self.reset_undo = None;
        result
    }
}
