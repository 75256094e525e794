//! Dashboard layout actor.
//!
//! The manager owns the layout store, the repository handle and the autosave
//! deadline. It consumes `LayoutMessage` commands from the bus, applies them to
//! the store, and publishes a `StateChanged` snapshot after every visible state
//! change. Load and save failures are surfaced as notifications.

use log::{debug, error, info, trace, warn};
use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};
use tokio::time::Instant;

use crate::autosave::AutosaveDebouncer;
use crate::config::EngineConfig;
use crate::error::LayoutError;
use crate::layout::{GridMetrics, LayoutDocument, LayoutItem, PixelRect};
use crate::layout_persistence::hydrate_layout;
use crate::protocol::{LayoutMessage, Message, Notification};
use crate::reorder::{closest_center, resize_item, DragController};
use crate::repository::LayoutRepository;
use crate::sanitize::sanitize;
use crate::store::{LayoutStore, SaveTrigger};

const LOAD_FAILED_TEXT: &str = "Couldn't load your dashboard layout. Showing the default layout.";

enum LoopEvent {
    Bus(Result<Message, RecvError>),
    AutosaveDue,
}

/// Bus-driven owner of one account's dashboard layout.
pub struct LayoutManager {
    store: LayoutStore,
    repository: Box<dyn LayoutRepository + Send>,
    drag: DragController,
    autosave: AutosaveDebouncer,
    grid: GridMetrics,
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    startup_notice: Option<Notification>,
}

impl LayoutManager {
    /// Hydrates the account's layout and prepares the manager.
    ///
    /// A failed load falls back to `defaults`; the failure is reported as a
    /// notification once [`Self::run`] starts.
    pub fn new(
        config: &EngineConfig,
        defaults: LayoutDocument,
        mut repository: Box<dyn LayoutRepository + Send>,
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
    ) -> Self {
        let grid = GridMetrics::from_config(&config.grid);
        // Catalog defaults fitted to the configured grid.
        let defaults = sanitize(None, &defaults, grid.columns);
        let hydrated = hydrate_layout(
            repository.as_mut(),
            &config.account_id,
            &defaults,
            grid.columns,
        );
        let (document, startup_notice) = match hydrated {
            Ok(document) => (document, None),
            Err(err) => {
                error!(
                    "Failed to load dashboard layout for account {}: {}",
                    config.account_id, err
                );
                (defaults.clone(), Some(Notification::error(LOAD_FAILED_TEXT)))
            }
        };

        Self {
            store: LayoutStore::new(&config.account_id, defaults, document)
                .with_grid_columns(grid.columns),
            repository,
            drag: DragController::new(),
            autosave: AutosaveDebouncer::new(config.autosave_delay()),
            grid,
            bus_consumer,
            bus_producer,
            startup_notice,
        }
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    /// Runs until `Shutdown` is received or the bus closes.
    pub async fn run(mut self) {
        info!(
            "LayoutManager: started for account {}",
            self.store.account_id()
        );
        self.publish_state();
        if let Some(notice) = self.startup_notice.take() {
            self.notify(notice);
        }

        loop {
            let deadline = self.autosave.deadline();
            let event = tokio::select! {
                received = self.bus_consumer.recv() => LoopEvent::Bus(received),
                _ = sleep_until_deadline(deadline) => LoopEvent::AutosaveDue,
            };

            match event {
                LoopEvent::Bus(Ok(Message::Layout(message))) => {
                    if !self.handle_message(message) {
                        break;
                    }
                }
                LoopEvent::Bus(Ok(Message::Notification(_))) => {}
                LoopEvent::Bus(Err(RecvError::Lagged(skipped))) => {
                    warn!(
                        "LayoutManager lagged on control bus, skipped {} message(s)",
                        skipped
                    );
                }
                LoopEvent::Bus(Err(RecvError::Closed)) => {
                    error!("LayoutManager: bus closed");
                    self.discard_pending_autosave();
                    break;
                }
                LoopEvent::AutosaveDue => {
                    if self.autosave.take_if_due(Instant::now()) {
                        self.run_autosave();
                    }
                }
            }
        }
        debug!("LayoutManager: stopped");
    }

    /// Applies one command. Returns `false` when the manager should stop.
    fn handle_message(&mut self, message: LayoutMessage) -> bool {
        match message {
            LayoutMessage::BeginCustomizing => {
                self.store.begin_customizing();
                self.publish_state();
            }
            LayoutMessage::ToggleWidgetVisibility { id } => {
                match self.store.toggle_widget_visibility(&id) {
                    Ok(true) => self.publish_state(),
                    Ok(false) => {}
                    Err(err) => self.reject(err),
                }
            }
            LayoutMessage::UpdateLayout(layout) => self.apply_layout(layout),
            LayoutMessage::DragStart { id } => {
                if self.store.is_customizing() {
                    self.drag.drag_start(&id);
                } else {
                    self.reject(LayoutError::NotCustomizing);
                }
            }
            LayoutMessage::DragEnd { over_id } => self.finish_drag(over_id.as_deref()),
            LayoutMessage::DragEndAtPoint { x_px, y_px } => {
                let over_id = self.drop_target_at((x_px, y_px));
                self.finish_drag(over_id.as_deref());
            }
            LayoutMessage::DragCancel => self.drag.drag_cancel(),
            LayoutMessage::ResizeWidget { id, w, h } => {
                match resize_item(self.store.layout(), &id, w, h, self.grid.columns) {
                    Some(layout) => self.apply_layout(layout),
                    None => debug!("Ignoring resize for unknown widget {:?}", id),
                }
            }
            LayoutMessage::ViewportResized { width_px } => {
                self.grid.container_width_px = width_px.max(1) as f32;
            }
            LayoutMessage::Save => {
                self.autosave.cancel();
                self.save(SaveTrigger::Explicit);
            }
            LayoutMessage::Reset => {
                self.autosave.cancel();
                if let Err(err) = self.store.reset(self.repository.as_mut()) {
                    self.notify(Notification::error(format!(
                        "Couldn't reset your dashboard layout: {}",
                        err
                    )));
                }
                self.publish_state();
            }
            LayoutMessage::UndoReset => {
                if self.store.undo_reset() {
                    self.autosave.arm(Instant::now());
                    self.publish_state();
                } else {
                    debug!("Nothing to undo for layout reset");
                }
            }
            LayoutMessage::CancelCustomization => {
                self.autosave.cancel();
                self.drag.drag_cancel();
                if self
                    .store
                    .cancel_customization(self.repository.as_mut())
                    .is_err()
                {
                    self.notify(Notification::error(LOAD_FAILED_TEXT));
                }
                self.publish_state();
            }
            LayoutMessage::Shutdown => {
                self.discard_pending_autosave();
                return false;
            }
            LayoutMessage::StateChanged(_) | LayoutMessage::CommandRejected { .. } => {
                trace!("LayoutManager: ignoring own output message");
            }
        }
        true
    }

    fn apply_layout(&mut self, layout: Vec<LayoutItem>) {
        match self.store.update_layout(layout) {
            Ok(()) => {
                self.autosave.arm(Instant::now());
                self.publish_state();
            }
            Err(err) => self.reject(err),
        }
    }

    fn finish_drag(&mut self, over_id: Option<&str>) {
        if let Some(layout) = self
            .drag
            .drag_end(over_id, self.store.document(), self.grid.columns)
        {
            self.apply_layout(layout);
        }
    }

    fn drop_target_at(&self, point: (f32, f32)) -> Option<String> {
        let candidates: Vec<(&str, PixelRect)> = self
            .store
            .document()
            .visible_layout()
            .into_iter()
            .map(|item| (item.id.as_str(), self.grid.item_rect(item)))
            .collect();
        closest_center(point, &candidates).map(str::to_string)
    }

    fn run_autosave(&mut self) {
        if !self.store.has_changes() {
            trace!("Autosave fired with no pending changes");
            return;
        }
        debug!("Autosaving dashboard layout");
        self.save(SaveTrigger::Autosave);
    }

    fn save(&mut self, trigger: SaveTrigger) {
        let ticket = match self.store.begin_save(trigger) {
            Ok(ticket) => ticket,
            Err(err) => {
                self.reject(err);
                return;
            }
        };
        self.publish_state();

        let result = self
            .repository
            .save(self.store.account_id(), &ticket.document);
        if let Err(err) = self.store.finish_save(ticket, result) {
            self.notify(Notification::error(format!(
                "Couldn't save your dashboard layout: {}",
                err
            )));
        }
        self.publish_state();
    }

    fn discard_pending_autosave(&mut self) {
        self.autosave.cancel();
        if self.store.has_changes() {
            warn!(
                "Discarding unsaved dashboard layout changes for account {}",
                self.store.account_id()
            );
            self.notify(Notification::warning(
                "Unsaved dashboard layout changes were discarded.",
            ));
        }
    }

    fn reject(&self, err: LayoutError) {
        debug!("LayoutManager: rejected command: {}", err);
        let _ = self
            .bus_producer
            .send(Message::Layout(LayoutMessage::CommandRejected {
                reason: err.to_string(),
            }));
    }

    fn notify(&self, notification: Notification) {
        let _ = self.bus_producer.send(Message::Notification(notification));
    }

    fn publish_state(&self) {
        let _ = self
            .bus_producer
            .send(Message::Layout(LayoutMessage::StateChanged(
                self.store.snapshot(),
            )));
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
