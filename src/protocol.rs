//! Event-bus protocol between the dashboard UI and the layout manager.

use crate::layout::LayoutItem;
use crate::store::LayoutSnapshot;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Layout(LayoutMessage),
    Notification(Notification),
}

/// Layout commands from the UI and state published back by the manager.
#[derive(Debug, Clone)]
pub enum LayoutMessage {
    BeginCustomizing,
    ToggleWidgetVisibility {
        id: String,
    },
    /// Full replacement of the grid layout, e.g. after the grid itself re-flowed.
    UpdateLayout(Vec<LayoutItem>),
    DragStart {
        id: String,
    },
    /// Drop onto a known widget, or onto nothing.
    DragEnd {
        over_id: Option<String>,
    },
    /// Drop at a pointer position in container pixels. The target is the
    /// rendered widget whose center is nearest.
    DragEndAtPoint {
        x_px: f32,
        y_px: f32,
    },
    DragCancel,
    ResizeWidget {
        id: String,
        w: i32,
        h: i32,
    },
    ViewportResized {
        width_px: u32,
    },
    Save,
    Reset,
    UndoReset,
    CancelCustomization,
    Shutdown,

    StateChanged(LayoutSnapshot),
    CommandRejected {
        reason: String,
    },
}

/// Severity of a user-facing toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Short-lived, non-blocking message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub text: String,
}

impl Notification {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            text: text.into(),
        }
    }
}
