//! Drag-reorder and resize transforms over the dashboard grid.

use log::trace;

use crate::layout::{flow_visible_items, LayoutDocument, LayoutItem, PixelRect};

/// Moves one element from `from` to `to`, shifting the ones in between.
///
/// Returns `false` (leaving `items` untouched) when either index is out of range.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from != to {
        let moved = items.remove(from);
        items.insert(to, moved);
    }
    true
}

/// Moves `active_id` to the slot of `over_id` among visible items, keeping
/// hidden items in their stored slots. Returns `None` when the move is a no-op
/// or either id is not currently rendered.
pub fn reorder_visible_items(
    document: &LayoutDocument,
    active_id: &str,
    over_id: &str,
) -> Option<Vec<LayoutItem>> {
    if active_id == over_id {
        return None;
    }
    let visible = document.visible_ids();
    let mut visible_items: Vec<LayoutItem> = document
        .layout
        .iter()
        .filter(|item| visible.contains(item.id.as_str()))
        .cloned()
        .collect();
    let from = visible_items.iter().position(|item| item.id == active_id)?;
    let to = visible_items.iter().position(|item| item.id == over_id)?;
    move_item(&mut visible_items, from, to);

    let mut visible_iter = visible_items.into_iter();
    let mut reordered = Vec::with_capacity(document.layout.len());
    for item in &document.layout {
        if visible.contains(item.id.as_str()) {
            if let Some(next_visible) = visible_iter.next() {
                reordered.push(next_visible);
            }
        } else {
            reordered.push(item.clone());
        }
    }
    Some(reordered)
}

/// Returns the id whose rectangle center is nearest to `point`.
///
/// Ties go to the earliest candidate. A non-finite point has no target.
pub fn closest_center<'a>(
    point: (f32, f32),
    candidates: &[(&'a str, PixelRect)],
) -> Option<&'a str> {
    if !point.0.is_finite() || !point.1.is_finite() {
        return None;
    }
    let mut best: Option<(&'a str, f32)> = None;
    for &(id, rect) in candidates {
        let (cx, cy) = rect.center();
        let distance = (cx - point.0).powi(2) + (cy - point.1).powi(2);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((id, distance)),
        }
    }
    best.map(|(id, _)| id)
}

/// Clamps a requested span into the item's bounds and returns the new layout.
/// Returns `None` for unknown ids.
pub fn resize_item(
    layout: &[LayoutItem],
    id: &str,
    w: i32,
    h: i32,
    columns: i32,
) -> Option<Vec<LayoutItem>> {
    let index = layout.iter().position(|item| item.id == id)?;
    let mut next = layout.to_vec();
    let item = &mut next[index];
    item.w = item.clamp_width(w, columns);
    item.h = item.clamp_height(h);
    item.x = item.x.clamp(0, columns.saturating_sub(item.w).max(0));
    Some(next)
}

/// Tracks the widget currently being dragged.
#[derive(Debug, Default)]
pub struct DragController {
    active_id: Option<String>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn drag_start(&mut self, id: &str) {
        trace!("Drag start on widget {:?}", id);
        self.active_id = Some(id.to_string());
    }

    pub fn drag_cancel(&mut self) {
        trace!("Drag cancelled");
        self.active_id = None;
    }

    /// Finishes the drag. Returns the re-flowed layout when the widget was
    /// dropped on a different widget.
    pub fn drag_end(
        &mut self,
        over_id: Option<&str>,
        document: &LayoutDocument,
        columns: i32,
    ) -> Option<Vec<LayoutItem>> {
        let active_id = self.active_id.take()?;
        let over_id = over_id?;
        trace!("Drag end: {:?} over {:?}", active_id, over_id);
        let reordered = reorder_visible_items(document, &active_id, over_id)?;
        Some(flow_visible_items(&reordered, &document.visible_ids(), columns))
    }
}
