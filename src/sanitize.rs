//! Reconciles a persisted layout document against the current widget schema.

use std::collections::HashSet;

use log::{debug, trace};

use crate::layout::{LayoutDocument, LayoutItem, WidgetDescriptor, MAX_GRID_ROW};

/// Result of reconciling one document, with the ids that were changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOutcome {
    pub document: LayoutDocument,
    /// Ids present in the loaded document that the schema no longer knows,
    /// plus repeated occurrences of known ids.
    pub dropped_ids: Vec<String>,
    /// Ids appended from defaults because the loaded document lacked them.
    pub filled_ids: Vec<String>,
    /// True when the loaded document was absent or structurally empty.
    pub used_defaults: bool,
}

/// Sanitizes a loaded document; see [`sanitize_with_report`].
pub fn sanitize(
    loaded: Option<&LayoutDocument>,
    defaults: &LayoutDocument,
    columns: i32,
) -> LayoutDocument {
    sanitize_with_report(loaded, defaults, columns).document
}

/// Drops unknown and duplicate ids, fills missing ids from defaults, and
/// normalizes item geometry against the default bounds and a grid of
/// `columns` columns.
pub fn sanitize_with_report(
    loaded: Option<&LayoutDocument>,
    defaults: &LayoutDocument,
    columns: i32,
) -> SanitizeOutcome {
    let columns = columns.max(1);
    let normalize = |loaded: &LayoutItem, default_item: &LayoutItem| {
        normalize_item(loaded, default_item, columns)
    };
    let Some(loaded) = loaded.filter(|document| !document.is_structurally_empty()) else {
        return SanitizeOutcome {
            document: LayoutDocument {
                widgets: defaults.widgets.clone(),
                layout: defaults
                    .layout
                    .iter()
                    .map(|item| normalize(item, item))
                    .collect(),
            },
            dropped_ids: Vec::new(),
            filled_ids: Vec::new(),
            used_defaults: true,
        };
    };

    let mut dropped_ids = Vec::new();
    let mut filled_ids = Vec::new();
    let layout = reconcile_by_id(
        &loaded.layout,
        &defaults.layout,
        |item: &LayoutItem| item.id.as_str(),
        normalize,
        &mut dropped_ids,
        &mut filled_ids,
    );
    let widgets = reconcile_by_id(
        &loaded.widgets,
        &defaults.widgets,
        |widget: &WidgetDescriptor| widget.id.as_str(),
        |loaded, _| loaded.clone(),
        &mut dropped_ids,
        &mut filled_ids,
    );
    dropped_ids.sort();
    dropped_ids.dedup();
    filled_ids.sort();
    filled_ids.dedup();

    SanitizeOutcome {
        document: LayoutDocument { widgets, layout },
        dropped_ids,
        filled_ids,
        used_defaults: false,
    }
}

fn reconcile_by_id<T, I, N>(
    loaded: &[T],
    defaults: &[T],
    id_of: I,
    normalize: N,
    dropped_ids: &mut Vec<String>,
    filled_ids: &mut Vec<String>,
) -> Vec<T>
where
    T: Clone,
    I: Fn(&T) -> &str,
    N: Fn(&T, &T) -> T,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(defaults.len());
    for entry in loaded {
        let id = id_of(entry);
        let Some(default_entry) = defaults.iter().find(|candidate| id_of(*candidate) == id) else {
            trace!("Dropping unknown layout id {:?}", id);
            dropped_ids.push(id.to_string());
            continue;
        };
        if !seen.insert(id.to_string()) {
            trace!("Dropping duplicate layout id {:?}", id);
            dropped_ids.push(id.to_string());
            continue;
        }
        out.push(normalize(entry, default_entry));
    }
    if out.is_empty() {
        debug!("No persisted layout ids are known. Falling back to defaults for this list.");
    }
    for default_entry in defaults {
        let id = id_of(default_entry);
        if seen.insert(id.to_string()) {
            filled_ids.push(id.to_string());
            out.push(normalize(default_entry, default_entry));
        }
    }
    out
}

fn normalize_item(loaded: &LayoutItem, default_item: &LayoutItem, columns: i32) -> LayoutItem {
    let mut item = LayoutItem {
        id: loaded.id.clone(),
        x: loaded.x,
        y: loaded.y.clamp(0, MAX_GRID_ROW),
        w: if loaded.w >= 1 { loaded.w } else { default_item.w },
        h: if loaded.h >= 1 { loaded.h } else { default_item.h },
        min_w: default_item.min_w,
        min_h: default_item.min_h,
        max_w: default_item.max_w,
        max_h: default_item.max_h,
    };
    item.w = item.clamp_width(item.w, columns);
    item.h = item.clamp_height(item.h);
    item.x = item.x.clamp(0, columns - item.w);
    item
}
