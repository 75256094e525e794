//! Dashboard widget catalog, persisted layout document, and grid geometry.

use std::collections::HashSet;

use crate::config::GridConfig;

/// Column count of the default dashboard grid.
pub const GRID_COLUMNS: i32 = 12;

/// Largest row index or row span a stored item may use.
pub const MAX_GRID_ROW: i32 = 1_000;

/// Widget kinds the dashboard knows how to render.
///
/// Ids are the stable camelCase strings stored in the persisted document; a
/// stored id that maps to no kind here belongs to a widget that was removed
/// from the product and is dropped on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    TotalBalance,
    Stats,
    Portfolio,
    TopMovers,
    QuickActions,
    RecentTrades,
    AiInsights,
    PremiumCta,
}

impl WidgetKind {
    /// Every kind, in default dashboard order.
    pub const ALL: [WidgetKind; 8] = [
        WidgetKind::TotalBalance,
        WidgetKind::Stats,
        WidgetKind::Portfolio,
        WidgetKind::TopMovers,
        WidgetKind::QuickActions,
        WidgetKind::RecentTrades,
        WidgetKind::AiInsights,
        WidgetKind::PremiumCta,
    ];

    /// Converts this kind to its persisted id.
    pub fn as_id(self) -> &'static str {
        match self {
            Self::TotalBalance => "totalBalance",
            Self::Stats => "stats",
            Self::Portfolio => "portfolio",
            Self::TopMovers => "topMovers",
            Self::QuickActions => "quickActions",
            Self::RecentTrades => "recentTrades",
            Self::AiInsights => "aiInsights",
            Self::PremiumCta => "premiumCTA",
        }
    }

    /// Resolves a persisted id. Returns `None` for ids no longer in the catalog.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_id() == id)
    }

    fn default_visible(self) -> bool {
        !matches!(self, Self::PremiumCta)
    }

    // (x, y, w, h, min_w, min_h, max_w, max_h)
    fn default_geometry(self) -> (i32, i32, i32, i32, i32, i32, i32, i32) {
        match self {
            Self::TotalBalance => (0, 0, 4, 2, 3, 2, 12, 4),
            Self::Stats => (4, 0, 8, 2, 4, 2, 12, 4),
            Self::Portfolio => (0, 2, 8, 4, 4, 3, 12, 8),
            Self::TopMovers => (8, 2, 4, 4, 3, 3, 6, 8),
            Self::QuickActions => (0, 6, 4, 2, 3, 2, 6, 3),
            Self::RecentTrades => (4, 6, 8, 4, 4, 3, 12, 8),
            Self::AiInsights => (0, 10, 6, 3, 4, 2, 12, 6),
            Self::PremiumCta => (6, 10, 6, 3, 4, 2, 12, 4),
        }
    }

    /// Builds the default visibility descriptor for this kind.
    pub fn default_descriptor(self) -> WidgetDescriptor {
        WidgetDescriptor {
            id: self.as_id().to_string(),
            visible: self.default_visible(),
        }
    }

    /// Builds the default grid placement for this kind.
    pub fn default_item(self) -> LayoutItem {
        let (x, y, w, h, min_w, min_h, max_w, max_h) = self.default_geometry();
        LayoutItem {
            id: self.as_id().to_string(),
            x,
            y,
            w,
            h,
            min_w: Some(min_w),
            min_h: Some(min_h),
            max_w: Some(max_w),
            max_h: Some(max_h),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Visibility entry for one widget.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct WidgetDescriptor {
    pub id: String,
    #[serde(default = "default_true")]
    pub visible: bool,
}

/// Grid placement for one widget, in grid units.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    #[serde(rename = "i")]
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<i32>,
}

impl LayoutItem {
    /// Clamps a requested width into this item's bounds and the grid width.
    pub fn clamp_width(&self, requested: i32, columns: i32) -> i32 {
        let columns = columns.max(1);
        let min = self.min_w.unwrap_or(1).clamp(1, columns);
        let max = self.max_w.unwrap_or(columns).clamp(min, columns);
        requested.clamp(min, max)
    }

    /// Clamps a requested height into this item's bounds.
    pub fn clamp_height(&self, requested: i32) -> i32 {
        let min = self.min_h.unwrap_or(1).clamp(1, MAX_GRID_ROW);
        let max = self.max_h.unwrap_or(MAX_GRID_ROW).clamp(min, MAX_GRID_ROW);
        requested.clamp(min, max)
    }
}

/// The single JSON value persisted per account.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct LayoutDocument {
    #[serde(default)]
    pub widgets: Vec<WidgetDescriptor>,
    #[serde(default)]
    pub layout: Vec<LayoutItem>,
}

impl LayoutDocument {
    /// Either list empty means "no prior customization".
    pub fn is_structurally_empty(&self) -> bool {
        self.widgets.is_empty() || self.layout.is_empty()
    }

    /// Ids of widgets flagged visible.
    pub fn visible_ids(&self) -> HashSet<&str> {
        self.widgets
            .iter()
            .filter(|widget| widget.visible)
            .map(|widget| widget.id.as_str())
            .collect()
    }

    /// Layout items that are currently rendered, in layout order.
    pub fn visible_layout(&self) -> Vec<&LayoutItem> {
        let visible = self.visible_ids();
        self.layout
            .iter()
            .filter(|item| visible.contains(item.id.as_str()))
            .collect()
    }

    pub fn widget(&self, id: &str) -> Option<&WidgetDescriptor> {
        self.widgets.iter().find(|widget| widget.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&LayoutItem> {
        self.layout.iter().find(|item| item.id == id)
    }
}

/// Builds the defaults document from the widget catalog.
pub fn default_layout_document() -> LayoutDocument {
    LayoutDocument {
        widgets: WidgetKind::ALL
            .into_iter()
            .map(WidgetKind::default_descriptor)
            .collect(),
        layout: WidgetKind::ALL
            .into_iter()
            .map(WidgetKind::default_item)
            .collect(),
    }
}

/// Re-packs visible items left-to-right into rows, in list order.
///
/// Hidden items keep their stored coordinates.
pub fn flow_visible_items(
    layout: &[LayoutItem],
    visible: &HashSet<&str>,
    columns: i32,
) -> Vec<LayoutItem> {
    let columns = columns.max(1);
    let mut cursor_x = 0;
    let mut row_y: i32 = 0;
    let mut row_height = 0;
    layout
        .iter()
        .map(|item| {
            if !visible.contains(item.id.as_str()) {
                return item.clone();
            }
            let w = item.w.clamp(1, columns);
            if cursor_x + w > columns {
                row_y = row_y.saturating_add(row_height);
                cursor_x = 0;
                row_height = 0;
            }
            let mut placed = item.clone();
            placed.x = cursor_x;
            placed.y = row_y;
            placed.w = w;
            cursor_x += w;
            row_height = row_height.max(item.h.max(1));
            placed
        })
        .collect()
}

/// Pixel rectangle of a rendered widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Grid-unit to pixel conversion for the rendered dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub columns: i32,
    pub row_height_px: f32,
    pub margin_px: f32,
    pub container_width_px: f32,
}

impl GridMetrics {
    pub fn from_config(grid: &GridConfig) -> Self {
        Self {
            columns: grid.columns.max(1) as i32,
            row_height_px: grid.row_height_px as f32,
            margin_px: grid.margin_px as f32,
            container_width_px: grid.container_width_px as f32,
        }
    }

    fn column_width_px(&self) -> f32 {
        let gutters = self.margin_px * (self.columns + 1) as f32;
        ((self.container_width_px - gutters) / self.columns as f32).max(0.0)
    }

    /// Computes the pixel rectangle of one item.
    pub fn item_rect(&self, item: &LayoutItem) -> PixelRect {
        let column_width = self.column_width_px();
        let w = item.w.max(1) as f32;
        let h = item.h.max(1) as f32;
        PixelRect {
            x: self.margin_px + item.x.max(0) as f32 * (column_width + self.margin_px),
            y: self.margin_px + item.y.max(0) as f32 * (self.row_height_px + self.margin_px),
            width: column_width * w + self.margin_px * (w - 1.0),
            height: self.row_height_px * h + self.margin_px * (h - 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{
        default_layout_document, flow_visible_items, GridMetrics, LayoutDocument, LayoutItem,
        WidgetKind, GRID_COLUMNS, MAX_GRID_ROW,
    };

    fn item(id: &str, w: i32, h: i32) -> LayoutItem {
        LayoutItem {
            id: id.to_string(),
            x: 0,
            y: 0,
            w,
            h,
            min_w: None,
            min_h: None,
            max_w: None,
            max_h: None,
        }
    }

    #[test]
    fn test_default_document_covers_every_widget_kind_once() {
        let defaults = default_layout_document();
        assert_eq!(defaults.widgets.len(), WidgetKind::ALL.len());
        assert_eq!(defaults.layout.len(), WidgetKind::ALL.len());
        let ids: HashSet<&str> = defaults.layout.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids.len(), WidgetKind::ALL.len());
        for kind in WidgetKind::ALL {
            assert_eq!(WidgetKind::from_id(kind.as_id()), Some(kind));
        }
    }

    #[test]
    fn test_premium_cta_is_hidden_by_default() {
        let defaults = default_layout_document();
        let premium = defaults.widget("premiumCTA").expect("premium widget");
        assert!(!premium.visible);
        assert!(!defaults.visible_ids().contains("premiumCTA"));
        assert!(defaults.item("premiumCTA").is_some());
    }

    #[test]
    fn test_default_items_fit_inside_grid_and_bounds() {
        for item in default_layout_document().layout {
            assert!(item.x >= 0 && item.x + item.w <= GRID_COLUMNS, "{}", item.id);
            assert_eq!(item.clamp_width(item.w, GRID_COLUMNS), item.w);
            assert_eq!(item.clamp_height(item.h), item.h);
        }
    }

    #[test]
    fn test_layout_item_uses_grid_library_field_names() {
        let json = serde_json::to_value(WidgetKind::Stats.default_item()).expect("serialize");
        assert_eq!(json["i"], "stats");
        assert_eq!(json["minW"], 4);
        assert!(json.get("id").is_none());

        let parsed: LayoutItem =
            serde_json::from_str(r#"{"i":"stats","x":1,"y":2,"w":3,"h":4}"#).expect("parse");
        assert_eq!(parsed.min_w, None);
        let round_trip = serde_json::to_value(&parsed).expect("serialize");
        assert!(round_trip.get("minW").is_none());
    }

    #[test]
    fn test_missing_lists_deserialize_as_empty_document() {
        let parsed: LayoutDocument = serde_json::from_str(r#"{"widgets":[]}"#).expect("parse");
        assert!(parsed.is_structurally_empty());
    }

    #[test]
    fn test_flow_wraps_rows_and_skips_hidden_items() {
        let layout = vec![item("a", 8, 2), item("hidden", 4, 9), item("b", 6, 3), item("c", 6, 1)];
        let visible: HashSet<&str> = ["a", "b", "c"].into_iter().collect();
        let flowed = flow_visible_items(&layout, &visible, 12);
        assert_eq!((flowed[0].x, flowed[0].y), (0, 0));
        assert_eq!(flowed[1], layout[1]);
        assert_eq!((flowed[2].x, flowed[2].y), (0, 2));
        assert_eq!((flowed[3].x, flowed[3].y), (6, 2));
    }

    #[test]
    fn test_item_rect_accounts_for_margins() {
        let metrics = GridMetrics {
            columns: 12,
            row_height_px: 80.0,
            margin_px: 10.0,
            container_width_px: 1210.0,
        };
        let mut placed = item("a", 2, 2);
        placed.x = 1;
        placed.y = 1;
        let rect = metrics.item_rect(&placed);
        // column width: (1210 - 130) / 12 = 90
        assert_eq!(rect.x, 110.0);
        assert_eq!(rect.y, 100.0);
        assert_eq!(rect.width, 190.0);
        assert_eq!(rect.height, 170.0);
    }

    #[test]
    fn test_flow_saturates_instead_of_overflowing_on_huge_rows() {
        let layout = vec![
            item("a", 12, i32::MAX),
            item("b", 12, i32::MAX),
            item("c", 12, 1),
        ];
        let visible: HashSet<&str> = ["a", "b", "c"].into_iter().collect();
        let flowed = flow_visible_items(&layout, &visible, 12);
        assert_eq!(flowed[1].y, i32::MAX);
        assert_eq!(flowed[2].y, i32::MAX);
    }

    #[test]
    fn test_unbounded_height_clamps_to_max_row() {
        let tall = item("a", 1, i32::MAX);
        assert_eq!(tall.clamp_height(tall.h), MAX_GRID_ROW);
    }
}
