//! Persistent engine configuration model and defaults.

use std::path::PathBuf;

/// Root configuration persisted to `dashboard.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EngineConfig {
    /// Account whose settings row holds the dashboard layout.
    #[serde(default)]
    pub account_id: String,
    /// Debounced autosave behavior.
    #[serde(default)]
    pub autosave: AutosaveConfig,
    /// Dashboard grid geometry.
    #[serde(default)]
    pub grid: GridConfig,
    /// Settings database location.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Debounced autosave preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AutosaveConfig {
    /// Idle time after the last layout change before the layout is saved.
    #[serde(default = "default_autosave_delay_ms")]
    pub delay_ms: u64,
}

/// Grid geometry used for drop-target detection and re-flow.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_columns")]
    pub columns: u32,
    #[serde(default = "default_row_height_px")]
    pub row_height_px: u32,
    #[serde(default = "default_margin_px")]
    pub margin_px: u32,
    /// Initial container width until the UI reports the real one.
    #[serde(default = "default_container_width_px")]
    pub container_width_px: u32,
}

/// Settings storage location.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StorageConfig {
    /// Overrides the default `settings.db` location under the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_autosave_delay_ms(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: default_grid_columns(),
            row_height_px: default_row_height_px(),
            margin_px: default_margin_px(),
            container_width_px: default_container_width_px(),
        }
    }
}

impl EngineConfig {
    /// Creates a default config bound to a freshly generated account id.
    pub fn with_generated_account() -> Self {
        Self {
            account_id: uuid::Uuid::new_v4().to_string(),
            ..Self::default()
        }
    }

    pub fn autosave_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.autosave.delay_ms)
    }

    /// Resolves the settings database path, falling back to the user data directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.database_path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("settings.db")
    }
}

/// Directory name used under the platform config/data directories.
pub const APP_DIR_NAME: &str = "trade_journal";

/// Default location of `dashboard.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("dashboard.toml"))
}

/// Clamps loaded values into ranges the engine can work with.
pub fn sanitize_config(config: EngineConfig) -> EngineConfig {
    let account_id = config.account_id.trim().to_string();
    EngineConfig {
        account_id: if account_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            account_id
        },
        autosave: AutosaveConfig {
            delay_ms: config.autosave.delay_ms.clamp(100, 60_000),
        },
        grid: GridConfig {
            columns: config.grid.columns.clamp(1, 48),
            row_height_px: config.grid.row_height_px.max(1),
            margin_px: config.grid.margin_px,
            container_width_px: config.grid.container_width_px.max(1),
        },
        storage: config.storage,
    }
}

fn default_autosave_delay_ms() -> u64 {
    2_000
}

fn default_grid_columns() -> u32 {
    12
}

fn default_row_height_px() -> u32 {
    80
}

fn default_margin_px() -> u32 {
    16
}

fn default_container_width_px() -> u32 {
    1_200
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{sanitize_config, EngineConfig};

    #[test]
    fn test_default_config_has_expected_values() {
        let config = EngineConfig::default();
        assert_eq!(config.autosave.delay_ms, 2_000);
        assert_eq!(config.grid.columns, 12);
        assert_eq!(config.grid.row_height_px, 80);
        assert_eq!(config.grid.margin_px, 16);
        assert_eq!(config.grid.container_width_px, 1_200);
        assert_eq!(config.storage.database_path, None);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
account_id = "acct-1"

[grid]
columns = 24
"#,
        )
        .expect("config should parse");
        assert_eq!(config.account_id, "acct-1");
        assert_eq!(config.grid.columns, 24);
        assert_eq!(config.grid.row_height_px, 80);
        assert_eq!(config.autosave.delay_ms, 2_000);
    }

    #[test]
    fn test_sanitize_config_clamps_ranges_and_fills_account() {
        let mut config = EngineConfig::default();
        config.autosave.delay_ms = 0;
        config.grid.columns = 0;
        config.account_id = "   ".to_string();
        let sanitized = sanitize_config(config);
        assert_eq!(sanitized.autosave.delay_ms, 100);
        assert_eq!(sanitized.grid.columns, 1);
        assert!(!sanitized.account_id.is_empty());
    }

    #[test]
    fn test_database_path_prefers_explicit_storage_path() {
        let mut config = EngineConfig::default();
        config.storage.database_path = Some(PathBuf::from("/tmp/custom-settings.db"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/custom-settings.db")
        );
    }

    #[test]
    fn test_serialized_config_round_trips_through_toml() {
        let config = EngineConfig::with_generated_account();
        let text = toml::to_string(&config).expect("serialize");
        let parsed: EngineConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }
}
