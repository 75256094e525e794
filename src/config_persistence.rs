use std::path::Path;

use log::{info, warn};

use crate::config::{sanitize_config, EngineConfig};

pub fn persist_config_file(config: &EngineConfig, path: &Path) {
    let config_text = match toml::to_string(config) {
        Ok(text) => text,
        Err(err) => {
            log::error!("Failed to serialize config for {}: {}", path.display(), err);
            return;
        }
    };

    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            log::error!(
                "Failed to create config directory {}: {}",
                parent.display(),
                err
            );
            return;
        }
    }

    if let Err(err) = std::fs::write(path, config_text) {
        log::error!("Failed to persist config to {}: {}", path.display(), err);
    }
}

pub fn load_config_file(path: &Path) -> EngineConfig {
    let config_content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                "Failed to read config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            return sanitize_config(EngineConfig::default());
        }
    };

    match toml::from_str::<EngineConfig>(&config_content) {
        Ok(config) => sanitize_config(config),
        Err(err) => {
            warn!(
                "Failed to parse config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            sanitize_config(EngineConfig::default())
        }
    }
}

/// Loads the config, writing a default one first when the file is missing.
///
/// A config loaded without an account id is written back so the generated id
/// stays stable across runs.
pub fn load_or_create_config_file(path: &Path) -> EngineConfig {
    if !path.exists() {
        let default_config = EngineConfig::with_generated_account();
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        persist_config_file(&default_config, path);
        return default_config;
    }

    let had_account = std::fs::read_to_string(path)
        .ok()
        .and_then(|text| toml::from_str::<EngineConfig>(&text).ok())
        .is_some_and(|config| !config.account_id.trim().is_empty());
    let config = load_config_file(path);
    if !had_account {
        persist_config_file(&config, path);
    }
    config
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{load_config_file, load_or_create_config_file, persist_config_file};
    use crate::config::EngineConfig;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("dashboard_layout_{}_{}", name, uuid::Uuid::new_v4()))
            .join("dashboard.toml")
    }

    #[test]
    fn test_missing_file_is_created_with_stable_account() {
        let path = scratch_path("create");
        let created = load_or_create_config_file(&path);
        assert!(path.exists());
        assert!(!created.account_id.is_empty());

        let reloaded = load_or_create_config_file(&path);
        assert_eq!(reloaded.account_id, created.account_id);
        let _ = std::fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn test_unparseable_file_falls_back_to_defaults() {
        let path = scratch_path("garbage");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "grid = [not toml").expect("write");
        let config = load_config_file(&path);
        assert_eq!(config.grid, EngineConfig::default().grid);
        let _ = std::fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn test_persisted_values_are_read_back() {
        let path = scratch_path("persist");
        let mut config = EngineConfig::with_generated_account();
        config.autosave.delay_ms = 750;
        persist_config_file(&config, &path);
        assert_eq!(load_config_file(&path), config);
        let _ = std::fs::remove_dir_all(path.parent().expect("parent"));
    }
}
