use std::{fs, path::PathBuf};

use icy_covers::{CoverConfig, GridCoordinator};
use serde::{Deserialize, Serialize};

pub const API_KEY_VAR: &str = "DISCOGS_API_KEY";
pub const API_SECRET_VAR: &str = "DISCOGS_API_SECRET";

const OPTIONS_FILE: &str = "options.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Options {
    /// Start the refresh timer right after the first rebuild
    #[serde(default = "default_true")]
    pub auto_refresh: bool,

    #[serde(default)]
    pub covers: CoverConfig,
}

fn default_true() -> bool {
    true
}

impl Default for Options {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            covers: CoverConfig::default(),
        }
    }
}

impl Options {
    pub fn load_options() -> Self {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "GitHub", "icy_screensaver") {
            if !proj_dirs.config_dir().exists() && fs::create_dir_all(proj_dirs.config_dir()).is_err() {
                log::error!("Can't create configuration directory {:?}", proj_dirs.config_dir());
                return Self::default();
            }
            let options_file = proj_dirs.config_dir().join(OPTIONS_FILE);
            if options_file.exists() {
                match fs::read_to_string(options_file) {
                    Ok(txt) => match toml::from_str(&txt) {
                        Ok(result) => return result,
                        Err(err) => log::error!("Error parsing options file: {}", err),
                    },
                    Err(err) => log::error!("Error reading options file: {}", err),
                }
            }
        }
        Self::default()
    }

    pub fn store_options(&self) {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "GitHub", "icy_screensaver") {
            let file_name = proj_dirs.config_dir().join(OPTIONS_FILE);
            match toml::to_string(self) {
                Ok(text) => {
                    if let Err(err) = fs::write(file_name, text) {
                        log::error!("Error writing options file: {}", err);
                    }
                }
                Err(err) => log::error!("Error writing options file: {}", err),
            }
        }
    }

    pub fn get_log_dir() -> Option<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("com", "GitHub", "icy_screensaver")?;
        let dir = proj_dirs.config_dir().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).ok()?;
        }
        Some(dir)
    }

    /// Configuration to run with: stored options plus credentials from the environment (or `.env`).
    /// The credentials are not written back.
    pub fn runtime_config(&self) -> CoverConfig {
        let mut config = self.covers.clone();
        apply_credentials(&mut config, dotenvy::var(API_KEY_VAR).ok(), dotenvy::var(API_SECRET_VAR).ok());
        config
    }

    /// Take over what was changed at runtime so the next start picks up there.
    pub async fn update_from(&mut self, coordinator: &GridCoordinator) {
        let state = coordinator.snapshot();
        self.covers.grid.dimension = state.dimension;
        self.covers.grid.mode = state.mode;
        self.covers.grid.refresh_interval_secs = state.refresh_interval_secs;
        self.covers.grid.display_area = state.display_area;
        if let Some(query) = coordinator.search_query().await {
            self.covers.remote.search_query = query;
        }
    }
}

/// Non-blank values replace the configured credentials.
pub fn apply_credentials(config: &mut CoverConfig, key: Option<String>, secret: Option<String>) {
    if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
        config.remote.key = key.trim().to_string();
    }
    if let Some(secret) = secret.filter(|s| !s.trim().is_empty()) {
        config.remote.secret = secret.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icy_covers::SourceMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_gives_defaults() {
        let options: Options = toml::from_str("").unwrap();
        assert_eq!(options.covers, CoverConfig::default());
        assert!(options.auto_refresh);
    }

    #[test]
    fn test_partial_file() {
        let options: Options = toml::from_str(
            r#"
            auto_refresh = false
            [covers.grid]
            dimension = 5
            mode = "remote"
            [covers.remote]
            search_query = "Blue Note"
            "#,
        )
        .unwrap();
        assert!(!options.auto_refresh);
        assert_eq!(options.covers.grid.dimension, 5);
        assert_eq!(options.covers.grid.mode, SourceMode::Remote);
        assert_eq!(options.covers.grid.refresh_interval_secs, 2);
        assert_eq!(options.covers.remote.search_query, "Blue Note");
        assert_eq!(options.covers.remote.per_page(), 400);
    }

    #[test]
    fn test_store_round_trip_keeps_grid() {
        let mut options = Options::default();
        options.covers.grid.dimension = 4;
        let text = toml::to_string(&options).unwrap();
        let loaded: Options = toml::from_str(&text).unwrap();
        assert_eq!(loaded, options);
    }

    #[test]
    fn test_environment_credentials_override() {
        let mut config = CoverConfig::default();
        config.remote.key = "from-file".to_string();
        config.remote.secret = "file-secret".to_string();

        apply_credentials(&mut config, Some(" env-key ".to_string()), Some("  ".to_string()));

        assert_eq!(config.remote.key, "env-key");
        assert_eq!(config.remote.secret, "file-secret");
    }
}
