use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

const QUALIFIER: &str = "app";
const ORGANIZATION: &str = "AutoPersianType";
const APPLICATION: &str = "autopersiantype";
const SETTINGS_FILE_NAME: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to write settings to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Editor preferences shared by the renderer and the host editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorSettings {
    pub font_family: String,
    pub font_size: u32,
    pub line_height: f64,
    pub word_wrap: bool,
    /// Annotate the preview with per-block direction and source lines
    pub auto_direction: bool,
    pub show_line_numbers: bool,
    pub show_minimap: bool,
    pub tab_size: u32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            font_family: "JetBrains Mono".to_string(),
            font_size: 16,
            line_height: 1.6,
            word_wrap: true,
            auto_direction: true,
            show_line_numbers: true,
            show_minimap: false,
            tab_size: 2,
        }
    }
}

impl EditorSettings {
    /// Clamp numeric values into the ranges the editor supports
    pub fn normalized(mut self) -> Self {
        self.font_size = self.font_size.clamp(10, 32);
        self.line_height = if self.line_height.is_finite() {
            self.line_height.clamp(1.0, 3.0)
        } else {
            EditorSettings::default().line_height
        };
        self.tab_size = self.tab_size.clamp(2, 8);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: Theme,
    pub settings: EditorSettings,
}

pub fn config_file_path() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
}

/// Parse a config file body. Invalid TOML yields `None`.
pub fn parse_config(contents: &str) -> Option<AppConfig> {
    toml::from_str::<AppConfig>(contents).ok().map(|mut config| {
        config.settings = config.settings.normalized();
        config
    })
}

/// Load the config at `path`, falling back to defaults when it is missing or broken
pub fn load_config(path: &Path) -> AppConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        debug!("No settings at {}, using defaults", path.display());
        return AppConfig::default();
    };

    match parse_config(&contents) {
        Some(config) => config,
        None => {
            warn!("Failed to parse settings file {}, using defaults", path.display());
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let toml = toml::to_string_pretty(config)?;
    fs::write(path, toml).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}
