//! INI configuration file.
//!
//! The file lives at `$XDG_CONFIG_HOME/mapmotion/config.ini` (or the
//! platform equivalent). Every key is optional; missing keys keep their
//! defaults.
//!
//! ```ini
//! [animation]
//! duration_ms = 2000
//! frame_interval_ms = 16
//! show_trailing_path = true
//! loop = false
//! auto_rotate = false
//!
//! [select]
//! multi = false
//!
//! [hover]
//! debounce_ms = 200
//! change_cursor = true
//!
//! [remote]
//! timeout_secs = 10
//! feature_count = 1
//! info_format = application/json
//!
//! [logging]
//! level = info
//! file = /var/log/mapmotion/mapmotion.log
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::animation::{TrackOptions, DEFAULT_DURATION_MS, DEFAULT_FRAME_INTERVAL};
use crate::interaction::{HoverOptions, SelectOptions, DEFAULT_HOVER_DEBOUNCE};
use crate::logging::LoggingConfig;
use crate::remote::{
    QueryError, ReqwestFeatureClient, DEFAULT_FEATURE_COUNT, DEFAULT_INFO_FORMAT,
    DEFAULT_TIMEOUT_SECS,
};

/// Directory name under the platform config directory.
const CONFIG_DIR_NAME: &str = "mapmotion";

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.ini";

// ==================== Section and key names ====================

const SECTION_ANIMATION: &str = "animation";
const SECTION_SELECT: &str = "select";
const SECTION_HOVER: &str = "hover";
const SECTION_REMOTE: &str = "remote";
const SECTION_LOGGING: &str = "logging";

/// Errors loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for [{section}] {key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("Could not determine the user config directory")]
    NoConfigDir,
}

/// `[animation]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSettings {
    pub duration_ms: u64,
    pub frame_interval_ms: u64,
    pub show_trailing_path: bool,
    pub looping: bool,
    pub auto_rotate: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL.as_millis() as u64,
            show_trailing_path: true,
            looping: false,
            auto_rotate: false,
        }
    }
}

/// `[select]` section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectSettings {
    pub multi: bool,
}

/// `[hover]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverSettings {
    pub debounce_ms: u64,
    pub change_cursor: bool,
}

impl Default for HoverSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_HOVER_DEBOUNCE.as_millis() as u64,
            change_cursor: true,
        }
    }
}

/// `[remote]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub timeout_secs: u64,
    pub feature_count: u32,
    pub info_format: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            feature_count: DEFAULT_FEATURE_COUNT,
            info_format: DEFAULT_INFO_FORMAT.to_string(),
        }
    }
}

/// The whole config file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub animation: AnimationSettings,
    pub select: SelectSettings,
    pub hover: HoverSettings,
    pub remote: RemoteSettings,
    pub logging: LoggingConfig,
}

/// Default config file location, if the platform has a config directory.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl ConfigFile {
    /// Loads the config from its default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path().ok_or(ConfigError::NoConfigDir)?;
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads the config from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_ini(&ini)?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Writes the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    /// Every setting as `(section, key, value)`, in file order.
    pub fn entries(&self) -> Vec<(String, String, String)> {
        let ini = self.to_ini();
        let mut entries = Vec::new();
        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };
            for (key, value) in properties.iter() {
                entries.push((section.to_string(), key.to_string(), value.to_string()));
            }
        }
        entries
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|props| props.get(key))
                .map(|v| v.trim().to_string())
        };

        let animation = AnimationSettings {
            duration_ms: parse_or(&get, SECTION_ANIMATION, "duration_ms", defaults.animation.duration_ms)?,
            frame_interval_ms: parse_or(
                &get,
                SECTION_ANIMATION,
                "frame_interval_ms",
                defaults.animation.frame_interval_ms,
            )?,
            show_trailing_path: bool_or(
                &get,
                SECTION_ANIMATION,
                "show_trailing_path",
                defaults.animation.show_trailing_path,
            )?,
            looping: bool_or(&get, SECTION_ANIMATION, "loop", defaults.animation.looping)?,
            auto_rotate: bool_or(&get, SECTION_ANIMATION, "auto_rotate", defaults.animation.auto_rotate)?,
        };

        let select = SelectSettings {
            multi: bool_or(&get, SECTION_SELECT, "multi", defaults.select.multi)?,
        };

        let hover = HoverSettings {
            debounce_ms: parse_or(&get, SECTION_HOVER, "debounce_ms", defaults.hover.debounce_ms)?,
            change_cursor: bool_or(&get, SECTION_HOVER, "change_cursor", defaults.hover.change_cursor)?,
        };

        let remote = RemoteSettings {
            timeout_secs: parse_or(&get, SECTION_REMOTE, "timeout_secs", defaults.remote.timeout_secs)?,
            feature_count: parse_or(&get, SECTION_REMOTE, "feature_count", defaults.remote.feature_count)?,
            info_format: get(SECTION_REMOTE, "info_format")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.remote.info_format),
        };

        let logging = LoggingConfig {
            level: get(SECTION_LOGGING, "level")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.logging.level),
            file: get(SECTION_LOGGING, "file")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        };

        if animation.duration_ms == 0 {
            return Err(invalid(SECTION_ANIMATION, "duration_ms", "0"));
        }
        if animation.frame_interval_ms == 0 {
            return Err(invalid(SECTION_ANIMATION, "frame_interval_ms", "0"));
        }

        Ok(Self {
            animation,
            select,
            hover,
            remote,
            logging,
        })
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(SECTION_ANIMATION))
            .set("duration_ms", self.animation.duration_ms.to_string())
            .set("frame_interval_ms", self.animation.frame_interval_ms.to_string())
            .set("show_trailing_path", self.animation.show_trailing_path.to_string())
            .set("loop", self.animation.looping.to_string())
            .set("auto_rotate", self.animation.auto_rotate.to_string());
        ini.with_section(Some(SECTION_SELECT))
            .set("multi", self.select.multi.to_string());
        ini.with_section(Some(SECTION_HOVER))
            .set("debounce_ms", self.hover.debounce_ms.to_string())
            .set("change_cursor", self.hover.change_cursor.to_string());
        ini.with_section(Some(SECTION_REMOTE))
            .set("timeout_secs", self.remote.timeout_secs.to_string())
            .set("feature_count", self.remote.feature_count.to_string())
            .set("info_format", self.remote.info_format.as_str());
        let file = self
            .logging
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        ini.with_section(Some(SECTION_LOGGING))
            .set("level", self.logging.level.as_str())
            .set("file", file);
        ini
    }

    /// Animation options with the configured flags and default styles.
    pub fn track_options(&self) -> TrackOptions {
        TrackOptions {
            duration_ms: self.animation.duration_ms,
            show_trailing_path: self.animation.show_trailing_path,
            looping: self.animation.looping,
            auto_rotate_marker: self.animation.auto_rotate,
            ..Default::default()
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.animation.frame_interval_ms)
    }

    pub fn select_options(&self) -> SelectOptions {
        SelectOptions {
            multi: self.select.multi,
            ..Default::default()
        }
    }

    pub fn hover_options(&self) -> HoverOptions {
        HoverOptions {
            debounce: Duration::from_millis(self.hover.debounce_ms),
            change_cursor: self.hover.change_cursor,
            ..Default::default()
        }
    }

    /// HTTP client with the configured timeout.
    pub fn http_client(&self) -> Result<ReqwestFeatureClient, QueryError> {
        ReqwestFeatureClient::with_timeout(Duration::from_secs(self.remote.timeout_secs))
    }
}

fn invalid(section: &str, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_or<T, G>(get: &G, section: &str, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str, &str) -> Option<String>,
{
    match get(section, key) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v.parse().map_err(|_| invalid(section, key, &v)),
    }
}

fn bool_or<G>(get: &G, section: &str, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str, &str) -> Option<String>,
{
    match get(section, key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(invalid(section, key, &v)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.ini");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[hover]\ndebounce_ms = 350\n");

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.hover.debounce_ms, 350);
        assert!(config.hover.change_cursor);
        assert_eq!(config.animation, AnimationSettings::default());
        assert_eq!(config.remote, RemoteSettings::default());
    }

    #[test]
    fn test_full_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "[animation]\nduration_ms = 5000\nloop = yes\nauto_rotate = on\nshow_trailing_path = false\n\
             [select]\nmulti = true\n\
             [remote]\ntimeout_secs = 3\nfeature_count = 5\ninfo_format = application/geo+json\n\
             [logging]\nlevel = mapmotion=debug\nfile = /tmp/mapmotion.log\n",
        );

        let config = ConfigFile::load_from(&path).unwrap();
        let track = config.track_options();
        assert_eq!(track.duration_ms, 5000);
        assert!(track.looping);
        assert!(track.auto_rotate_marker);
        assert!(!track.show_trailing_path);
        assert!(config.select_options().multi);
        assert_eq!(config.remote.feature_count, 5);
        assert_eq!(config.remote.info_format, "application/geo+json");
        assert_eq!(config.logging.level, "mapmotion=debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/mapmotion.log")));
        assert!(config.http_client().is_ok());
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let dir = TempDir::new().unwrap();

        let path = write(&dir, "[hover]\ndebounce_ms = soon\n");
        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "debounce_ms"));

        let path = write(&dir, "[select]\nmulti = maybe\n");
        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));

        let path = write(&dir, "[animation]\nduration_ms = 0\n");
        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.animation.looping = true;
        config.hover.debounce_ms = 120;
        config.logging.file = Some(PathBuf::from("/tmp/motion.log"));
        config.save_to(&path).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_entries_cover_every_section() {
        let entries = ConfigFile::default().entries();
        let sections: Vec<&str> = entries.iter().map(|(s, _, _)| s.as_str()).collect();
        for section in ["animation", "select", "hover", "remote", "logging"] {
            assert!(sections.contains(&section), "missing [{}]", section);
        }
        assert!(entries.contains(&("hover".to_string(), "debounce_ms".to_string(), "200".to_string())));
    }

    #[test]
    fn test_hover_options_conversion() {
        let config = ConfigFile {
            hover: HoverSettings {
                debounce_ms: 75,
                change_cursor: false,
            },
            ..Default::default()
        };
        let options = config.hover_options();
        assert_eq!(options.debounce, Duration::from_millis(75));
        assert!(!options.change_cursor);
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
    }
}
