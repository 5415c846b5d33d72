use log::LevelFilter;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub log_file: String,
    pub log_level: String,
    /// Switch to the temporary workspace after parking a fullscreen window.
    pub activate_temporary: bool,
    /// Switch back to the origin workspace after restoring a window.
    pub activate_on_restore: bool,
}

/// What happened while loading. Loading runs before the logger exists, so
/// the outcome is carried back for `main` to log once logging is up.
#[derive(Debug)]
pub enum LoadOutcome {
    FromFile(PathBuf),
    Missing(PathBuf),
    ParseError(PathBuf, String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: "/tmp/focusmode.log".to_string(),
            log_level: "info".to_string(),
            activate_temporary: true,
            activate_on_restore: true,
        }
    }
}

impl Config {
    pub fn load() -> (Self, LoadOutcome) {
        let config_path = dirs::config_dir()
            .map(|p| p.join("focusmode").join("focusmode.toml"))
            .unwrap_or_else(|| PathBuf::from("focusmode.toml"));
        Self::load_path(config_path)
    }

    fn load_path(path: PathBuf) -> (Self, LoadOutcome) {
        if !path.exists() {
            return (Self::default(), LoadOutcome::Missing(path));
        }
        let content = fs::read_to_string(&path).unwrap_or_default();
        match toml::from_str::<Config>(&content) {
            Ok(cfg) => (cfg, LoadOutcome::FromFile(path)),
            Err(e) => (Self::default(), LoadOutcome::ParseError(path, e.to_string())),
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn file_values_override_defaults() {
        let path = temp_file(
            "focusmode-config-valid.toml",
            "log_level = \"debug\"\nactivate_temporary = false\n",
        );
        let (config, outcome) = Config::load_path(path.clone());

        assert!(matches!(outcome, LoadOutcome::FromFile(p) if p == path));
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        assert!(!config.activate_temporary);
        assert!(config.activate_on_restore);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn parse_error_falls_back_to_defaults_and_is_reported() {
        let path = temp_file("focusmode-config-broken.toml", "log_level = [nope");
        let (config, outcome) = Config::load_path(path.clone());

        assert!(matches!(outcome, LoadOutcome::ParseError(p, _) if p == path));
        assert_eq!(config.level_filter(), LevelFilter::Info);
        assert!(config.activate_temporary);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("focusmode-config-nonexistent.toml");
        let (config, outcome) = Config::load_path(path.clone());

        assert!(matches!(outcome, LoadOutcome::Missing(p) if p == path));
        assert_eq!(config.log_file, "/tmp/focusmode.log");
    }
}
