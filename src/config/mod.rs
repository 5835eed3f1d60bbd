//! Host configuration (hook_config.json).

pub mod paths;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mouse_hook::bridge::DEFAULT_CAPACITY;
use mouse_hook::HookOptions;

use paths::get_config_dir;

/// hook_config.json shape. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookConfig {
    /// Forward mousemove events from startup.
    pub capture_move: bool,
    /// Start with the hook uninstalled until a `resume` command.
    pub start_paused: bool,
    /// Bridge queue capacity.
    pub queue_capacity: usize,
    /// Also write logs to a daily rolling file.
    pub log_to_file: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            capture_move: false,
            start_paused: false,
            queue_capacity: DEFAULT_CAPACITY,
            log_to_file: false,
        }
    }
}

impl HookConfig {
    pub fn hook_options(&self) -> HookOptions {
        HookOptions {
            queue_capacity: self.queue_capacity,
            capture_move: self.capture_move,
            start_running: !self.start_paused,
        }
    }
}

/// Path to hook_config.json.
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("hook_config.json")
}

/// Read hook_config.json. A missing file yields the defaults.
pub fn read_hook_config() -> Result<HookConfig> {
    Ok(read_json_file(&get_config_path())?.unwrap_or_default())
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let value = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mouse-hook-{}-{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: HookConfig = serde_json::from_str(r#"{"captureMove": true}"#).unwrap();
        assert!(config.capture_move);
        assert!(!config.start_paused);
        assert_eq!(config.queue_capacity, 512);
        assert!(!config.log_to_file);
    }

    #[test]
    fn options_follow_config() {
        let config = HookConfig {
            start_paused: true,
            queue_capacity: 64,
            ..HookConfig::default()
        };
        let options = config.hook_options();
        assert!(!options.start_running);
        assert_eq!(options.queue_capacity, 64);
        assert!(!options.capture_move);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("mouse-hook-does-not-exist.json");
        let read: Option<HookConfig> = read_json_file(&path).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_file("bad.json", "{ not json");
        let read: Result<Option<HookConfig>> = read_json_file(&path);
        assert!(read.is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn reads_camel_case_file() {
        let path = temp_file("good.json", r#"{"startPaused": true, "logToFile": true}"#);
        let config: HookConfig = read_json_file(&path).unwrap().unwrap();
        assert!(config.start_paused);
        assert!(config.log_to_file);
        let _ = std::fs::remove_file(path);
    }
}
