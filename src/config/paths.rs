//! Configuration and log directory paths.
//!
//!   Windows: %APPDATA%/mouse-hook
//!   macOS:   ~/Library/Application Support/mouse-hook
//!   Linux:   $XDG_CONFIG_HOME/mouse-hook (default ~/.config)
//!
//! `MOUSE_HOOK_CONFIG_DIR` overrides all of the above.

use std::path::PathBuf;

const APP_DIR: &str = "mouse-hook";

/// Directory holding hook_config.json.
pub fn get_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("MOUSE_HOOK_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    get_config_base().join(APP_DIR)
}

/// Directory for rolling log files.
pub fn get_log_dir() -> PathBuf {
    get_config_dir().join("logs")
}

fn get_config_base() -> PathBuf {
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg);
        }
    }

    dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    })
}
