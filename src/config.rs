//! Optional config file loading. Search order: ./mangapdf.toml, then
//! $XDG_CONFIG_HOME/mangapdf/config.toml (or ~/.config/mangapdf/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// Root directory for per-title output folders. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Attempts per request, including the first (default 3).
    pub retry_count: Option<u32>,
    /// Fixed delay between attempts in milliseconds (default 2000).
    pub retry_delay_ms: Option<u64>,
    /// Pause after each chapter in milliseconds (default 2000).
    pub chapter_delay_ms: Option<u64>,
}

/// Search order: (1) ./mangapdf.toml, (2) $XDG_CONFIG_HOME/mangapdf/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("mangapdf.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("mangapdf").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}
