//! Optional config file loading. Search order: ./notescrape.toml, then
//! $XDG_CONFIG_HOME/notescrape/config.toml (or ~/.config/notescrape/config.toml).

use serde::Deserialize;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Replaces the built-in fingerprint pool. An empty list is ignored.
    pub user_agents: Option<Vec<String>>,
    /// Accept-Language header sent with every request.
    pub accept_language: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Pause before a retry, in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Primary fetch attempts.
    pub attempts: Option<u32>,
    pub max_redirects: Option<usize>,
    /// Site root for the secondary endpoint and image referer.
    pub site_root: Option<String>,
    /// Output format: text or json.
    pub format: Option<String>,
}

/// Search order: (1) ./notescrape.toml, (2) $XDG_CONFIG_HOME/notescrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("notescrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("notescrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded config");
            return Ok(Some(config));
        }
    }
    Ok(None)
}
