//! Optional config file loading. Search order: ./storyscrape.toml, then
//! $XDG_CONFIG_HOME/storyscrape/config.toml (or ~/.config/storyscrape/config.toml).

use crate::document::HtmlAttributeOverride;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Default output directory when -o is not set. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Retries after the first attempt for transient failures (default 3).
    pub retry_count: Option<u32>,
    /// Delay in seconds before each retry (e.g. [1, 2, 4]); the last entry repeats.
    pub retry_backoff_secs: Option<Vec<u64>>,
    /// Converter to run after harvesting: "ebook-convert" or "epub".
    pub converter: Option<String>,
    /// Program used by the ebook-convert converter.
    pub convert_program: Option<String>,
    /// Command that receives `<title> <artifact> [credentials]` after conversion.
    pub deliver_command: Option<String>,
    pub credentials_file: Option<PathBuf>,
    /// Named per-site presets, selected with --template.
    pub templates: BTreeMap<String, Template>,
}

/// Selectors and document decorations for one source site.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Template {
    pub container: Option<String>,
    pub next: Option<String>,
    pub title_selector: Option<String>,
    pub title: Option<String>,
    pub chapters: Option<u32>,
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
    pub overrides: Vec<HtmlAttributeOverride>,
}

impl Config {
    /// Look up a template by name. A missing name is an error, not a silent fallback.
    pub fn template(&self, name: &str) -> Result<&Template, String> {
        self.templates.get(name).ok_or_else(|| {
            let known = self.templates.keys().cloned().collect::<Vec<_>>();
            if known.is_empty() {
                format!("Unknown template '{}': no templates are configured.", name)
            } else {
                format!(
                    "Unknown template '{}'. Available: {}.",
                    name,
                    known.join(", ")
                )
            }
        })
    }
}

/// Search order: (1) ./storyscrape.toml, (2) $XDG_CONFIG_HOME/storyscrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("storyscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("storyscrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            return load_config_from(path).map(Some);
        }
    }
    Ok(None)
}

/// Load one config file.
pub fn load_config_from(path: &std::path::Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}
