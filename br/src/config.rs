//! blockrender configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What to do with the remaining templates after one fails to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Render every template and report all failures together
    #[default]
    Continue,
    /// Stop at the first failing template
    Abort,
}

/// Main blockrender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding block source files
    pub blocks_dir: PathBuf,

    /// Directory holding templates
    pub templates_dir: PathBuf,

    /// Directory rendered templates are written to
    pub rendered_dir: PathBuf,

    /// Template file extensions (without the dot)
    pub template_extensions: Vec<String>,

    /// Block source extensions parsed as `<!name>` tagged text
    pub tagged_extensions: Vec<String>,

    /// Block source extensions parsed as YAML mappings
    pub structured_extensions: Vec<String>,

    /// Handling of templates after a failed render
    pub batch_policy: BatchPolicy,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let base = PathBuf::from("prompts");
        Self {
            blocks_dir: base.join("blocks"),
            templates_dir: base.join("templates"),
            rendered_dir: base.join("rendered"),
            template_extensions: vec!["md".to_string()],
            tagged_extensions: vec!["md".to_string(), "txt".to_string()],
            structured_extensions: vec!["yaml".to_string(), "yml".to_string()],
            batch_policy: BatchPolicy::default(),
            log_level: None,
        }
    }
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if let Some(ext) = self
            .tagged_extensions
            .iter()
            .find(|e| self.structured_extensions.contains(e))
        {
            return Err(eyre!(
                "Extension '{}' is listed as both a tagged and a structured block source",
                ext
            ));
        }
        if self.template_extensions.is_empty() {
            return Err(eyre!("At least one template extension must be configured"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise `./.blockrender.yml` and then
    /// `~/.config/blockrender/blockrender.yml` are tried, falling back to
    /// defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_locations() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        debug!("Config::load: no config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::default_locations(),
        };
        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(".blockrender.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            locations.push(config_dir.join("blockrender").join("blockrender.yml"));
        }
        locations
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        debug!(?path, "Config::load_from_file: loaded");
        Ok(config)
    }

    /// Every extension that marks a block source file
    pub fn block_extensions(&self) -> impl Iterator<Item = &str> {
        self.tagged_extensions
            .iter()
            .chain(&self.structured_extensions)
            .map(String::as_str)
    }
}
