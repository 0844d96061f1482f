use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{parse_delimiter, AggregatorConfig};
use crate::error::AggError;

const PROJECT_FILE_NAME: &str = ".chunkaggrc";

/// Settings read from a `.chunkaggrc` / `config.ini` file.
///
/// Every field is optional; unset fields leave the built-in default alone.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub chunk_size: Option<usize>,
    pub threads: Option<usize>,
    pub top: Option<usize>,
    pub group_by: Option<String>,
    pub delimiter: Option<u8>,
    pub pending_chunks: Option<usize>,
    pub timeout: Option<Duration>,
}

impl ConfigFile {
    /// Find project-level .chunkaggrc by walking up from the current directory
    pub fn find_project_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_config_from(&current)
    }

    /// Find project-level .chunkaggrc by walking up from `start`
    pub fn find_project_config_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(PROJECT_FILE_NAME))
            .find(|path| path.is_file())
    }

    /// User config file locations in order of preference
    pub fn get_user_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("chunkagg").join("config.ini"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(PROJECT_FILE_NAME));
        }
        paths
    }

    /// Load configuration with precedence: project > user > defaults
    pub fn load() -> Result<Self, AggError> {
        let mut config = Self::default();

        // Only the first existing user file is read
        if let Some(path) = Self::get_user_config_paths()
            .into_iter()
            .find(|p| p.is_file())
        {
            config = Self::merge_configs(config, Self::load_from_path(&path)?);
        }

        if let Some(path) = Self::find_project_config() {
            config = Self::merge_configs(config, Self::load_from_path(&path)?);
        }

        Ok(config)
    }

    /// Load an explicit file instead of searching, if one is given
    pub fn load_with_custom_path(custom_path: Option<&Path>) -> Result<Self, AggError> {
        match custom_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, AggError> {
        let origin = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| AggError::io(origin.clone(), e))?;
        debug!(path = %origin, "loaded config file");
        Self::parse_ini_content(&content, &origin)
    }

    /// Parse `key = value` lines. `;` and `#` start comments; section headers
    /// are accepted but only root-level keys are read.
    fn parse_ini_content(content: &str, origin: &str) -> Result<Self, AggError> {
        let mut config = Self::default();
        let mut in_root = true;

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                in_root = false;
                debug!(path = origin, section = &line[1..line.len() - 1], "ignoring section");
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(AggError::config(format!(
                    "{}:{}: expected 'key = value', found '{}'",
                    origin,
                    index + 1,
                    line
                )));
            };
            if !in_root {
                continue;
            }

            config
                .set(key.trim(), value.trim())
                .map_err(|message| {
                    AggError::config(format!("{}:{}: {}", origin, index + 1, message))
                })?;
        }

        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "chunk_size" => self.chunk_size = Some(parse_count(key, value)?),
            "threads" => self.threads = Some(parse_count(key, value)?),
            "top" => self.top = Some(parse_count(key, value)?),
            "pending_chunks" => self.pending_chunks = Some(parse_count(key, value)?),
            "group_by" => {
                if value.is_empty() {
                    return Err("group_by must not be empty".to_string());
                }
                self.group_by = Some(value.to_string());
            }
            "delimiter" => {
                self.delimiter = Some(parse_delimiter(value).map_err(|e| e.to_string())?);
            }
            "timeout" => {
                let timeout = humantime::parse_duration(value)
                    .map_err(|e| format!("invalid timeout '{}': {}", value, e))?;
                self.timeout = Some(timeout);
            }
            unknown => warn!(key = unknown, "ignoring unknown config key"),
        }
        Ok(())
    }

    /// Merge two configurations, with the second taking precedence
    fn merge_configs(base: Self, overlay: Self) -> Self {
        Self {
            chunk_size: overlay.chunk_size.or(base.chunk_size),
            threads: overlay.threads.or(base.threads),
            top: overlay.top.or(base.top),
            group_by: overlay.group_by.or(base.group_by),
            delimiter: overlay.delimiter.or(base.delimiter),
            pending_chunks: overlay.pending_chunks.or(base.pending_chunks),
            timeout: overlay.timeout.or(base.timeout),
        }
    }

    /// Write the file's settings into `config`. Command-line values are applied afterwards.
    pub fn apply_to(&self, config: &mut AggregatorConfig) {
        if let Some(chunk_size) = self.chunk_size {
            config.performance.chunk_size = chunk_size;
        }
        if let Some(threads) = self.threads {
            config.performance.pool_size = Some(threads);
        }
        if let Some(pending) = self.pending_chunks {
            config.performance.pending_chunks = pending;
        }
        if let Some(timeout) = self.timeout {
            config.performance.deadline = Some(timeout);
        }
        if let Some(top) = self.top {
            config.ranking.top_n = top;
        }
        if let Some(group_by) = &self.group_by {
            config.ranking.group_by = group_by.clone();
        }
        if let Some(delimiter) = self.delimiter {
            config.input.delimiter = delimiter;
        }
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("{} must be a non-negative integer, got '{}'", key, value))
}
