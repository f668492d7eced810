//! Where the open tabs come from.
//!
//! The tracker only needs a list of windows, each with a mode and its tabs.
//! How that list is produced is up to the `TabSource`:
//! - `chrome`: asks Google Chrome through `osascript` (macOS only)
//! - `file`: reads the same json from a file on every tick

pub mod chrome;
pub mod file;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// "normal" or "incognito", compared case-insensitively.
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name}: not available on this platform")]
    Unavailable { source_name: &'static str },

    #[error("{source_name}: failed to run command: {error}")]
    Spawn {
        source_name: &'static str,
        #[source]
        error: std::io::Error,
    },

    #[error("{source_name}: {message}")]
    Failed {
        source_name: &'static str,
        message: String,
    },

    #[error("failed to read {}: {error}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to parse window list: {0}")]
    Parse(#[from] serde_json::Error),
}

pub trait TabSource {
    fn name(&self) -> &'static str;
    fn available(&self) -> bool;
    fn windows(&mut self) -> Result<Vec<Window>, SourceError>;
}

/// Parse a json array of windows.
pub fn parse_windows(json: &str) -> Result<Vec<Window>, SourceError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Pick the source the configuration asks for.
pub fn from_config(config: &Config) -> Box<dyn TabSource> {
    match &config.windows_file {
        Some(path) => Box::new(file::WindowsFileSource::new(path.clone())),
        None => Box::new(chrome::ChromeSource::default()),
    }
}
