//! Reads the window list from a json file on every tick.
//!
//! Lets the tracker run against any browser (or a test fixture) that can
//! dump its windows in the same shape the chrome source prints.

use std::fs;
use std::path::{Path, PathBuf};

use super::{parse_windows, SourceError, TabSource, Window};

pub struct WindowsFileSource {
    path: PathBuf,
}

impl WindowsFileSource {
    pub fn new(path: PathBuf) -> Self {
        WindowsFileSource { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabSource for WindowsFileSource {
    fn name(&self) -> &'static str {
        "windows-file"
    }

    fn available(&self) -> bool {
        self.path.is_file()
    }

    fn windows(&mut self) -> Result<Vec<Window>, SourceError> {
        let json = fs::read_to_string(&self.path).map_err(|error| SourceError::Read {
            path: self.path.clone(),
            error,
        })?;
        parse_windows(&json)
    }
}
