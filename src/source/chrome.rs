//! Google Chrome tab source.
//!
//! Runs a JavaScript for Automation script through `osascript` that prints
//! every window's mode and tabs as json. Chrome is not launched if it is
//! not already running; that case reports no windows.
//!
//! Handles gracefully:
//! - osascript missing (not macOS)
//! - Chrome not running
//! - automation permission denied

use std::process::Command;

use tracing::debug;

use super::{parse_windows, SourceError, TabSource, Window};
use crate::platform;

const NAME: &str = "chrome";

pub const DEFAULT_APP: &str = "Google Chrome";

pub struct ChromeSource {
    app: String,
}

impl Default for ChromeSource {
    fn default() -> Self {
        ChromeSource::new(DEFAULT_APP)
    }
}

impl ChromeSource {
    /// `app` is the application name as scripting sees it, e.g. "Google
    /// Chrome" or "Chromium".
    pub fn new(app: impl Into<String>) -> Self {
        ChromeSource { app: app.into() }
    }

    fn script(&self) -> String {
        let app = serde_json::Value::String(self.app.clone());
        format!(
            "const app = Application({app});\n\
             if (!app.running()) {{ '[]' }} else {{\n\
               JSON.stringify(app.windows().map(w => ({{\n\
                 mode: w.mode(),\n\
                 tabs: w.tabs().map(t => ({{ title: t.title(), url: t.url() }}))\n\
               }})))\n\
             }}"
        )
    }
}

impl TabSource for ChromeSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn available(&self) -> bool {
        platform::detect() == platform::Platform::MacOS && platform::osascript_available()
    }

    fn windows(&mut self) -> Result<Vec<Window>, SourceError> {
        if !self.available() {
            return Err(SourceError::Unavailable { source_name: NAME });
        }

        let output = Command::new("osascript")
            .arg("-l")
            .arg("JavaScript")
            .arg("-e")
            .arg(self.script())
            .output()
            .map_err(|error| SourceError::Spawn {
                source_name: NAME,
                error,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::Failed {
                source_name: NAME,
                message: describe_failure(&stderr),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let windows = parse_windows(&stdout)?;
        debug!(source = NAME, windows = windows.len(), "enumerated windows");
        Ok(windows)
    }
}

/// Turn osascript's stderr into something a user can act on.
fn describe_failure(stderr: &str) -> String {
    // -1743 is errAEEventNotPermitted
    if stderr.contains("-1743") || stderr.contains("Not authorized") {
        return "automation not permitted (allow it under System Settings > Privacy & Security > Automation)"
            .to_string();
    }

    if stderr.contains("-2700") || stderr.contains("Can't get application") {
        return "application not found".to_string();
    }

    format!("osascript failed: {}", stderr.trim())
}
