use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
    Unknown,
}

pub fn detect() -> Platform {
    match std::env::consts::OS {
        "macos" => Platform::MacOS,
        "linux" => Platform::Linux,
        "windows" => Platform::Windows,
        _ => Platform::Unknown,
    }
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Expand a leading `~/` to the home directory. Other paths are returned
/// unchanged.
pub fn expand_home(path: PathBuf) -> PathBuf {
    let rest = match path.strip_prefix("~") {
        Ok(rest) => rest.to_path_buf(),
        Err(_) => return path,
    };
    match home_dir() {
        Some(home) => home.join(rest),
        None => path,
    }
}

/// Returns true when `osascript` runs a no-op script successfully.
pub fn osascript_available() -> bool {
    Command::new("osascript")
        .arg("-e")
        .arg("return")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
