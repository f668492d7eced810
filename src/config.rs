use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;
use crate::platform;
use crate::store::Target;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

const APP_NAME: &str = "tabtrail";
const DB_FILE: &str = "tabtrail.db";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid interval '{0}': must be a positive number of seconds")]
    InvalidInterval(String),

    #[error("invalid interval '{value}' in config file: {error}")]
    InvalidDuration {
        value: String,
        #[source]
        error: humantime::DurationError,
    },

    #[error("neither '{0}' nor '{1}' is an interval in seconds")]
    NoInterval(String, String),

    #[error("could not determine {0} directory")]
    NoProjectDir(&'static str),

    #[error("failed to create {}: {error}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to read {}: {error}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to parse {}: {error}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        error: toml::de::Error,
    },
}

/// Contents of `config.toml`. Every key is optional.
///
/// ```toml
/// interval = "30s"
/// database = "~/tabs.db"
/// windows_file = "/tmp/windows.json"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub interval: Option<String>,
    pub database: Option<PathBuf>,
    pub windows_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        toml::from_str(&text).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// The default config file is optional; a missing one means defaults.
    pub fn read_default() -> Result<Self, ConfigError> {
        let Some(dirs) = directories::ProjectDirs::from("", "", APP_NAME) else {
            return Ok(FileConfig::default());
        };
        let path = dirs.config_dir().join(CONFIG_FILE);
        if path.is_file() {
            FileConfig::read(&path)
        } else {
            Ok(FileConfig::default())
        }
    }
}

/// Interval and database path taken from the positional arguments.
#[derive(Debug, Default, PartialEq)]
pub struct Positional {
    pub interval: Option<Duration>,
    pub database: Option<PathBuf>,
}

/// Sort up to two positional arguments into interval and database path.
///
/// Whichever argument parses as a number is the interval. With two numbers
/// the first one wins and the second is taken as the path.
pub fn resolve_positional(first: Option<&str>, second: Option<&str>) -> Result<Positional, ConfigError> {
    match (first, second) {
        (None, None) => Ok(Positional::default()),
        (Some(only), None) | (None, Some(only)) => match parse_seconds(only) {
            Some(secs) => Ok(Positional {
                interval: Some(interval_from_secs(secs, only)?),
                database: None,
            }),
            None => Ok(Positional {
                interval: None,
                database: Some(PathBuf::from(only)),
            }),
        },
        (Some(first), Some(second)) => {
            let (raw, secs, path) = if let Some(secs) = parse_seconds(first) {
                (first, secs, second)
            } else if let Some(secs) = parse_seconds(second) {
                (second, secs, first)
            } else {
                return Err(ConfigError::NoInterval(first.to_string(), second.to_string()));
            };
            Ok(Positional {
                interval: Some(interval_from_secs(secs, raw)?),
                database: Some(PathBuf::from(path)),
            })
        }
    }
}

fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

fn interval_from_secs(secs: f64, raw: &str) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidInterval(raw.to_string()));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidInterval(raw.to_string()))
}

/// Get the database path (~/.local/share/tabtrail/tabtrail.db or platform equivalent)
pub fn default_db_path() -> Result<PathBuf, ConfigError> {
    let data_dir = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or(ConfigError::NoProjectDir("data"))?
        .data_dir()
        .to_path_buf();

    ensure_dir(&data_dir)?;
    Ok(data_dir.join(DB_FILE))
}

fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    fs::create_dir_all(dir).map_err(|error| ConfigError::CreateDir {
        path: dir.to_path_buf(),
        error,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub interval: Duration,
    pub target: Target,
    pub windows_file: Option<PathBuf>,
    pub run_once: bool,
    pub verbose: bool,
}

impl Config {
    /// Build the configuration. Positional arguments override flags, which
    /// override the config file, which overrides the defaults.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::read_default()?,
        };
        Config::resolve(cli, file)
    }

    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let positional = resolve_positional(cli.first.as_deref(), cli.second.as_deref())?;

        let interval = match (positional.interval, &file.interval) {
            (Some(interval), _) => interval,
            (None, Some(raw)) => parse_file_interval(raw)?,
            (None, None) => DEFAULT_INTERVAL,
        };

        let database = match positional.database.or(file.database) {
            Some(path) => platform::expand_home(path),
            None => default_db_path()?,
        };

        let windows_file = cli
            .windows_file
            .clone()
            .or(file.windows_file)
            .map(platform::expand_home);

        Ok(Config {
            interval,
            target: Target::from_path(database),
            windows_file,
            run_once: cli.once,
            verbose: cli.verbose,
        })
    }
}

fn parse_file_interval(raw: &str) -> Result<Duration, ConfigError> {
    let interval = humantime::parse_duration(raw).map_err(|error| ConfigError::InvalidDuration {
        value: raw.to_string(),
        error,
    })?;
    if interval.is_zero() {
        return Err(ConfigError::InvalidInterval(raw.to_string()));
    }
    Ok(interval)
}
