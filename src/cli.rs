use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tabtrail")]
#[command(about = "Logs every newly opened browser tab to a SQLite database")]
#[command(version)]
pub struct Cli {
    /// Scan interval in seconds, or the database path
    #[arg(value_name = "INTERVAL|DATABASE")]
    pub first: Option<String>,

    /// Whichever of interval and database path was not given first
    #[arg(value_name = "DATABASE|INTERVAL")]
    pub second: Option<String>,

    /// Config file (defaults to the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Read windows from a json file instead of asking Chrome
    #[arg(long)]
    pub windows_file: Option<PathBuf>,

    /// Run a single scan and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Log debug output
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}
