use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tabtrail::cli::Cli;
use tabtrail::config::Config;
use tabtrail::scheduler::Scheduler;
use tabtrail::source;
use tabtrail::store::Store;

/// Bad arguments or config file.
const EXIT_CONFIG: u8 = 2;
/// The database could not be opened.
const EXIT_STORE_OPEN: u8 = 9;

fn setup_logging(verbose: bool) {
    let level = if verbose { "tabtrail=debug" } else { "tabtrail=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: failed to install logger: {e}");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn track(config: &Config) -> ExitCode {
    let store = match Store::open(&config.target) {
        Ok(store) => store,
        Err(e) => {
            error!(store = %config.target, code = e.code(), error = %e.message(), "could not open store");
            return ExitCode::from(EXIT_STORE_OPEN);
        }
    };

    let mut scheduler = Scheduler::new(&store, source::from_config(config), config.interval);
    if config.run_once {
        scheduler.tick();
    } else {
        scheduler.run(shutdown_signal()).await;
    }

    if let Err(e) = scheduler.finish() {
        warn!(code = e.code(), error = %e.message(), "could not finalize insert statement");
    }

    match store.close() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), error = %e.message(), "could not close store");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    track(&config).await
}
