//! CLI entry: argument parsing and driver setup.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use dci_core::exec::SystemRunner;
use dci_core::flags::FlagState;
use dci_core::interrupt;
use dci_core::logging::{self, LoggingConfig};
use dci_core::matrix::{DEFAULT_NIGHTLY, Driver, DriverConfig};
use dci_core::status::StatusLine;

#[derive(Debug, Parser)]
#[command(name = "dci", version)]
#[command(about = "Check, test and document a crate across toolchains, targets and features")]
struct Cli {
    /// Manifest of the crate under test
    #[arg(long, value_name = "PATH", default_value = "Cargo.toml")]
    manifest_path: PathBuf,

    /// Cargo executable
    #[arg(long, env = "CARGO", default_value = "cargo")]
    cargo: String,

    /// Feature enabled for the second configuration
    /// (default: package.metadata.dci.feature, then "tokio")
    #[arg(long, value_name = "NAME")]
    feature: Option<String>,

    /// Bleeding-edge toolchain to test when rustup is available
    #[arg(long, value_name = "TOOLCHAIN", default_value = DEFAULT_NIGHTLY)]
    nightly: String,

    /// Stream cargo output instead of showing it only on failure
    #[arg(long)]
    no_capture: bool,

    /// Write diagnostic logs to this file (filter with DCI_LOG)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl From<Cli> for DriverConfig {
    fn from(cli: Cli) -> Self {
        DriverConfig {
            manifest_path: cli.manifest_path,
            cargo: cli.cargo,
            feature: cli.feature,
            nightly: cli.nightly,
            capture: !cli.no_capture,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = parse_args();
    // Read before anything else so later compositions always start from the
    // caller's own flags.
    let flags = FlagState::capture();

    let _log_guard = logging::init(&LoggingConfig {
        log_file: cli.log_file.clone(),
    })?;
    interrupt::init().context("install Ctrl+C handler")?;

    let config = DriverConfig::from(cli);
    tracing::debug!(?config, "driver configuration");

    let mut driver = Driver::new(config, SystemRunner, flags);
    driver.run(&mut StatusLine::stderr())?;
    Ok(())
}

/// Usage errors exit with 1; exit code 2 is reserved for interrupts.
fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            process::exit(1);
        }
        Err(err) => err.exit(),
    }
}
