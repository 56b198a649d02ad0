//! Command-line interface for the Parkside engine.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use serde::Serialize;

mod error;
mod fs;
mod import;
mod nearest;
mod store;
mod update;

pub use error::{CliError, ErrorKind, ErrorPayload};

use import::{ImportArgs, run_import_with};
use nearest::{NearestArgs, run_nearest_with};
use update::{HttpFeedSourceBuilder, UpdateArgs, run_update_with};

pub(crate) const ARG_CSV: &str = "csv";
pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_AVAILABILITY_URL: &str = "availability-url";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ARG_EVERY: &str = "every";
pub(crate) const ARG_LATITUDE: &str = "latitude";
pub(crate) const ARG_LONGITUDE: &str = "longitude";
pub(crate) const ARG_PAGE: &str = "page";
pub(crate) const ARG_PER_PAGE: &str = "per-page";
pub(crate) const ENV_LATITUDE: &str = "PARKSIDE_CMDS_NEAREST_LATITUDE";
pub(crate) const ENV_LONGITUDE: &str = "PARKSIDE_CMDS_NEAREST_LONGITUDE";

/// Store opened when `--database` is not given.
pub(crate) const DEFAULT_DATABASE: &str = "parkside.db";

/// Run the Parkside CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Import(args) => run_import_with(args, writer),
        Command::UpdateAvailability(args) => {
            run_update_with(args, &HttpFeedSourceBuilder, writer, &mut |_| true)
        }
        Command::Nearest(args) => run_nearest_with(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "parkside",
    about = "Carpark import, availability ingestion and nearest-facility queries",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import facilities from the survey-grid CSV feed.
    Import(ImportArgs),
    /// Record the latest availability snapshot for known facilities.
    UpdateAvailability(UpdateArgs),
    /// Rank facilities with free lots by distance from a point.
    Nearest(NearestArgs),
}

/// Write `value` as pretty-printed JSON followed by a newline.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
