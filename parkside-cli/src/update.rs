//! `update-availability` command: ingest the availability feed once or on
//! a fixed interval.

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use parkside_core::SqliteParkingStore;
use parkside_data::availability::{
    DEFAULT_FEED_URL, DEFAULT_TIMEOUT_SECS, FeedSource, HttpFeedSource, HttpFeedSourceConfig,
};
use parkside_data::{AvailabilityUpdater, UpdateResult};
use serde::{Deserialize, Serialize};

use crate::store::open_store;
use crate::{
    ARG_AVAILABILITY_URL, ARG_DATABASE, ARG_EVERY, ARG_TIMEOUT_SECS, CliError, DEFAULT_DATABASE,
    write_json,
};

/// CLI arguments for the `update-availability` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch the carpark availability feed and record the latest \
                 free-lot count for every known facility. With --every the \
                 update repeats on a fixed interval until interrupted.",
    about = "Ingest the availability feed"
)]
#[ortho_config(prefix = "PARKSIDE")]
pub(crate) struct UpdateArgs {
    /// Availability feed endpoint.
    #[arg(long = ARG_AVAILABILITY_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) availability_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Repeat the update every N seconds.
    #[arg(long = ARG_EVERY, value_name = "secs")]
    #[serde(default)]
    pub(crate) every: Option<u64>,
    /// Path to the SQLite parking store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl UpdateArgs {
    pub(crate) fn into_config(self) -> Result<UpdateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        UpdateConfig::try_from(merged)
    }
}

/// Resolved `update-availability` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpdateConfig {
    pub(crate) availability_url: String,
    pub(crate) timeout: Duration,
    pub(crate) every: Option<Duration>,
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<UpdateArgs> for UpdateConfig {
    type Error = CliError;

    fn try_from(args: UpdateArgs) -> Result<Self, Self::Error> {
        let timeout_secs = args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(CliError::InvalidArgument {
                field: ARG_TIMEOUT_SECS,
                message: "must be at least 1 second".to_owned(),
            });
        }
        let every = match args.every {
            Some(0) => {
                return Err(CliError::InvalidArgument {
                    field: ARG_EVERY,
                    message: "interval must be at least 1 second".to_owned(),
                });
            }
            other => other.map(Duration::from_secs),
        };
        Ok(Self {
            availability_url: args
                .availability_url
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_owned()),
            timeout: Duration::from_secs(timeout_secs),
            every,
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
        })
    }
}

/// Builds the feed source for an update invocation.
pub(crate) trait FeedSourceBuilder {
    fn build(&self, config: &UpdateConfig) -> Result<Box<dyn FeedSource>, CliError>;
}

pub(crate) struct HttpFeedSourceBuilder;

impl FeedSourceBuilder for HttpFeedSourceBuilder {
    fn build(&self, config: &UpdateConfig) -> Result<Box<dyn FeedSource>, CliError> {
        let source_config =
            HttpFeedSourceConfig::new(config.availability_url.clone()).with_timeout(config.timeout);
        let source =
            HttpFeedSource::with_config(source_config).map_err(|source| CliError::BuildFeedSource {
                url: config.availability_url.clone(),
                source,
            })?;
        Ok(Box::new(source))
    }
}

/// Decides whether a recurring update performs another run.
pub(crate) type ContinuePolicy<'a> = &'a mut dyn FnMut(usize) -> bool;

pub(crate) fn run_update_with(
    args: UpdateArgs,
    builder: &dyn FeedSourceBuilder,
    writer: &mut dyn Write,
    keep_going: ContinuePolicy<'_>,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let mut store = open_store(&config.database)?;
    let source = builder.build(&config)?;
    let updater = AvailabilityUpdater::new(&*source);
    match config.every {
        None => {
            let result = updater.update_once(&mut store)?;
            write_json(writer, &result)
        }
        Some(interval) => run_recurring(&updater, &mut store, interval, writer, keep_going),
    }
}

/// Repeat the update every `interval`, reporting each run and carrying on
/// after failed ones, until `keep_going` answers `false`.
fn run_recurring<F: FeedSource>(
    updater: &AvailabilityUpdater<F>,
    store: &mut SqliteParkingStore,
    interval: Duration,
    writer: &mut dyn Write,
    keep_going: ContinuePolicy<'_>,
) -> Result<(), CliError> {
    log::info!("updating availability every {}s", interval.as_secs());
    let mut runs = 0;
    loop {
        runs += 1;
        match updater.update_once(store) {
            Ok(result) => {
                log_run(runs, &result);
                write_json(writer, &result)?;
            }
            Err(err) => log::error!("availability run {runs} failed: {err}"),
        }
        if !keep_going(runs) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

fn log_run(run: usize, result: &UpdateResult) {
    log::info!(
        "availability run {run}: {:?}, {} processed, {} unknown, {} errors",
        result.status,
        result.processed,
        result.skipped_unknown_facility,
        result.errors
    );
}
