//! `nearest` command: rank open facilities around a point.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use parkside_core::{DEFAULT_PAGE, DEFAULT_PER_PAGE, NearestQuery, RankedResult, find_nearest};
use serde::{Deserialize, Serialize};

use crate::store::{open_store, require_existing};
use crate::{
    ARG_DATABASE, ARG_LATITUDE, ARG_LONGITUDE, ARG_PAGE, ARG_PER_PAGE, CliError,
    DEFAULT_DATABASE, ENV_LATITUDE, ENV_LONGITUDE, write_json,
};

/// CLI arguments for the `nearest` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "List facilities with free lots, nearest first, as a JSON \
                 array. Distances are great-circle kilometres from the \
                 query point.",
    about = "Find the nearest facilities with free lots"
)]
#[ortho_config(prefix = "PARKSIDE")]
pub(crate) struct NearestArgs {
    /// Query latitude in degrees.
    #[arg(long = ARG_LATITUDE, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) latitude: Option<f64>,
    /// Query longitude in degrees.
    #[arg(long = ARG_LONGITUDE, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) longitude: Option<f64>,
    /// 1-based result page.
    #[arg(long = ARG_PAGE, value_name = "n")]
    #[serde(default)]
    pub(crate) page: Option<usize>,
    /// Results per page (at most 100).
    #[arg(long = ARG_PER_PAGE, value_name = "n")]
    #[serde(default)]
    pub(crate) per_page: Option<usize>,
    /// Path to the SQLite parking store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl NearestArgs {
    pub(crate) fn into_config(self) -> Result<NearestConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        NearestConfig::try_from(merged)
    }
}

/// Resolved `nearest` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NearestConfig {
    pub(crate) query: NearestQuery,
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<NearestArgs> for NearestConfig {
    type Error = CliError;

    fn try_from(args: NearestArgs) -> Result<Self, Self::Error> {
        let latitude = args.latitude.ok_or(CliError::MissingArgument {
            field: ARG_LATITUDE,
            env: ENV_LATITUDE,
        })?;
        let longitude = args.longitude.ok_or(CliError::MissingArgument {
            field: ARG_LONGITUDE,
            env: ENV_LONGITUDE,
        })?;
        let query = NearestQuery::new(
            latitude,
            longitude,
            args.page.unwrap_or(DEFAULT_PAGE),
            args.per_page.unwrap_or(DEFAULT_PER_PAGE),
        )?;
        Ok(Self {
            query,
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
        })
    }
}

pub(crate) fn run_nearest_with(args: NearestArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let results = execute_nearest(&config)?;
    write_json(writer, &results)
}

pub(crate) fn execute_nearest(config: &NearestConfig) -> Result<Vec<RankedResult>, CliError> {
    require_existing(&config.database, ARG_DATABASE)?;
    let store = open_store(&config.database)?;
    find_nearest(&store, &config.query).map_err(CliError::Query)
}
