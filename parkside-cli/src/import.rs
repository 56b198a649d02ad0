//! `import` command: load the facility CSV into the parking store.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use parkside_data::{FacilityImporter, ImportError, ImportResult};
use serde::{Deserialize, Serialize};

use crate::store::{open_store, require_existing};
use crate::{ARG_CSV, ARG_DATABASE, CliError, DEFAULT_DATABASE, write_json};

/// CSV read when `--csv` is not given.
pub(crate) const DEFAULT_CSV: &str = "data/carparks.csv";

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Import parking facilities from the survey-grid CSV feed. \
                 Coordinates are projected to WGS84 and capacities are \
                 estimated from deck counts or facility type. Paths can come \
                 from CLI flags, configuration files, or environment \
                 variables.",
    about = "Import facilities from a CSV file"
)]
#[ortho_config(prefix = "PARKSIDE")]
pub(crate) struct ImportArgs {
    /// Path to the facility CSV file.
    #[arg(long = ARG_CSV, value_name = "path")]
    #[serde(default)]
    pub(crate) csv: Option<Utf8PathBuf>,
    /// Path to the SQLite parking store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl ImportArgs {
    pub(crate) fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) csv: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            csv: args.csv.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CSV)),
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
        })
    }
}

pub(crate) fn run_import_with(args: ImportArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let result = execute_import(&config)?;
    write_json(writer, &result)
}

pub(crate) fn execute_import(config: &ImportConfig) -> Result<ImportResult, CliError> {
    require_existing(&config.csv, ARG_CSV)?;
    let mut store = open_store(&config.database)?;
    FacilityImporter::default()
        .import_from_file(&mut store, &config.csv)
        .map_err(|err| match err {
            ImportError::SourceNotFound { path } => CliError::MissingSourceFile {
                field: ARG_CSV,
                path,
            },
            ImportError::SourceNotFile { path } => CliError::SourcePathNotFile {
                field: ARG_CSV,
                path,
            },
            other => CliError::Import(other),
        })
}
