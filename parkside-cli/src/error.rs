//! Error types emitted by the Parkside CLI and their JSON rendering.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use chrono::{SecondsFormat, Utc};
use parkside_core::{NearestQueryError, SqliteStoreError, StoreError};
use parkside_data::availability::SourceBuildError;
use parkside_data::{ImportError, UpdateError};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors emitted by the Parkside CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// An option was supplied with an unusable value.
    #[error("invalid {field}: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The database directory could not be created.
    #[error("failed to create directory for database {path:?}: {source}")]
    CreateDatabaseDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite store failed.
    #[error("failed to open parking store at {path:?}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: SqliteStoreError,
    },
    /// The nearest-facility query parameters were rejected.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] NearestQueryError),
    /// Reading candidates for a query failed.
    #[error("failed to query facilities: {0}")]
    Query(#[source] StoreError),
    /// The facility import failed.
    #[error("facility import failed: {0}")]
    Import(#[from] ImportError),
    /// Constructing the availability feed client failed.
    #[error("failed to build availability source for {url:?}: {source}")]
    BuildFeedSource {
        url: String,
        #[source]
        source: SourceBuildError,
    },
    /// An availability run failed and was rolled back.
    #[error("availability update failed: {0}")]
    Update(#[from] UpdateError),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

/// Category reported in the `error` field of an [`ErrorPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The request itself was malformed.
    BadRequest,
    /// The CSV header row lacked required columns.
    CsvValidation,
    /// A path, option or environment setting was missing or unusable.
    Configuration,
    /// Anything else.
    InternalServerError,
}

/// Machine-readable rendering of a [`CliError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// Error category.
    pub error: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// RFC 3339 time the error was reported.
    pub timestamp: String,
    /// Extra fields specific to the category.
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl CliError {
    /// Category used when rendering this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ArgumentParsing(_) | Self::InvalidArgument { .. } | Self::InvalidQuery(_) => {
                ErrorKind::BadRequest
            }
            Self::Import(ImportError::MissingHeaders { .. }) => ErrorKind::CsvValidation,
            Self::Configuration(_)
            | Self::MissingArgument { .. }
            | Self::MissingSourceFile { .. }
            | Self::SourcePathNotFile { .. }
            | Self::InspectSourcePath { .. }
            | Self::CreateDatabaseDirectory { .. }
            | Self::OpenStore { .. }
            | Self::BuildFeedSource { .. }
            | Self::Import(ImportError::SourceNotFound { .. } | ImportError::SourceNotFile { .. }) => {
                ErrorKind::Configuration
            }
            _ => ErrorKind::InternalServerError,
        }
    }

    /// Render this error as a JSON payload stamped with the current time.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        let mut context = Map::new();
        match self {
            Self::Import(ImportError::MissingHeaders { missing, received }) => {
                context.insert("missing_headers".to_owned(), string_array(missing));
                context.insert("received_headers".to_owned(), string_array(received));
            }
            Self::MissingArgument { field, env } => {
                context.insert("field".to_owned(), Value::from(*field));
                context.insert("env".to_owned(), Value::from(*env));
            }
            Self::InvalidArgument { field, .. }
            | Self::MissingSourceFile { field, .. }
            | Self::SourcePathNotFile { field, .. }
            | Self::InspectSourcePath { field, .. } => {
                context.insert("field".to_owned(), Value::from(*field));
            }
            _ => {}
        }
        ErrorPayload {
            error: self.kind(),
            message: self.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            context,
        }
    }
}

fn string_array(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}
