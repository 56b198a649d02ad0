//! Store assembly shared by every subcommand.

use camino::Utf8Path;
use parkside_core::SqliteParkingStore;

use crate::{CliError, fs};

/// Open (creating when absent) the SQLite store at `path`.
pub(crate) fn open_store(path: &Utf8Path) -> Result<SqliteParkingStore, CliError> {
    fs::ensure_parent_dir(path).map_err(|source| CliError::CreateDatabaseDirectory {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("opening parking store at {path}");
    SqliteParkingStore::open(path.as_std_path()).map_err(|source| CliError::OpenStore {
        path: path.to_path_buf(),
        source,
    })
}

/// Fail unless `path` names an existing regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}
