// Error types for the conversion pipeline. Every fatal condition the
// operator can hit has its own variant so messages stay actionable.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    // Preconditions, checked before any file is touched.
    #[error("recover dir must be empty: {} (run recovery or clear it first)", .0.display())]
    BackupNotEmpty(PathBuf),

    #[error("backup path exists but is not a directory: {}", .0.display())]
    BackupNotDir(PathBuf),

    #[error("backup dir not found, nothing to recover: {}", .0.display())]
    BackupMissing(PathBuf),

    // Transformation failures; the run aborts before any original moves.
    #[error("unrecognized variable length type: {0}")]
    UnknownVarlenType(String),

    #[error("column length out of range in `{0}`")]
    ColumnLength(String),

    #[error("row size {size} bytes still at the {budget} byte budget or over after demoting every varchar class")]
    SizeNotConvertible { size: u64, budget: u64 },

    // Attaches the schema file being processed to an inner error.
    #[error("{file}: {source}")]
    File {
        file: String,
        #[source]
        source: Box<ConvertError>,
    },

    #[error("couldn't move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    // Wrap an error with the name of the schema file that produced it.
    pub fn in_file(self, file: &str) -> Self {
        ConvertError::File {
            file: file.to_string(),
            source: Box::new(self),
        }
    }
}
