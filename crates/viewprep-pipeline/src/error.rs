use std::path::PathBuf;

use crate::stage::Stage;

/// An error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required file or directory is missing or invalid.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Not enough free space before a disk heavy stage.
    #[error("Not enough disk space at {path}: required {required_gb} GB, available {available_gb} GB")]
    InsufficientDiskSpace {
        /// Path that was checked
        path: PathBuf,
        /// Required free space in GB
        required_gb: u64,
        /// Available free space in GB
        available_gb: u64,
    },

    /// An external process exited with a non-zero status.
    #[error("Command `{command}` failed with exit code {exit_code:?}:\n{stderr}")]
    ExternalStageFailed {
        /// The command line that failed
        command: String,
        /// Exit code, `None` if the process was killed by a signal
        exit_code: Option<i32>,
        /// Captured standard error, verbatim
        stderr: String,
    },

    /// An external process could not be started.
    #[error("Failed to spawn `{command}`. {source}")]
    Spawn {
        /// The command line that could not be started
        command: String,
        /// The underlying error
        source: std::io::Error,
    },

    /// The holdout stride must be positive.
    #[error("Holdout stride must be > 0, got {0}")]
    InvalidHoldoutStride(usize),

    /// The copy worker pool could not be built.
    #[error("Failed to build thread pool. {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Error from the project database.
    #[error(transparent)]
    Database(#[from] viewprep_db::DatabaseError),

    /// Error reading or writing a COLMAP text model.
    #[error(transparent)]
    Colmap(#[from] viewprep_io::colmap::ColmapError),

    /// Error reading the configuration file.
    #[error("Invalid configuration. {0}")]
    Config(#[from] serde_json::Error),

    /// Error manipulating files.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),
}

/// A pipeline error tagged with the stage it stopped at.
#[derive(Debug, thiserror::Error)]
#[error("Stage `{stage}` failed: {source}")]
pub struct StageError {
    /// The stage that failed
    pub stage: Stage,
    /// Why it failed
    #[source]
    pub source: PipelineError,
}

/// Attach the current stage to a pipeline result.
pub trait StageContext<T> {
    /// Tag the error, if any, with `stage`.
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> StageContext<T> for Result<T, PipelineError> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|source| StageError { stage, source })
    }
}
