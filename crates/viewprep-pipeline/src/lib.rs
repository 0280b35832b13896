#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Engine command lines.
pub mod commands;

/// Run configuration.
pub mod config;

/// Error types for the pipeline.
pub mod error;

/// Scene and run directory layouts.
pub mod layout;

/// The few-view reconstruction pipeline.
pub mod orchestrator;

/// External process execution.
pub mod process;

/// Renumbering of reference poses.
pub mod reconcile;

/// Reference model construction.
pub mod reference;

/// Training and holdout view selection.
pub mod sampler;

/// Pipeline stages.
pub mod stage;

/// Filesystem staging of a run.
pub mod staging;

pub use config::PipelineConfig;
pub use error::{PipelineError, StageError};
pub use layout::{RunLayout, SceneLayout};
pub use orchestrator::{Pipeline, PipelineReport};
pub use process::{CommandRunner, ProcessRunner, StageCommand, StageOutput};
pub use reference::build_reference_model;
pub use sampler::{select_views, ViewSplit, HOLDOUT_STRIDE};
pub use stage::Stage;
pub use staging::CopyReport;
