use crate::{
    codec::CodecError,
    types::{CameraId, CameraModelId, ImageId},
};

/// An error type for the project database.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Error raised by the record codec.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The parameter vector does not fit the camera model.
    #[error("Invalid number of parameters for {model}: expected {expected}, got {actual}")]
    InvalidParams {
        /// Camera model
        model: CameraModelId,
        /// Parameter count implied by the model
        expected: usize,
        /// Parameter count provided
        actual: usize,
    },

    /// The record shape does not fit the table.
    #[error("Invalid record shape: {0}")]
    InvalidShape(String),

    /// An image with this name already exists.
    #[error("Image name already exists: {0}")]
    DuplicateName(String),

    /// The referenced camera does not exist.
    #[error("Unknown camera id: {0}")]
    UnknownCamera(CameraId),

    /// The referenced image does not exist.
    #[error("Unknown image id: {0}")]
    UnknownImage(ImageId),

    /// A stored camera model tag is not recognized.
    #[error("Unknown camera model tag: {0}")]
    UnknownCameraModel(i64),

    /// A stored two-view configuration tag is not recognized.
    #[error("Unknown two-view geometry config tag: {0}")]
    UnknownTwoViewConfig(i64),

    /// Error from the underlying SQLite connection.
    #[error("SQLite error. {0}")]
    Sqlite(#[from] rusqlite::Error),
}
