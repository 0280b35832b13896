#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Binary record codec and pair identifiers.
pub mod codec;

/// Error types for the project database.
pub mod error;

/// SQLite-backed project store.
pub mod store;

/// Row types of the project database.
pub mod types;

pub use codec::{Matrix, MatrixBlob};
pub use error::DatabaseError;
pub use store::ProjectStore;
pub use types::*;
