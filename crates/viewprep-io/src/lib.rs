#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// COLMAP text model reader and writer.
pub mod colmap;
