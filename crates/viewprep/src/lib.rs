#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use viewprep_db as db;

#[doc(inline)]
pub use viewprep_io as io;

#[doc(inline)]
pub use viewprep_pipeline as pipeline;
