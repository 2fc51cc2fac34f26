//! Input/output helpers.
//!
//! - cleaned dataset CSV ingest + validation (`ingest`)
//! - evaluation result exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
