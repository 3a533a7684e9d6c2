//! Library stub summaries for methods without an analyzable body

pub mod model;

pub use model::{ExternalType, StubConstraint, StubModel, StubRef};
