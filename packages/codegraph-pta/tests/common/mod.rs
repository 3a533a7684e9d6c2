//! Common test utilities for codegraph-pta
//!
//! Shared program fixtures and assertion helpers for the integration tests.

#![allow(dead_code)]

mod assertions;
mod fixtures;

pub use assertions::*;
pub use fixtures::*;
