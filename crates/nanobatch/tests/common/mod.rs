//! Shared test utilities for nanobatch integration tests.
//!
//! - `TestHarness` for isolated runs against a temp output folder
//! - scripted generators and providers standing in for the remote API
//! - builders for specs and submitted rows

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
