//! Pipeline entry points for watcher operations.
//!
//! - [`DiffEngine`]: classify changes between observations and state
//! - [`run_watch`]: one full fetch → diff → persist → notify run

pub mod diff;
pub mod run;

pub use diff::DiffEngine;
pub use run::{RunSummary, run_watch};
