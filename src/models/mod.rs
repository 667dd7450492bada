// src/models/mod.rs

//! Domain models for the watcher application.
//!
//! This module contains all data structures used throughout the
//! application, organized by their primary purpose.

mod config;
mod event;
mod record;
mod state;

// Re-export all public types
pub use config::{
    Config, DiffConfig, HtmlSelectors, HttpConfig, RemovalPolicy, SmtpConfig, Target, TargetKind,
};
pub use event::{ChangeEvent, ChangeKind};
pub use record::{ProductRecord, StableKey};
pub use state::{StateEntry, StateMap};
