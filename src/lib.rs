// src/lib.rs

//! Shopwatch Library
//!
//! Snapshots storefront catalogs, diffs them against persisted state,
//! and emits classified change events.

pub mod error;
pub mod fingerprint;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
