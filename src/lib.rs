//! Catalog Import Library
//!
//! Resolves messy supplier spreadsheets into a clean parent/variant product
//! catalog: column mapping, parent inference from SKU grammars, idempotent
//! natural-key upserts, and attribute, barcode and pricing side effects.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod grouping;
pub mod mapping;
pub mod migrator;
pub mod models;
pub mod resolution;
pub mod services;
pub mod validation;

pub use config::ImportConfig;
pub use errors::ImportError;
pub use events::{Event, EventSender};
pub use models::{ColumnMapping, ImportResult, RawRow};
pub use services::{Heartbeat, ImportOptions, ImportRunner};
