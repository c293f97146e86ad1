//! # Citation Registry
//!
//! Loads a hierarchical, free-form Markdown reference document (research
//! topics, per-site sub-topics, loosely formatted citation entries) into an
//! in-memory registry that can be queried by topic, year, keyword, site
//! identifier and element.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (CitationRecord, Topic, Site)
//! - [`registry`]: Document parsing, indexing and queries
//! - [`utils`]: Field extraction, citation formatting, duplicate detection
//!   and terminal display helpers
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod registry;
pub mod utils;

// Re-export commonly used types
pub use models::{CitationRecord, Site, Topic};
pub use registry::{Registry, RegistryError, RegistryStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
