//! Alpha Screener Library
//!
//! Token risk filtering and composite scoring pipeline for memecoin
//! candidates.

pub mod config;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod providers;
pub mod replay;
pub mod scoring;
pub mod signal;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
