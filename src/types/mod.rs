//! Shared types for Watchpost

pub mod error;

pub use error::{Result, WatchpostError};
