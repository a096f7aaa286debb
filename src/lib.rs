//! Watchpost - citizen incident reporting gateway
//!
//! Citizens file incident reports (optionally with video) and receive
//! distress notifications; officers triage every report and message
//! reporters. Every row access passes a row-level policy evaluated against
//! the caller's current role.
//!
//! ## Components
//!
//! - **Policy**: owner-or-officer reads, per-table write rules (`auth::policy`)
//! - **Service**: lifecycle operations over a swappable backend (`service`)
//! - **Backends**: MongoDB in production, in-memory for dev mode and tests
//! - **Realtime**: insert broadcasts driving subscribe-and-re-fetch dashboards
//! - **Videos**: filesystem evidence store served back to owners and officers

pub mod auth;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, WatchpostError};
