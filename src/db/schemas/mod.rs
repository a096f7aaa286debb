//! Database schemas for Watchpost
//!
//! Collection names and index definitions for the row types in
//! [`crate::models`]. Rows are stored as-is; MongoDB's own `_id` is ignored
//! when reading them back.

mod credential;
mod incident;
mod notification;
mod profile;

pub use credential::CREDENTIAL_COLLECTION;
pub use incident::INCIDENT_COLLECTION;
pub use notification::NOTIFICATION_COLLECTION;
pub use profile::PROFILE_COLLECTION;
