//! Explicit session context
//!
//! Every service and dashboard operation takes a [`Session`] instead of
//! reading an ambient "current user".

use serde::Serialize;
use uuid::Uuid;

/// Authenticated principal making a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub principal_id: Uuid,
    pub email: String,
}

impl Session {
    pub fn new(principal_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            principal_id,
            email: email.into(),
        }
    }
}
