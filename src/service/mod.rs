//! Incident service
//!
//! The single place where the authorization policy meets the row stores.
//! Every operation takes an explicit [`Session`], resolves the caller's role
//! from the profile store (never from the token), checks the policy, and
//! then talks to the backend. Successful inserts are published on the
//! [`ChangeHub`].
//!
//! Reads the caller may not see come back empty or `None`. Writes the policy
//! denies fail with `Forbidden`.

mod admin;
mod auth;
mod notifications;
mod profiles;
mod reports;
mod videos;

pub use auth::Authenticated;
pub use reports::{SubmittedReport, VideoUpload};

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::auth::policy::describe;
use crate::auth::{is_allowed, Caller, Operation, Session, Table};
use crate::backend::Backend;
use crate::realtime::ChangeHub;
use crate::storage::VideoStore;
use crate::types::{Result, WatchpostError};

/// Policy-enforcing front for the row stores
pub struct IncidentService {
    backend: Arc<dyn Backend>,
    hub: Arc<ChangeHub>,
    videos: Arc<VideoStore>,
}

impl IncidentService {
    pub fn new(backend: Arc<dyn Backend>, hub: Arc<ChangeHub>, videos: Arc<VideoStore>) -> Self {
        Self {
            backend,
            hub,
            videos,
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn hub(&self) -> &Arc<ChangeHub> {
        &self.hub
    }

    pub fn videos(&self) -> &Arc<VideoStore> {
        &self.videos
    }

    /// Resolve the session's principal and its current role.
    ///
    /// A principal without a profile row cannot act at all.
    pub async fn caller(&self, session: &Session) -> Result<Caller> {
        match self.backend.role_of(session.principal_id).await? {
            Some(role) => Ok(Caller::new(session.principal_id, role)),
            None => Err(WatchpostError::Unauthorized(
                "No profile for this principal".into(),
            )),
        }
    }

    /// Fail with `Forbidden` unless the policy admits the operation
    fn ensure(&self, table: Table, op: Operation, caller: &Caller, owner: Uuid) -> Result<()> {
        if is_allowed(table, op, caller, owner) {
            return Ok(());
        }
        warn!(
            caller = %caller.id,
            role = %caller.role,
            %table,
            %owner,
            "{} denied",
            describe(table, op)
        );
        Err(WatchpostError::Forbidden(format!(
            "{} denied for {}",
            describe(table, op),
            caller.id
        )))
    }

    fn can_read(table: Table, caller: &Caller, owner: Uuid) -> bool {
        is_allowed(table, Operation::Read, caller, owner)
    }
}
