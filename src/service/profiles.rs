//! Profile reads and self-service updates

use tracing::info;
use uuid::Uuid;

use super::IncidentService;
use crate::auth::{filter_readable, read_scope, Operation, Session, Table};
use crate::models::{Profile, ProfileUpdate};
use crate::types::{Result, WatchpostError};

impl IncidentService {
    /// Own profile for users, every profile for officers
    pub async fn list_profiles(&self, session: &Session) -> Result<Vec<Profile>> {
        let caller = self.caller(session).await?;
        let rows = self
            .backend
            .list_profiles(read_scope(Table::Profiles, &caller))
            .await?;
        Ok(filter_readable(Table::Profiles, &caller, rows, |p| p.id))
    }

    pub async fn get_profile(&self, session: &Session, id: Uuid) -> Result<Option<Profile>> {
        let caller = self.caller(session).await?;
        Ok(self
            .backend
            .get_profile(id)
            .await?
            .filter(|p| Self::can_read(Table::Profiles, &caller, p.id)))
    }

    /// Self-service update. Officers get no write access to other profiles.
    pub async fn update_profile(
        &self,
        session: &Session,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Profile> {
        let caller = self.caller(session).await?;
        self.ensure(Table::Profiles, Operation::Update, &caller, id)?;
        if update.is_empty() {
            return Err(WatchpostError::BadRequest("No fields to update".into()));
        }

        let profile = self
            .backend
            .update_profile(id, update)
            .await?
            .ok_or_else(|| WatchpostError::NotFound(format!("profile {id}")))?;

        info!(principal = %id, "Profile updated");
        Ok(profile)
    }
}
