//! Distress notifications

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::IncidentService;
use crate::auth::{filter_readable, read_scope, Operation, Session, Table};
use crate::models::{DistressNotification, NewDistressNotification};
use crate::types::{Result, WatchpostError};

impl IncidentService {
    /// Officer sends a message to an incident's reporter
    pub async fn send_distress(
        &self,
        session: &Session,
        request: NewDistressNotification,
    ) -> Result<DistressNotification> {
        let caller = self.caller(session).await?;
        request.validate()?;

        let incident = self
            .visible_report(&caller, request.incident_id)
            .await?
            .ok_or_else(|| WatchpostError::NotFound(format!("incident report {}", request.incident_id)))?;
        self.ensure(
            Table::DistressNotifications,
            Operation::Insert,
            &caller,
            incident.reporter_id,
        )?;

        let row = request.into_row(caller.id, incident.reporter_id)?;
        let notification = self.backend.insert_notification(row).await?;
        self.hub.publish_insert(Table::DistressNotifications, &notification);

        info!(
            notification = %notification.id,
            incident = %notification.incident_id,
            officer = %notification.officer_id,
            recipient = %notification.user_id,
            "Distress notification sent"
        );
        Ok(notification)
    }

    /// Own notifications for users, every notification for officers. Newest first.
    pub async fn list_notifications(&self, session: &Session) -> Result<Vec<DistressNotification>> {
        let caller = self.caller(session).await?;
        let rows = self
            .backend
            .list_notifications(read_scope(Table::DistressNotifications, &caller))
            .await?;
        Ok(filter_readable(Table::DistressNotifications, &caller, rows, |n| n.user_id))
    }

    pub async fn get_notification(
        &self,
        session: &Session,
        id: Uuid,
    ) -> Result<Option<DistressNotification>> {
        let caller = self.caller(session).await?;
        Ok(self
            .backend
            .get_notification(id)
            .await?
            .filter(|n| Self::can_read(Table::DistressNotifications, &caller, n.user_id)))
    }

    /// Recipient acknowledges. Repeating it keeps the first timestamp.
    pub async fn acknowledge(&self, session: &Session, id: Uuid) -> Result<DistressNotification> {
        let caller = self.caller(session).await?;
        let current = self
            .backend
            .get_notification(id)
            .await?
            .filter(|n| Self::can_read(Table::DistressNotifications, &caller, n.user_id))
            .ok_or_else(|| WatchpostError::NotFound(format!("distress notification {id}")))?;
        self.ensure(
            Table::DistressNotifications,
            Operation::Update,
            &caller,
            current.user_id,
        )?;

        let notification = self
            .backend
            .acknowledge_notification(id, Utc::now())
            .await?
            .ok_or_else(|| WatchpostError::NotFound(format!("distress notification {id}")))?;

        info!(notification = %id, recipient = %caller.id, "Distress notification acknowledged");
        Ok(notification)
    }
}
