//! MongoDB backend
//!
//! Collections are opened (and their indexes applied) once at startup.
//! Every single-row update is one atomic MongoDB write; there is no
//! cross-document transaction, so concurrent officer updates are
//! last-write-wins.

use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::{newest_notifications_first, newest_reports_first, Backend, CascadeSummary};
use crate::auth::{ReadScope, Table};
use crate::db::schemas::{
    CREDENTIAL_COLLECTION, INCIDENT_COLLECTION, NOTIFICATION_COLLECTION, PROFILE_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::models::{
    normalize_email, Credential, DistressNotification, IncidentPatch, IncidentReport,
    NotificationStatus, Profile, ProfileUpdate, Role,
};
use crate::types::{Result, WatchpostError};

/// Backend over four MongoDB collections
pub struct MongoBackend {
    client: MongoClient,
    credentials: MongoCollection<Credential>,
    profiles: MongoCollection<Profile>,
    reports: MongoCollection<IncidentReport>,
    notifications: MongoCollection<DistressNotification>,
}

impl MongoBackend {
    /// Open collections and apply indexes
    pub async fn new(client: MongoClient) -> Result<Self> {
        let credentials = client.collection(CREDENTIAL_COLLECTION).await?;
        let profiles = client.collection(PROFILE_COLLECTION).await?;
        let reports = client.collection(INCIDENT_COLLECTION).await?;
        let notifications = client.collection(NOTIFICATION_COLLECTION).await?;

        info!(db = client.db_name(), "MongoDB backend ready");

        Ok(Self {
            client,
            credentials,
            profiles,
            reports,
            notifications,
        })
    }
}

fn by_id(id: Uuid) -> Document {
    doc! { "id": id.to_string() }
}

fn scope_filter(table: Table, scope: ReadScope) -> Document {
    match scope {
        ReadScope::All => doc! {},
        ReadScope::Owned(owner) => {
            let mut filter = Document::new();
            filter.insert(table.owner_column(), owner.to_string());
            filter
        }
    }
}

fn now_bson() -> Result<Bson> {
    Ok(bson::to_bson(&Utc::now())?)
}

fn profile_set(update: &ProfileUpdate) -> Result<Document> {
    let mut set = Document::new();
    if let Some(v) = &update.full_name {
        set.insert("full_name", v.as_str());
    }
    if let Some(v) = &update.address {
        set.insert("address", v.as_str());
    }
    if let Some(v) = &update.phone_number {
        set.insert("phone_number", v.as_str());
    }
    if let Some(v) = &update.sex {
        set.insert("sex", v.as_str());
    }
    if let Some(v) = &update.gender {
        set.insert("gender", v.as_str());
    }
    set.insert("updated_at", now_bson()?);
    Ok(set)
}

fn report_set(patch: &IncidentPatch) -> Result<Document> {
    let mut set = Document::new();
    if let Some(v) = &patch.title {
        set.insert("title", v.as_str());
    }
    if let Some(v) = &patch.description {
        set.insert("description", v.as_str());
    }
    if let Some(v) = &patch.incident_type {
        set.insert("incident_type", v.as_str());
    }
    if let Some(v) = &patch.location {
        set.insert("location", v.as_str());
    }
    if let Some(v) = &patch.video_url {
        set.insert("video_url", v.as_str());
    }
    if let Some(v) = patch.status {
        set.insert("status", v.as_str());
    }
    if let Some(v) = patch.assigned_officer_id {
        set.insert("assigned_officer_id", v.to_string());
    }
    set.insert("updated_at", now_bson()?);
    Ok(set)
}

#[async_trait::async_trait]
impl Backend for MongoBackend {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }

    async fn insert_credential(&self, credential: Credential) -> Result<()> {
        if self.find_credential(&credential.email).await?.is_some() {
            return Err(WatchpostError::validation("email", "is already registered"));
        }
        self.credentials
            .insert_one(&credential)
            .await
            .map_err(|e| match e {
                WatchpostError::BadRequest(_) => {
                    WatchpostError::validation("email", "is already registered")
                }
                other => other,
            })
    }

    async fn find_credential(&self, email: &str) -> Result<Option<Credential>> {
        self.credentials
            .find_one(doc! { "email": normalize_email(email) })
            .await
    }

    async fn delete_credential(&self, email: &str) -> Result<bool> {
        let deleted = self
            .credentials
            .delete_many(doc! { "email": normalize_email(email) })
            .await?
            .deleted_count;
        Ok(deleted > 0)
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile> {
        self.profiles.insert_one(&profile).await?;
        Ok(profile)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.profiles.find_one(by_id(id)).await
    }

    async fn list_profiles(&self, scope: ReadScope) -> Result<Vec<Profile>> {
        let mut profiles = self
            .profiles
            .find_many(scope_filter(Table::Profiles, scope))
            .await?;
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(profiles)
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<Profile>> {
        let set = profile_set(update)?;
        self.profiles
            .find_one_and_update(by_id(id), doc! { "$set": set })
            .await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>> {
        let now = now_bson()?;
        self.profiles
            .find_one_and_update(
                by_id(id),
                doc! { "$set": { "role": role.as_str(), "updated_at": now } },
            )
            .await
    }

    async fn insert_report(&self, report: IncidentReport) -> Result<IncidentReport> {
        self.reports.insert_one(&report).await?;
        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<IncidentReport>> {
        self.reports.find_one(by_id(id)).await
    }

    async fn list_reports(&self, scope: ReadScope) -> Result<Vec<IncidentReport>> {
        let mut reports = self
            .reports
            .find_many(scope_filter(Table::IncidentReports, scope))
            .await?;
        newest_reports_first(&mut reports);
        Ok(reports)
    }

    async fn update_report(&self, id: Uuid, patch: &IncidentPatch) -> Result<Option<IncidentReport>> {
        let set = report_set(patch)?;
        self.reports
            .find_one_and_update(by_id(id), doc! { "$set": set })
            .await
    }

    async fn insert_notification(&self, notification: DistressNotification) -> Result<DistressNotification> {
        self.notifications.insert_one(&notification).await?;
        Ok(notification)
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<DistressNotification>> {
        self.notifications.find_one(by_id(id)).await
    }

    async fn list_notifications(&self, scope: ReadScope) -> Result<Vec<DistressNotification>> {
        let mut notifications = self
            .notifications
            .find_many(scope_filter(Table::DistressNotifications, scope))
            .await?;
        newest_notifications_first(&mut notifications);
        Ok(notifications)
    }

    async fn acknowledge_notification(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<DistressNotification>> {
        // Stamp only when unset so a second acknowledgement keeps the first time
        let mut unstamped = by_id(id);
        unstamped.insert("acknowledged_at", Bson::Null);
        let stamp = bson::to_bson(&at)?;
        self.notifications
            .update_one(unstamped, doc! { "$set": { "acknowledged_at": stamp } })
            .await?;

        self.notifications
            .find_one_and_update(
                by_id(id),
                doc! { "$set": { "status": NotificationStatus::Acknowledged.as_str() } },
            )
            .await
    }

    async fn delete_principal(&self, id: Uuid) -> Result<CascadeSummary> {
        let principal = id.to_string();
        let mut summary = CascadeSummary::default();

        self.credentials
            .delete_many(doc! { "principal_id": principal.as_str() })
            .await?;
        summary.profile_deleted = self.profiles.delete_many(by_id(id)).await?.deleted_count > 0;

        let owned: Vec<String> = self
            .reports
            .find_many(doc! { "reporter_id": principal.as_str() })
            .await?
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();

        summary.notifications_deleted = self
            .notifications
            .delete_many(doc! {
                "$or": [
                    { "incident_id": { "$in": owned } },
                    { "user_id": principal.as_str() },
                    { "officer_id": principal.as_str() },
                ]
            })
            .await?
            .deleted_count;

        summary.reports_deleted = self
            .reports
            .delete_many(doc! { "reporter_id": principal.as_str() })
            .await?
            .deleted_count;

        let now = now_bson()?;
        summary.assignments_cleared = self
            .reports
            .update_many(
                doc! { "assigned_officer_id": principal.as_str() },
                doc! { "$set": { "assigned_officer_id": Bson::Null, "updated_at": now } },
            )
            .await?
            .modified_count;

        debug!(principal = %principal, ?summary, "Principal cascade complete");
        Ok(summary)
    }
}
