//! Registration must not leave a credential behind when its profile
//! cannot be written.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use watchpost::auth::ReadScope;
use watchpost::backend::{Backend, CascadeSummary, MemoryBackend};
use watchpost::models::{
    Credential, DistressNotification, IncidentPatch, IncidentReport, Profile, ProfileUpdate,
    RegistrationMetadata, Role,
};
use watchpost::realtime::ChangeHub;
use watchpost::service::IncidentService;
use watchpost::storage::{VideoStore, VideoStoreConfig};
use watchpost::{Result, WatchpostError};

/// Memory backend whose first profile insert fails
#[derive(Default)]
struct FlakyProfiles {
    inner: MemoryBackend,
    failed_once: AtomicBool,
}

#[async_trait::async_trait]
impl Backend for FlakyProfiles {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    async fn insert_credential(&self, credential: Credential) -> Result<()> {
        self.inner.insert_credential(credential).await
    }

    async fn find_credential(&self, email: &str) -> Result<Option<Credential>> {
        self.inner.find_credential(email).await
    }

    async fn delete_credential(&self, email: &str) -> Result<bool> {
        self.inner.delete_credential(email).await
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(WatchpostError::Database("transient".into()));
        }
        self.inner.insert_profile(profile).await
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.inner.get_profile(id).await
    }

    async fn list_profiles(&self, scope: ReadScope) -> Result<Vec<Profile>> {
        self.inner.list_profiles(scope).await
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<Profile>> {
        self.inner.update_profile(id, update).await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>> {
        self.inner.set_role(id, role).await
    }

    async fn insert_report(&self, report: IncidentReport) -> Result<IncidentReport> {
        self.inner.insert_report(report).await
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<IncidentReport>> {
        self.inner.get_report(id).await
    }

    async fn list_reports(&self, scope: ReadScope) -> Result<Vec<IncidentReport>> {
        self.inner.list_reports(scope).await
    }

    async fn update_report(&self, id: Uuid, patch: &IncidentPatch) -> Result<Option<IncidentReport>> {
        self.inner.update_report(id, patch).await
    }

    async fn insert_notification(&self, notification: DistressNotification) -> Result<DistressNotification> {
        self.inner.insert_notification(notification).await
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<DistressNotification>> {
        self.inner.get_notification(id).await
    }

    async fn list_notifications(&self, scope: ReadScope) -> Result<Vec<DistressNotification>> {
        self.inner.list_notifications(scope).await
    }

    async fn acknowledge_notification(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<DistressNotification>> {
        self.inner.acknowledge_notification(id, at).await
    }

    async fn delete_principal(&self, id: Uuid) -> Result<CascadeSummary> {
        self.inner.delete_principal(id).await
    }
}

#[tokio::test]
async fn test_failed_profile_insert_frees_the_email() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FlakyProfiles::default());
    let service = IncidentService::new(
        backend.clone(),
        Arc::new(ChangeHub::default()),
        Arc::new(VideoStore::new(VideoStoreConfig {
            root: temp_dir.path().to_path_buf(),
            ..Default::default()
        })),
    );

    let err = service
        .register("retry@example.com", "correct horse battery", RegistrationMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::Database(_)));

    // Nothing left to log in with
    assert!(backend.find_credential("retry@example.com").await.unwrap().is_none());
    assert!(service
        .authenticate("retry@example.com", "correct horse battery")
        .await
        .is_err());

    let (auth, profile) = service
        .register("retry@example.com", "correct horse battery", RegistrationMetadata::default())
        .await
        .unwrap();
    assert_eq!(profile.id, auth.session.principal_id);
    assert_eq!(service.me(&auth.session).await.unwrap().id, profile.id);
}
