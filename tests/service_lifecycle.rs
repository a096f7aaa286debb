//! Integration tests for the incident lifecycle over the in-memory backend
//!
//! Each test builds a fresh service with a temporary video directory and
//! drives it through sessions, the same way the HTTP layer does.

use bytes::Bytes;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use watchpost::auth::{JwtValidator, Session};
use watchpost::backend::MemoryBackend;
use watchpost::models::{
    IncidentPatch, IncidentStatus, NewDistressNotification, NewIncidentReport, NotificationStatus,
    ProfileUpdate, RegistrationMetadata, Role,
};
use watchpost::realtime::ChangeHub;
use watchpost::service::{IncidentService, VideoUpload};
use watchpost::storage::{VideoStore, VideoStoreConfig};
use watchpost::WatchpostError;

/// Helper to create a service backed by memory and a temporary video store
fn create_service() -> (Arc<IncidentService>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let videos = VideoStore::new(VideoStoreConfig {
        root: temp_dir.path().to_path_buf(),
        public_url: "http://watchpost.test".to_string(),
        ..Default::default()
    });
    let service = IncidentService::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(ChangeHub::default()),
        Arc::new(videos),
    );
    (Arc::new(service), temp_dir)
}

async fn register(service: &IncidentService, email: &str) -> Session {
    let (auth, _profile) = service
        .register(email, "correct horse battery", RegistrationMetadata::default())
        .await
        .unwrap();
    auth.session
}

async fn register_officer(service: &IncidentService, email: &str) -> Session {
    let session = register(service, email).await;
    service.set_role(session.principal_id, Role::Officer).await.unwrap();
    session
}

fn break_in() -> NewIncidentReport {
    NewIncidentReport {
        title: "Break-in".into(),
        description: "Front door forced open overnight".into(),
        incident_type: "emergency".into(),
        location: "Lobby".into(),
        video_url: None,
    }
}

fn distress(incident_id: Uuid, message: &str) -> NewDistressNotification {
    NewDistressNotification {
        incident_id,
        message: message.into(),
        user_id: None,
    }
}

#[tokio::test]
async fn test_registration_creates_default_profile() {
    let (service, _temp) = create_service();

    let meta = RegistrationMetadata {
        full_name: Some("Ada Citizen".into()),
        ..Default::default()
    };
    let (auth, profile) = service
        .register("Ada@Example.com", "correct horse battery", meta)
        .await
        .unwrap();

    assert_eq!(profile.id, auth.session.principal_id);
    assert_eq!(profile.role, Role::User);
    assert_eq!(profile.full_name, "Ada Citizen");
    assert_eq!(profile.address, "");
    assert_eq!(profile.phone_number, "");

    let me = service.me(&auth.session).await.unwrap();
    assert_eq!(me, profile);
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let (service, _temp) = create_service();
    register(&service, "dup@example.com").await;

    let err = service
        .register("dup@example.com", "another long password", RegistrationMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::Validation { field: "email", .. }));
}

#[tokio::test]
async fn test_short_password_rejected() {
    let (service, _temp) = create_service();
    let err = service
        .register("short@example.com", "abc", RegistrationMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::Validation { field: "password", .. }));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (service, _temp) = create_service();
    register(&service, "login@example.com").await;

    let wrong_password = service
        .authenticate("login@example.com", "not the password")
        .await
        .unwrap_err();
    let unknown_email = service
        .authenticate("nobody@example.com", "correct horse battery")
        .await
        .unwrap_err();

    assert_eq!(wrong_password.public_message(), unknown_email.public_message());
    assert_eq!(wrong_password.status_code(), unknown_email.status_code());

    let ok = service
        .authenticate("login@example.com", "correct horse battery")
        .await
        .unwrap();
    assert_eq!(ok.session.email, "login@example.com");
}

#[tokio::test]
async fn test_report_round_trip() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;

    let report = service.submit_report(&citizen, break_in()).await.unwrap();
    assert_eq!(report.status, IncidentStatus::Pending);
    assert_eq!(report.reporter_id, citizen.principal_id);
    assert!(report.video_url.is_none());
    assert!(report.assigned_officer_id.is_none());

    let officer_view = service.list_reports(&officer).await.unwrap();
    assert_eq!(officer_view.len(), 1);
    assert_eq!(officer_view[0].title, "Break-in");
    assert_eq!(officer_view[0].location, "Lobby");
    assert_eq!(officer_view[0].incident_type, "emergency");

    let updated = service
        .set_report_status(&officer, report.id, IncidentStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(updated.status, IncidentStatus::InProgress);
    assert_eq!(updated.assigned_officer_id, Some(officer.principal_id));

    // The citizen sees the officer's change on their own report
    let mine = service.get_report(&citizen, report.id).await.unwrap().unwrap();
    assert_eq!(mine.status, IncidentStatus::InProgress);
}

#[tokio::test]
async fn test_citizen_cannot_see_other_rows() {
    let (service, _temp) = create_service();
    let alice = register(&service, "alice@example.com").await;
    let bob = register(&service, "bob@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;

    let report = service.submit_report(&alice, break_in()).await.unwrap();
    let notification = service
        .send_distress(&officer, distress(report.id, "Units on the way"))
        .await
        .unwrap();

    assert!(service.list_reports(&bob).await.unwrap().is_empty());
    assert!(service.get_report(&bob, report.id).await.unwrap().is_none());
    assert!(service.list_notifications(&bob).await.unwrap().is_empty());
    assert!(service
        .get_notification(&bob, notification.id)
        .await
        .unwrap()
        .is_none());
    assert!(service
        .get_profile(&bob, alice.principal_id)
        .await
        .unwrap()
        .is_none());

    // Profiles list is scoped the same way
    let profiles = service.list_profiles(&bob).await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].id, bob.principal_id);
    assert_eq!(service.list_profiles(&officer).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_citizen_cannot_update_reports() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let report = service.submit_report(&citizen, break_in()).await.unwrap();

    let err = service
        .set_report_status(&citizen, report.id, IncidentStatus::Closed)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::Forbidden(_)));

    let unchanged = service.get_report(&citizen, report.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, IncidentStatus::Pending);
}

#[tokio::test]
async fn test_reporter_is_immutable() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;
    let report = service.submit_report(&citizen, break_in()).await.unwrap();

    let patch = IncidentPatch {
        title: Some("Break-in, rear entrance".into()),
        location: Some("Loading dock".into()),
        status: Some(IncidentStatus::Resolved),
        ..Default::default()
    };
    let updated = service.update_report(&officer, report.id, &patch).await.unwrap();

    assert_eq!(updated.reporter_id, citizen.principal_id);
    assert_eq!(updated.title, "Break-in, rear entrance");
    assert_eq!(updated.status, IncidentStatus::Resolved);
    assert!(updated.updated_at >= report.updated_at);
}

#[tokio::test]
async fn test_concurrent_officer_updates_last_write_wins() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let first = register_officer(&service, "first@example.com").await;
    let second = register_officer(&service, "second@example.com").await;
    let report = service.submit_report(&citizen, break_in()).await.unwrap();

    service
        .set_report_status(&first, report.id, IncidentStatus::InProgress)
        .await
        .unwrap();
    service
        .set_report_status(&second, report.id, IncidentStatus::Resolved)
        .await
        .unwrap();

    let current = service.get_report(&first, report.id).await.unwrap().unwrap();
    assert_eq!(current.status, IncidentStatus::Resolved);
    assert_eq!(current.assigned_officer_id, Some(second.principal_id));
}

#[tokio::test]
async fn test_citizen_cannot_send_distress() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let report = service.submit_report(&citizen, break_in()).await.unwrap();

    let err = service
        .send_distress(&citizen, distress(report.id, "Help"))
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::Forbidden(_)));
    assert!(service.list_notifications(&citizen).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_distress_recipient_must_be_reporter() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let bystander = register(&service, "bystander@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;
    let report = service.submit_report(&citizen, break_in()).await.unwrap();

    let mut request = distress(report.id, "Stay inside");
    request.user_id = Some(bystander.principal_id);
    let err = service.send_distress(&officer, request).await.unwrap_err();
    assert!(matches!(err, WatchpostError::Validation { field: "user_id", .. }));

    let err = service
        .send_distress(&officer, distress(Uuid::new_v4(), "No such incident"))
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::NotFound(_)));
}

#[tokio::test]
async fn test_acknowledge_keeps_first_timestamp() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;
    let report = service.submit_report(&citizen, break_in()).await.unwrap();
    let sent = service
        .send_distress(&officer, distress(report.id, "Evacuate the lobby"))
        .await
        .unwrap();
    assert_eq!(sent.status, NotificationStatus::Sent);
    assert_eq!(sent.user_id, citizen.principal_id);

    let first = service.acknowledge(&citizen, sent.id).await.unwrap();
    assert_eq!(first.status, NotificationStatus::Acknowledged);
    let stamped = first.acknowledged_at.unwrap();

    let again = service.acknowledge(&citizen, sent.id).await.unwrap();
    assert_eq!(again.status, NotificationStatus::Acknowledged);
    assert_eq!(again.acknowledged_at, Some(stamped));
}

#[tokio::test]
async fn test_officer_cannot_acknowledge_for_recipient() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;
    let report = service.submit_report(&citizen, break_in()).await.unwrap();
    let sent = service
        .send_distress(&officer, distress(report.id, "Evacuate the lobby"))
        .await
        .unwrap();

    let err = service.acknowledge(&officer, sent.id).await.unwrap_err();
    assert!(matches!(err, WatchpostError::Forbidden(_)));
}

#[tokio::test]
async fn test_profile_update_is_self_service() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;

    let update = ProfileUpdate {
        phone_number: Some("555-0100".into()),
        ..Default::default()
    };
    let profile = service
        .update_profile(&citizen, citizen.principal_id, &update)
        .await
        .unwrap();
    assert_eq!(profile.phone_number, "555-0100");
    assert_eq!(profile.role, Role::User);

    let err = service
        .update_profile(&officer, citizen.principal_id, &update)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::Forbidden(_)));

    let err = service
        .update_profile(&citizen, citizen.principal_id, &ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::BadRequest(_)));
}

#[tokio::test]
async fn test_role_change_applies_to_next_operation() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let other = register(&service, "other@example.com").await;
    service.submit_report(&other, break_in()).await.unwrap();

    assert!(service.list_reports(&citizen).await.unwrap().is_empty());

    // Same session, no new token
    service.set_role(citizen.principal_id, Role::Officer).await.unwrap();
    assert_eq!(service.list_reports(&citizen).await.unwrap().len(), 1);

    service.set_role(citizen.principal_id, Role::User).await.unwrap();
    assert!(service.list_reports(&citizen).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_without_profile_is_unauthorized() {
    let (service, _temp) = create_service();
    let ghost = Session::new(Uuid::new_v4(), "ghost@example.com");

    let err = service.list_reports(&ghost).await.unwrap_err();
    assert!(matches!(err, WatchpostError::Unauthorized(_)));
}

#[tokio::test]
async fn test_video_attached_to_report() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;
    let stranger = register(&service, "stranger@example.com").await;

    let video = VideoUpload {
        content_type: "video/mp4".into(),
        data: Bytes::from_static(b"not really an mp4 but bytes all the same"),
    };
    let submitted = service
        .submit_report_with_video(&citizen, break_in(), Some(video))
        .await
        .unwrap();
    assert!(submitted.warnings.is_empty());

    let url = submitted.report.video_url.clone().unwrap();
    assert!(url.starts_with("http://watchpost.test/videos/"));
    let file_name = url.rsplit('/').next().unwrap();

    let content = service
        .open_video(&officer, citizen.principal_id, file_name)
        .await
        .unwrap();
    assert_eq!(content.content_type, "video/mp4");
    assert_eq!(&content.data[..], b"not really an mp4 but bytes all the same");

    let err = service
        .open_video(&stranger, citizen.principal_id, file_name)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::NotFound(_)));
}

#[tokio::test]
async fn test_failed_video_upload_still_submits_report() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;

    let video = VideoUpload {
        content_type: "text/plain".into(),
        data: Bytes::from_static(b"definitely not a video"),
    };
    let submitted = service
        .submit_report_with_video(&citizen, break_in(), Some(video))
        .await
        .unwrap();

    assert!(submitted.report.video_url.is_none());
    assert_eq!(submitted.warnings.len(), 1);
    assert_eq!(service.list_reports(&citizen).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_form_creates_nothing() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;

    let mut form = break_in();
    form.incident_type = "arson".into();
    let video = VideoUpload {
        content_type: "video/webm".into(),
        data: Bytes::from_static(b"webm"),
    };
    let err = service
        .submit_report_with_video(&citizen, form, Some(video))
        .await
        .unwrap_err();
    assert!(matches!(err, WatchpostError::Validation { field: "incident_type", .. }));
    assert!(service.list_reports(&citizen).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_principal_cascades() {
    let (service, _temp) = create_service();
    let citizen = register(&service, "citizen@example.com").await;
    let officer = register_officer(&service, "officer@example.com").await;
    let report = service.submit_report(&citizen, break_in()).await.unwrap();
    service
        .send_distress(&officer, distress(report.id, "Units on the way"))
        .await
        .unwrap();

    let summary = service.delete_principal(citizen.principal_id).await.unwrap();
    assert!(summary.profile_deleted);
    assert_eq!(summary.reports_deleted, 1);
    assert_eq!(summary.notifications_deleted, 1);

    assert!(service.list_reports(&officer).await.unwrap().is_empty());
    assert!(service.list_notifications(&officer).await.unwrap().is_empty());
    assert!(service
        .authenticate("citizen@example.com", "correct horse battery")
        .await
        .is_err());
}

#[tokio::test]
async fn test_deleted_principal_token_stops_working() {
    let (service, _temp) = create_service();
    let jwt = JwtValidator::new_dev();
    let (auth, _) = service
        .register("leaving@example.com", "correct horse battery", RegistrationMetadata::default())
        .await
        .unwrap();

    let token = jwt
        .generate_token(auth.session.principal_id, &auth.session.email, auth.token_version)
        .unwrap();
    let claims = jwt.verify_token(&token).claims.unwrap();
    assert_eq!(claims.version, auth.token_version);

    let session = jwt.session_from_token(&token).unwrap();
    assert!(service.list_reports(&session).await.is_ok());

    service.delete_principal(session.principal_id).await.unwrap();

    // The token still verifies, but its principal can no longer act
    assert!(jwt.session_from_token(&token).is_ok());
    let err = service.list_reports(&session).await.unwrap_err();
    assert!(matches!(err, WatchpostError::Unauthorized(_)));
}
