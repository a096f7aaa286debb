//! Integration tests for dashboards and their live feeds

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use watchpost::auth::Session;
use watchpost::backend::MemoryBackend;
use watchpost::dashboard::{open_dashboard, Dashboard, DashboardSnapshot};
use watchpost::models::{
    IncidentStatus, NewDistressNotification, NewIncidentReport, NotificationStatus,
    RegistrationMetadata, Role,
};
use watchpost::realtime::{ChangeHub, Signal};
use watchpost::service::IncidentService;
use watchpost::storage::{VideoStore, VideoStoreConfig};

fn create_service(buffer: usize) -> (Arc<IncidentService>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let videos = VideoStore::new(VideoStoreConfig {
        root: temp_dir.path().to_path_buf(),
        ..Default::default()
    });
    let service = IncidentService::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(ChangeHub::new(buffer)),
        Arc::new(videos),
    );
    (Arc::new(service), temp_dir)
}

async fn register(service: &IncidentService, email: &str, role: Role) -> Session {
    let (auth, _) = service
        .register(email, "correct horse battery", RegistrationMetadata::default())
        .await
        .unwrap();
    if role == Role::Officer {
        service.set_role(auth.session.principal_id, role).await.unwrap();
    }
    auth.session
}

fn report(title: &str) -> NewIncidentReport {
    NewIncidentReport {
        title: title.into(),
        description: "Two people climbing the fence".into(),
        incident_type: "suspicious_activity".into(),
        location: "North gate".into(),
        video_url: None,
    }
}

fn distress(incident_id: Uuid) -> NewDistressNotification {
    NewDistressNotification {
        incident_id,
        message: "Officers dispatched, stay clear".into(),
        user_id: None,
    }
}

#[tokio::test]
async fn test_open_dashboard_follows_role() {
    let (service, _temp) = create_service(16);
    let citizen = register(&service, "citizen@example.com", Role::User).await;
    let officer = register(&service, "officer@example.com", Role::Officer).await;

    let dashboard = open_dashboard(Arc::clone(&service), citizen).await.unwrap();
    assert!(matches!(dashboard, Dashboard::User(_)));
    assert_eq!(dashboard.role(), Role::User);

    let dashboard = open_dashboard(Arc::clone(&service), officer).await.unwrap();
    assert!(matches!(dashboard, Dashboard::Officer(_)));
}

#[tokio::test]
async fn test_user_snapshot_shows_own_rows() {
    let (service, _temp) = create_service(16);
    let citizen = register(&service, "citizen@example.com", Role::User).await;
    let other = register(&service, "other@example.com", Role::User).await;
    service.submit_report(&citizen, report("Mine")).await.unwrap();
    service.submit_report(&other, report("Theirs")).await.unwrap();

    let dashboard = open_dashboard(Arc::clone(&service), citizen.clone()).await.unwrap();
    let snapshot = dashboard.snapshot().await.unwrap();

    match &snapshot {
        DashboardSnapshot::User { profile, reports, .. } => {
            assert_eq!(profile.id, citizen.principal_id);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].title, "Mine");
        }
        other => panic!("expected user view, got {:?}", other),
    }
}

#[tokio::test]
async fn test_user_feed_refreshes_once_per_distress() {
    let (service, _temp) = create_service(16);
    let citizen = register(&service, "citizen@example.com", Role::User).await;
    let officer = register(&service, "officer@example.com", Role::Officer).await;
    let incident = service.submit_report(&citizen, report("Fence")).await.unwrap();

    let dashboard = open_dashboard(Arc::clone(&service), citizen).await.unwrap();
    let mut feed = dashboard.live();

    service.send_distress(&officer, distress(incident.id)).await.unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(1), feed.next_refresh())
        .await
        .expect("feed should wake")
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.notifications().len(), 1);
    assert_eq!(snapshot.notifications()[0].status, NotificationStatus::Sent);

    // Nothing further queued for this principal
    let idle = tokio::time::timeout(Duration::from_millis(50), feed.next_signal()).await;
    assert!(idle.is_err());
}

#[tokio::test]
async fn test_user_feed_ignores_other_recipients() {
    let (service, _temp) = create_service(16);
    let citizen = register(&service, "citizen@example.com", Role::User).await;
    let neighbour = register(&service, "neighbour@example.com", Role::User).await;
    let officer = register(&service, "officer@example.com", Role::Officer).await;
    let incident = service.submit_report(&neighbour, report("Fence")).await.unwrap();

    let dashboard = open_dashboard(Arc::clone(&service), citizen).await.unwrap();
    let mut feed = dashboard.live();

    service.send_distress(&officer, distress(incident.id)).await.unwrap();

    let idle = tokio::time::timeout(Duration::from_millis(50), feed.next_signal()).await;
    assert!(idle.is_err());
}

#[tokio::test]
async fn test_officer_feed_sees_new_reports() {
    let (service, _temp) = create_service(16);
    let citizen = register(&service, "citizen@example.com", Role::User).await;
    let officer = register(&service, "officer@example.com", Role::Officer).await;

    let dashboard = open_dashboard(Arc::clone(&service), officer.clone()).await.unwrap();
    let mut feed = dashboard.live();

    let submitted = service.submit_report(&citizen, report("Fence")).await.unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(1), feed.next_refresh())
        .await
        .expect("feed should wake")
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.reports().len(), 1);
    assert_eq!(snapshot.reports()[0].id, submitted.id);
    assert_eq!(snapshot.reports()[0].status, IncidentStatus::Pending);

    match snapshot {
        DashboardSnapshot::Officer { profiles, .. } => assert_eq!(profiles.len(), 2),
        other => panic!("expected officer view, got {:?}", other),
    }
}

#[tokio::test]
async fn test_lagged_feed_still_refreshes_everything() {
    let (service, _temp) = create_service(1);
    let citizen = register(&service, "citizen@example.com", Role::User).await;
    let officer = register(&service, "officer@example.com", Role::Officer).await;

    let dashboard = open_dashboard(Arc::clone(&service), officer).await.unwrap();
    let mut feed = dashboard.live();

    for title in ["One", "Two", "Three"] {
        service.submit_report(&citizen, report(title)).await.unwrap();
    }

    let signal = feed.next_signal().await.unwrap();
    assert!(matches!(signal, Signal::Lagged(2)));

    let snapshot = feed.refresh().await.unwrap();
    assert_eq!(snapshot.reports().len(), 3);
}
