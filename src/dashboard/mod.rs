//! Role-specific dashboard views
//!
//! A dashboard is a session bound to the service. The citizen view shows the
//! principal's own rows; the officer view shows everything. Each view can
//! open a [`LiveFeed`] that turns change signals into fresh snapshots: the
//! feed never applies deltas, it re-fetches the whole filtered list.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{Session, Table};
use crate::models::{
    DistressNotification, IncidentPatch, IncidentReport, IncidentStatus, NewDistressNotification,
    NewIncidentReport, Profile, ProfileUpdate, Role,
};
use crate::realtime::{ChangeFilter, Signal, Subscription};
use crate::service::{IncidentService, SubmittedReport, VideoUpload};
use crate::types::Result;

/// Everything a dashboard displays
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardSnapshot {
    User {
        profile: Profile,
        reports: Vec<IncidentReport>,
        notifications: Vec<DistressNotification>,
    },
    Officer {
        reports: Vec<IncidentReport>,
        notifications: Vec<DistressNotification>,
        profiles: Vec<Profile>,
    },
}

impl DashboardSnapshot {
    pub fn reports(&self) -> &[IncidentReport] {
        match self {
            DashboardSnapshot::User { reports, .. } | DashboardSnapshot::Officer { reports, .. } => reports,
        }
    }

    pub fn notifications(&self) -> &[DistressNotification] {
        match self {
            DashboardSnapshot::User { notifications, .. }
            | DashboardSnapshot::Officer { notifications, .. } => notifications,
        }
    }
}

/// Citizen view
#[derive(Clone)]
pub struct UserDashboard {
    service: Arc<IncidentService>,
    session: Session,
}

impl UserDashboard {
    pub fn new(service: Arc<IncidentService>, session: Session) -> Self {
        Self { service, session }
    }

    pub async fn snapshot(&self) -> Result<DashboardSnapshot> {
        let (profile, reports, notifications) = tokio::try_join!(
            self.service.me(&self.session),
            self.service.list_reports(&self.session),
            self.service.list_notifications(&self.session),
        )?;
        Ok(DashboardSnapshot::User {
            profile,
            reports,
            notifications,
        })
    }

    pub async fn submit_report(
        &self,
        form: NewIncidentReport,
        video: Option<VideoUpload>,
    ) -> Result<SubmittedReport> {
        self.service
            .submit_report_with_video(&self.session, form, video)
            .await
    }

    pub async fn acknowledge(&self, notification_id: Uuid) -> Result<DistressNotification> {
        self.service.acknowledge(&self.session, notification_id).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        self.service
            .update_profile(&self.session, self.session.principal_id, update)
            .await
    }

    /// Wake on distress notifications addressed to this principal
    pub fn live(&self) -> LiveFeed {
        let filter = ChangeFilter::table(Table::DistressNotifications)
            .eq("user_id", self.session.principal_id);
        LiveFeed::new(Dashboard::User(self.clone()), filter)
    }
}

/// Officer view
#[derive(Clone)]
pub struct OfficerDashboard {
    service: Arc<IncidentService>,
    session: Session,
}

impl OfficerDashboard {
    pub fn new(service: Arc<IncidentService>, session: Session) -> Self {
        Self { service, session }
    }

    pub async fn snapshot(&self) -> Result<DashboardSnapshot> {
        let (reports, notifications, profiles) = tokio::try_join!(
            self.service.list_reports(&self.session),
            self.service.list_notifications(&self.session),
            self.service.list_profiles(&self.session),
        )?;
        Ok(DashboardSnapshot::Officer {
            reports,
            notifications,
            profiles,
        })
    }

    pub async fn set_status(&self, report_id: Uuid, status: IncidentStatus) -> Result<IncidentReport> {
        self.service
            .set_report_status(&self.session, report_id, status)
            .await
    }

    pub async fn update_report(&self, report_id: Uuid, patch: &IncidentPatch) -> Result<IncidentReport> {
        self.service
            .update_report(&self.session, report_id, patch)
            .await
    }

    pub async fn send_distress(&self, request: NewDistressNotification) -> Result<DistressNotification> {
        self.service.send_distress(&self.session, request).await
    }

    /// Wake on every new incident report
    pub fn live(&self) -> LiveFeed {
        LiveFeed::new(
            Dashboard::Officer(self.clone()),
            ChangeFilter::table(Table::IncidentReports),
        )
    }
}

/// Dashboard chosen by role
#[derive(Clone)]
pub enum Dashboard {
    User(UserDashboard),
    Officer(OfficerDashboard),
}

impl Dashboard {
    pub fn session(&self) -> &Session {
        match self {
            Dashboard::User(d) => &d.session,
            Dashboard::Officer(d) => &d.session,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Dashboard::User(_) => Role::User,
            Dashboard::Officer(_) => Role::Officer,
        }
    }

    pub async fn snapshot(&self) -> Result<DashboardSnapshot> {
        match self {
            Dashboard::User(d) => d.snapshot().await,
            Dashboard::Officer(d) => d.snapshot().await,
        }
    }

    pub fn live(&self) -> LiveFeed {
        match self {
            Dashboard::User(d) => d.live(),
            Dashboard::Officer(d) => d.live(),
        }
    }
}

/// Pick the dashboard for the session's current role
pub async fn open_dashboard(service: Arc<IncidentService>, session: Session) -> Result<Dashboard> {
    let caller = service.caller(&session).await?;
    debug!(principal = %caller.id, role = %caller.role, "Opening dashboard");
    Ok(match caller.role {
        Role::Officer => Dashboard::Officer(OfficerDashboard::new(service, session)),
        Role::User => Dashboard::User(UserDashboard::new(service, session)),
    })
}

/// Subscribe-and-re-fetch loop for one dashboard
pub struct LiveFeed {
    dashboard: Dashboard,
    subscription: Subscription,
}

impl LiveFeed {
    fn new(dashboard: Dashboard, filter: ChangeFilter) -> Self {
        let subscription = dashboard_hub(&dashboard).subscribe(filter);
        Self {
            dashboard,
            subscription,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Wait for the next matching change. Cancel-safe.
    pub async fn next_signal(&mut self) -> Option<Signal> {
        self.subscription.next().await
    }

    /// Re-fetch the whole view
    pub async fn refresh(&self) -> Result<DashboardSnapshot> {
        self.dashboard.snapshot().await
    }

    /// Wait for a change and re-fetch. `None` once the hub is gone.
    pub async fn next_refresh(&mut self) -> Option<Result<DashboardSnapshot>> {
        match self.next_signal().await? {
            Signal::Insert(event) => debug!(table = %event.table, "Change signal, refreshing"),
            Signal::Lagged(skipped) => debug!(skipped, "Feed lagged, refreshing"),
        }
        Some(self.refresh().await)
    }
}

fn dashboard_hub(dashboard: &Dashboard) -> &crate::realtime::ChangeHub {
    match dashboard {
        Dashboard::User(d) => d.service.hub().as_ref(),
        Dashboard::Officer(d) => d.service.hub().as_ref(),
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("role", &self.role())
            .field("principal", &self.session().principal_id)
            .finish()
    }
}
