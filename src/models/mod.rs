//! Row types for the three stores

mod credential;
mod incident;
mod notification;
mod profile;
pub(crate) mod uuid_str;

pub use credential::{normalize_email, validate_email, Credential};
pub use incident::{
    IncidentCategory, IncidentPatch, IncidentReport, IncidentStatus, NewIncidentReport,
    MAX_TITLE_LEN, MIN_DESCRIPTION_LEN,
};
pub use notification::{DistressNotification, NewDistressNotification, NotificationStatus};
pub use profile::{Profile, ProfileUpdate, RegistrationMetadata, Role};
