//! Distress notification collection

use bson::{doc, Document};
use mongodb::options::IndexOptions;

use crate::db::mongo::IntoIndexes;
use crate::models::DistressNotification;

/// Collection name for distress notifications
pub const NOTIFICATION_COLLECTION: &str = "distress_notifications";

impl IntoIndexes for DistressNotification {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1 },
                Some(IndexOptions::builder().name("user_id_index".to_string()).build()),
            ),
            // Cascade delete with the incident
            (
                doc! { "incident_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("incident_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
