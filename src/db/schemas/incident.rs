//! Incident report collection

use bson::{doc, Document};
use mongodb::options::IndexOptions;

use crate::db::mongo::IntoIndexes;
use crate::models::IncidentReport;

/// Collection name for incident reports
pub const INCIDENT_COLLECTION: &str = "incident_reports";

impl IntoIndexes for IncidentReport {
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
                doc! { "reporter_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("reporter_id_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "assigned_officer_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("assigned_officer_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
