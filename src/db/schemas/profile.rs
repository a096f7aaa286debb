//! Profile collection

use bson::{doc, Document};
use mongodb::options::IndexOptions;

use crate::db::mongo::IntoIndexes;
use crate::models::Profile;

/// Collection name for profiles
pub const PROFILE_COLLECTION: &str = "profiles";

impl IntoIndexes for Profile {
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
            // Officer dashboards list by role
            (
                doc! { "role": 1 },
                Some(IndexOptions::builder().name("role_index".to_string()).build()),
            ),
        ]
    }
}
