//! Credential collection

use bson::{doc, Document};
use mongodb::options::IndexOptions;

use crate::db::mongo::IntoIndexes;
use crate::models::Credential;

/// Collection name for credentials
pub const CREDENTIAL_COLLECTION: &str = "credentials";

impl IntoIndexes for Credential {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "principal_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("principal_id_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
