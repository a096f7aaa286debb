//! Video upload and retrieval
//!
//! Videos belong to the uploading principal and follow the incident report
//! read rule: the owner and officers may fetch them.

use uuid::Uuid;

use super::IncidentService;
use crate::auth::{Session, Table};
use crate::storage::{StoredVideo, VideoContent};
use crate::types::{Result, WatchpostError};

impl IncidentService {
    pub async fn upload_video(
        &self,
        session: &Session,
        content_type: &str,
        data: &[u8],
    ) -> Result<StoredVideo> {
        let caller = self.caller(session).await?;
        self.videos.put(caller.id, content_type, data).await
    }

    pub async fn open_video(
        &self,
        session: &Session,
        owner: Uuid,
        file_name: &str,
    ) -> Result<VideoContent> {
        let caller = self.caller(session).await?;
        if !Self::can_read(Table::IncidentReports, &caller, owner) {
            return Err(WatchpostError::NotFound(format!("video {owner}/{file_name}")));
        }
        self.videos.open(owner, file_name).await
    }
}
