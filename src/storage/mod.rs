//! Evidence storage

pub mod video;

pub use video::{StoredVideo, VideoContent, VideoStore, VideoStoreConfig, DEFAULT_MAX_VIDEO_BYTES};
