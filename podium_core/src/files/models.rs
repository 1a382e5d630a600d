use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing a file persisted under the public uploads tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub original_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub path: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub song_id: Option<String>,
}

/// Declared kind of an upload, taken from the `fileType` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Audio,
    Image,
    Other,
}

impl FileType {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("audio") => FileType::Audio,
            Some(t) if t.eq_ignore_ascii_case("image") => FileType::Image,
            _ => FileType::Other,
        }
    }
}

#[derive(Debug)]
pub struct FileUpload {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
    pub file_type: FileType,
    pub user_id: Option<String>,
    pub song_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListQuery {
    pub user_id: Option<String>,
    pub file_type: Option<String>,
}

impl FileListQuery {
    /// `None` when no `fileType` was given, which widens the listing to the
    /// whole user (or anonymous) tree.
    pub fn file_type(&self) -> Option<FileType> {
        self.file_type
            .as_deref()
            .filter(|tag| !tag.trim().is_empty())
            .map(|tag| FileType::from_tag(Some(tag)))
    }

    /// Treats `?userId=` the same as an absent parameter.
    pub fn requested_user(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }
}
