//! Directory classification for the public uploads tree.
//!
//! Authenticated files live under `users/{userId}/{audio|images|misc}`;
//! anonymous files go to `audio/`, `images/` or the uploads root.

use std::path::PathBuf;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use super::models::FileType;

pub const USERS_DIR: &str = "users";

#[derive(Debug, Clone)]
pub struct StorageLayout {
    public_dir: PathBuf,
    uploads_dir: String,
}

/// A directory inside the uploads tree, as relative path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    segments: Vec<String>,
}

impl StorageLocation {
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl StorageLayout {
    pub fn new(public_dir: impl Into<PathBuf>, uploads_dir: impl Into<String>) -> Self {
        Self {
            public_dir: public_dir.into(),
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.public_dir.clone(), config.uploads_dir.clone())
    }

    pub fn uploads_root(&self) -> PathBuf {
        self.public_dir.join(&self.uploads_dir)
    }

    pub fn uploads_url_prefix(&self) -> String {
        format!("/{}", self.uploads_dir)
    }

    pub fn locate(&self, user_id: Option<&str>, file_type: FileType) -> Result<StorageLocation> {
        let segments = match user_id {
            Some(user_id) => {
                validate_user_segment(user_id)?;
                let category = match file_type {
                    FileType::Audio => "audio",
                    FileType::Image => "images",
                    FileType::Other => "misc",
                };
                vec![USERS_DIR.to_string(), user_id.to_string(), category.to_string()]
            }
            None => match file_type {
                FileType::Audio => vec!["audio".to_string()],
                FileType::Image => vec!["images".to_string()],
                FileType::Other => Vec::new(),
            },
        };

        Ok(StorageLocation { segments })
    }

    /// Like [`locate`](Self::locate), but a missing file type selects the
    /// whole `users/{userId}` tree (or the uploads root when anonymous).
    pub fn locate_listing(
        &self,
        user_id: Option<&str>,
        file_type: Option<FileType>,
    ) -> Result<StorageLocation> {
        match (user_id, file_type) {
            (Some(user_id), None) => {
                validate_user_segment(user_id)?;
                Ok(StorageLocation {
                    segments: vec![USERS_DIR.to_string(), user_id.to_string()],
                })
            }
            (user_id, Some(file_type)) => self.locate(user_id, file_type),
            (None, None) => self.locate(None, FileType::Other),
        }
    }

    pub fn absolute_dir(&self, location: &StorageLocation) -> PathBuf {
        location
            .segments
            .iter()
            .fold(self.uploads_root(), |dir, segment| dir.join(segment))
    }

    /// The per-user subtree, which anonymous root listings must not expose.
    pub fn users_dir(&self) -> PathBuf {
        self.uploads_root().join(USERS_DIR)
    }

    /// Path relative to the public directory, `/`-separated.
    pub fn relative_path(&self, location: &StorageLocation, sub_path: &[&str]) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(1 + location.segments.len() + sub_path.len());
        parts.push(&self.uploads_dir);
        parts.extend(location.segments.iter().map(String::as_str));
        parts.extend_from_slice(sub_path);
        parts.join("/")
    }

    pub fn public_url(&self, location: &StorageLocation, sub_path: &[&str]) -> String {
        format!("/{}", self.relative_path(location, sub_path))
    }
}

fn validate_user_segment(user_id: &str) -> Result<()> {
    let invalid = user_id.is_empty()
        || user_id == "."
        || user_id == ".."
        || user_id.chars().any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control());

    if invalid {
        return Err(AppError::BadRequest("Invalid user identifier".to_string()));
    }

    Ok(())
}
