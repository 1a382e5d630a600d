use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use super::layout::{StorageLayout, StorageLocation};
use super::listing::{walk_files, WalkedFile};
use super::mime_table::{mime_for_extension, mime_for_path};
use super::models::{FileListQuery, FileUpload, StoredFile};
use super::validation::FileValidator;

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Persists bytes at `target`, creating `dir` first. Writers must refuse to
/// overwrite an existing file.
#[async_trait]
pub trait FileWriter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, dir: &Path, target: &Path, data: Bytes) -> Result<()>;
}

/// Primary writer on tokio's async filesystem API.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncFileWriter;

#[async_trait]
impl FileWriter for AsyncFileWriter {
    fn name(&self) -> &'static str {
        "async"
    }

    async fn write(&self, dir: &Path, target: &Path, data: Bytes) -> Result<()> {
        async_fs::create_dir_all(dir).await?;

        let mut file = async_fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target)
            .await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        Ok(())
    }
}

/// Fallback writer: plain `std::fs` calls on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectFileWriter;

#[async_trait]
impl FileWriter for DirectFileWriter {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn write(&self, dir: &Path, target: &Path, data: Bytes) -> Result<()> {
        let dir = dir.to_path_buf();
        let target = target.to_path_buf();

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)?;
            file.write_all(&data)?;
            file.flush()
        })
        .await
        .map_err(|e| AppError::Storage(format!("Direct write task failed: {}", e)))??;

        Ok(())
    }
}

#[derive(Clone)]
pub struct FileStore {
    layout: StorageLayout,
    validator: FileValidator,
    ids: Arc<dyn IdGenerator>,
    primary: Arc<dyn FileWriter>,
    fallback: Arc<dyn FileWriter>,
}

impl FileStore {
    pub fn new(layout: StorageLayout, validator: FileValidator) -> Self {
        Self {
            layout,
            validator,
            ids: Arc::new(UuidGenerator),
            primary: Arc::new(AsyncFileWriter),
            fallback: Arc::new(DirectFileWriter),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            StorageLayout::from_config(config),
            FileValidator::with_max_size(config.max_upload_size_bytes() as u64),
        )
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_writers(mut self, primary: Arc<dyn FileWriter>, fallback: Arc<dyn FileWriter>) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub async fn initialize(&self) -> Result<()> {
        async_fs::create_dir_all(self.layout.uploads_root()).await?;
        Ok(())
    }

    pub async fn store(&self, upload: FileUpload) -> Result<StoredFile> {
        self.validator
            .validate_upload(&upload.original_name, upload.data.len() as u64)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let location = self.layout.locate(upload.user_id.as_deref(), upload.file_type)?;
        let dir = self.layout.absolute_dir(&location);

        let id = self.ids.next_id();
        let extension = self.validator.stored_extension(&upload.original_name);
        let file_name = match &extension {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.clone(),
        };
        let target = dir.join(&file_name);

        if let Err(primary_err) = self.primary.write(&dir, &target, upload.data.clone()).await {
            if is_collision(&primary_err) {
                return Err(AppError::Storage(format!(
                    "File id collision at {}",
                    target.display()
                )));
            }

            tracing::warn!(
                writer = self.primary.name(),
                path = %target.display(),
                "Primary write failed, retrying with {} writer: {}",
                self.fallback.name(),
                primary_err
            );
            discard_partial(&target).await;

            if let Err(fallback_err) = self.fallback.write(&dir, &target, upload.data.clone()).await {
                tracing::error!(
                    writer = self.fallback.name(),
                    path = %target.display(),
                    "Fallback write failed: {}",
                    fallback_err
                );
                if !is_collision(&fallback_err) {
                    discard_partial(&target).await;
                }
                return Err(fallback_err);
            }
        }

        let mime_type = upload
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| match &extension {
                Some(ext) => mime_for_extension(ext),
                None => mime::APPLICATION_OCTET_STREAM.to_string(),
            });

        tracing::info!(
            file_id = %id,
            user_id = ?upload.user_id,
            size = upload.data.len(),
            "Stored upload {}",
            file_name
        );

        Ok(StoredFile {
            path: self.layout.relative_path(&location, &[file_name.as_str()]),
            url: self.layout.public_url(&location, &[file_name.as_str()]),
            id,
            original_name: upload.original_name,
            file_name,
            mime_type,
            size: upload.data.len() as u64,
            created_at: Utc::now(),
            user_id: upload.user_id,
            song_id: upload.song_id,
        })
    }

    pub async fn list(&self, query: &FileListQuery) -> Result<Vec<StoredFile>> {
        let user_id = query.requested_user();
        let location = self.layout.locate_listing(user_id, query.file_type())?;
        let root = self.layout.absolute_dir(&location);

        let exclude = if user_id.is_none() && location.is_root() {
            Some(self.layout.users_dir())
        } else {
            None
        };

        let walked = walk_files(&root, exclude.as_deref()).await?;

        Ok(walked
            .into_iter()
            .map(|file| self.listed_record(&location, file, user_id))
            .collect())
    }

    fn listed_record(&self, location: &StorageLocation, file: WalkedFile, user_id: Option<&str>) -> StoredFile {
        let sub_path: Vec<&str> = file.relative.iter().map(String::as_str).collect();
        let file_name = file.relative.last().cloned().unwrap_or_default();
        let id = file
            .absolute
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());

        StoredFile {
            id,
            original_name: file_name.clone(),
            mime_type: mime_for_path(&file.absolute),
            size: file.size,
            path: self.layout.relative_path(location, &sub_path),
            url: self.layout.public_url(location, &sub_path),
            created_at: file.created_at,
            user_id: user_id.map(str::to_string),
            song_id: None,
            file_name,
        }
    }
}

fn is_collision(err: &AppError) -> bool {
    matches!(err, AppError::IoError(e) if e.kind() == ErrorKind::AlreadyExists)
}

/// Removes whatever a failed writer left at `target`.
async fn discard_partial(target: &Path) {
    match async_fs::remove_file(target).await {
        Ok(()) => tracing::warn!(path = %target.display(), "Removed partially written file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::error!(
            path = %target.display(),
            "Failed to remove partially written file: {}",
            e
        ),
    }
}
