use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs as async_fs;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct WalkedFile {
    pub absolute: PathBuf,
    /// Path components below the walk root.
    pub relative: Vec<String>,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Collects every regular file below `root`. A missing root yields an empty
/// list; `exclude` prunes one subtree. Symlinks are not followed.
pub async fn walk_files(root: &Path, exclude: Option<&Path>) -> Result<Vec<WalkedFile>> {
    match async_fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(Vec::new()),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    }

    let mut files = Vec::new();
    let mut pending: Vec<(PathBuf, Vec<String>)> = vec![(root.to_path_buf(), Vec::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let mut entries = match async_fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // Removed between listing the parent and descending into it.
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if exclude.is_some_and(|excluded| path.as_path() == excluded) {
                continue;
            }

            let file_type = entry.file_type().await?;
            let mut relative = prefix.clone();
            relative.push(entry.file_name().to_string_lossy().into_owned());

            if file_type.is_dir() {
                pending.push((path, relative));
            } else if file_type.is_file() {
                let metadata = entry.metadata().await?;
                let created_at = metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());

                files.push(WalkedFile {
                    absolute: path,
                    relative,
                    size: metadata.len(),
                    created_at,
                });
            }
        }
    }

    Ok(files)
}
