//! Upload storage: where uploaded files land and how they are written

use axum::extract::multipart::Field;
use axum::http::StatusCode;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::AppConfig;
use crate::error::{Error, Result};

/// Reduce a client-supplied filename to its final path component.
///
/// Both `/` and `\` count as separators. Names that end up empty, `.` or `..`
/// are rejected.
pub fn sanitize_filename(raw: &str) -> Result<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::bad_request(format!("Invalid filename: {:?}", raw)));
    }
    Ok(name.to_string())
}

/// Directory that receives uploads
#[derive(Debug, Clone)]
pub struct UploadStore {
    upload_dir: PathBuf,
    max_upload_size: u64,
}

impl UploadStore {
    pub fn new(upload_dir: impl Into<PathBuf>, max_upload_size: u64) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_upload_size,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.storage.upload_dir.clone(),
            config.server.max_upload_size,
        )
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Create the upload directory if needed
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }

    /// Storage path for a client filename. Same name, same path.
    pub fn path_for(&self, raw_filename: &str) -> Result<PathBuf> {
        Ok(self.upload_dir.join(sanitize_filename(raw_filename)?))
    }

    /// Open `path` for writing, truncating an existing file
    pub async fn create(&self, path: impl Into<PathBuf>) -> Result<UploadWriter> {
        let path = path.into();
        let file = File::create(&path).await?;
        Ok(UploadWriter {
            path,
            file,
            written: 0,
            limit: self.max_upload_size,
        })
    }

    /// Stream one multipart field to `path`, chunk by chunk.
    ///
    /// On any failure the partial file is removed.
    pub async fn persist_field(&self, mut field: Field<'_>, path: &Path) -> Result<u64> {
        let mut writer = self.create(path).await?;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    writer.discard().await;
                    return Err(if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        Error::TooLarge {
                            declared: self.max_upload_size.saturating_add(1),
                            limit: self.max_upload_size,
                        }
                    } else {
                        Error::bad_request(format!("Failed to read upload: {}", e.body_text()))
                    });
                }
            };

            if let Err(e) = writer.write_chunk(&chunk).await {
                writer.discard().await;
                return Err(e);
            }
        }

        writer.finish().await
    }
}

/// An upload being written to disk, capped at the store's size limit
#[derive(Debug)]
pub struct UploadWriter {
    path: PathBuf,
    file: File,
    written: u64,
    limit: u64,
}

impl UploadWriter {
    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let total = self.written.saturating_add(chunk.len() as u64);
        if total > self.limit {
            return Err(Error::TooLarge {
                declared: total,
                limit: self.limit,
            });
        }
        self.file.write_all(chunk).await?;
        self.written = total;
        Ok(())
    }

    /// Flush to disk and return the number of bytes written
    pub async fn finish(mut self) -> Result<u64> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(self.written)
    }

    /// Drop the partial file
    pub async fn discard(self) {
        let Self { path, file, .. } = self;
        drop(file);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove partial upload {}: {}", path.display(), e);
        }
    }
}
