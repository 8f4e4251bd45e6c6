//! Local filesystem blob store: save, stream, and delete uploaded files by
//! relative path. Paths stored in the database are always relative to the
//! configured root.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the storage root exists.
    pub async fn init(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Persist a blob and return its relative path. The stored name is a
    /// fresh UUID prefixed onto a sanitized copy of the original file name,
    /// so uploads never collide or escape the root.
    pub async fn save(&self, data: &[u8], original_name: &str) -> Result<String, AppError> {
        let file_name = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original_name));
        let path = self.root.join(&file_name);

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(file_name)
    }

    /// Open a saved blob as a byte stream.
    pub async fn open_stream(
        &self,
        relative_path: &str,
    ) -> Result<ReaderStream<fs::File>, AppError> {
        let path = self.resolve(relative_path)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|_| AppError::NotFound("File not found in storage".to_string()))?;

        Ok(ReaderStream::new(file))
    }

    /// Remove a saved blob. Missing files are treated as already deleted.
    pub async fn delete(&self, relative_path: &str) -> Result<(), AppError> {
        let path = self.resolve(relative_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, relative_path: &str) -> Result<PathBuf, AppError> {
        // Stored paths are single flat file names; anything else is a
        // corrupted row, not a client error.
        if Path::new(relative_path).components().count() != 1 {
            return Err(AppError::Internal(format!(
                "Invalid storage path: {}",
                relative_path
            )));
        }

        Ok(self.root.join(relative_path))
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("my report (v2).docx"), "my_report__v2_.docx");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[tokio::test]
    async fn test_save_stream_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        storage.init().await.unwrap();

        let path = storage.save(b"hello world", "greeting.txt").await.unwrap();
        assert!(path.ends_with("greeting.txt"));

        let mut stream = storage.open_stream(&path).await.unwrap();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(bytes, b"hello world");

        storage.delete(&path).await.unwrap();
        assert!(storage.open_stream(&path).await.is_err());
        // Deleting again is a no-op
        storage.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        assert!(storage.open_stream("../outside.txt").await.is_err());
    }
}
