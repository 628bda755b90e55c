use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use capture_core::models::{CaptureResult, DispatchOutcome, OutboundPayload};
use capture_core::{AppError, LocalHandler};
use capture_processing::codec::{decode_data_url, extension_for_mime};

use crate::error::{StorageError, StorageResult};

/// Local handler that writes every capture outcome to a directory.
///
/// Images land as `{uuid}.{ext}`, forwarded upstream responses as
/// `{uuid}.json` and failures as `{uuid}.error.json`.
#[derive(Clone, Debug)]
pub struct DiskSink {
    base_path: PathBuf,
}

impl DiskSink {
    /// Create the sink, creating `base_path` if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create capture directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `outcome` to a new file and return its path.
    pub async fn save(&self, outcome: &DispatchOutcome) -> StorageResult<PathBuf> {
        let (data, extension) = match outcome {
            Ok(CaptureResult::Payload(OutboundPayload::Binary(bytes))) => {
                (bytes.clone(), sniff_extension(bytes))
            }
            Ok(CaptureResult::Payload(OutboundPayload::DataUrl(url))) => match decode_data_url(url) {
                Ok((mime, bytes)) => (bytes, extension_for_mime(&mime)),
                Err(e) => {
                    tracing::debug!(error = %e, "Payload is not a data URL, saving as text");
                    (Bytes::from(url.clone()), "txt")
                }
            },
            Ok(CaptureResult::Forwarded(value)) => {
                (Bytes::from(serde_json::to_vec_pretty(value)?), "json")
            }
            Err(failure) => (Bytes::from(serde_json::to_vec_pretty(failure)?), "error.json"),
        };

        let path = self
            .base_path
            .join(format!("{}.{}", Uuid::new_v4(), extension));
        self.write(&path, &data).await?;

        tracing::info!(
            path = %path.display(),
            size_bytes = data.len(),
            "Capture saved to disk"
        );

        Ok(path)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl LocalHandler for DiskSink {
    async fn deliver(&self, outcome: DispatchOutcome) -> Result<(), AppError> {
        self.save(&outcome).await?;
        Ok(())
    }
}

/// Extension for raw image bytes, from their magic number.
fn sniff_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else {
        "bin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_core::models::DispatchFailure;
    use tempfile::TempDir;

    const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

    #[tokio::test]
    async fn test_saves_raw_payload() {
        let dir = TempDir::new().unwrap();
        let sink = DiskSink::new(dir.path()).await.unwrap();

        let outcome: DispatchOutcome = Ok(CaptureResult::Payload(OutboundPayload::Binary(
            Bytes::from_static(&PNG_MAGIC),
        )));
        let path = sink.save(&outcome).await.unwrap();

        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(fs::read(&path).await.unwrap(), PNG_MAGIC);
    }

    #[tokio::test]
    async fn test_decodes_data_url() {
        let dir = TempDir::new().unwrap();
        let sink = DiskSink::new(dir.path()).await.unwrap();

        let outcome: DispatchOutcome = Ok(CaptureResult::Payload(OutboundPayload::DataUrl(
            "data:image/jpeg;base64,iVBORw==".to_string(),
        )));
        let path = sink.save(&outcome).await.unwrap();

        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(fs::read(&path).await.unwrap(), PNG_MAGIC);
    }

    #[tokio::test]
    async fn test_saves_forwarded_response_and_failure() {
        let dir = TempDir::new().unwrap();
        let sink = DiskSink::new(dir.path()).await.unwrap();

        let forwarded: DispatchOutcome =
            Ok(CaptureResult::Forwarded(serde_json::json!({"id": "abc"})));
        let path = sink.save(&forwarded).await.unwrap();
        assert!(path.to_string_lossy().ends_with(".json"));
        let saved: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(saved["id"], "abc");

        let failed: DispatchOutcome = Err(DispatchFailure {
            code: "UPSTREAM_HTTP_ERROR".to_string(),
            message: "boom".to_string(),
        });
        let path = sink.save(&failed).await.unwrap();
        assert!(path.to_string_lossy().ends_with(".error.json"));
    }

    #[tokio::test]
    async fn test_deliver_reports_disk_write_error() {
        let dir = TempDir::new().unwrap();
        let sink = DiskSink::new(dir.path().join("captures")).await.unwrap();
        fs::remove_dir_all(sink.base_path()).await.unwrap();

        let err = sink
            .deliver(Ok(CaptureResult::Payload(OutboundPayload::Binary(
                Bytes::from_static(b"x"),
            ))))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DiskWriteError(_)));
    }

    #[test]
    fn test_sniff_extension() {
        assert_eq!(sniff_extension(&PNG_MAGIC), "png");
        assert_eq!(sniff_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(sniff_extension(b"RIFF\0\0\0\0WEBPVP8 "), "webp");
        assert_eq!(sniff_extension(b"hello"), "bin");
    }
}
