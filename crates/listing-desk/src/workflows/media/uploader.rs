use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::key::object_key;
use super::policy::{MediaKind, MediaLimits, MediaValidationError};
use super::retry::RetryPolicy;
use super::store::{BlobStore, StorageError};
use crate::workflows::listings::UserId;

/// One file handed to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// A stored attachment, ready to be embedded in a listing payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedMedia {
    pub file_name: String,
    pub kind: MediaKind,
    pub content_type: String,
    pub key: String,
    pub uri: String,
    pub size: u64,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Invalid(#[from] MediaValidationError),
    #[error("'{file_name}' was refused by storage: {source}")]
    Rejected {
        file_name: String,
        source: StorageError,
    },
    #[error("'{file_name}' failed after {attempts} attempts: {source}")]
    Exhausted {
        file_name: String,
        attempts: u32,
        source: StorageError,
    },
    #[error("upload of '{file_name}' stopped before finishing")]
    Aborted { file_name: String },
}

impl UploadError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// Validates, names, and stores listing attachments with retry on transient failures.
pub struct MediaUploader<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    limits: MediaLimits,
}

impl<S> MediaUploader<S>
where
    S: BlobStore + 'static,
{
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self::with_limits(store, retry, MediaLimits::default())
    }

    pub fn with_limits(store: Arc<S>, retry: RetryPolicy, limits: MediaLimits) -> Self {
        Self {
            store,
            retry,
            limits,
        }
    }

    pub fn limits(&self) -> &MediaLimits {
        &self.limits
    }

    pub async fn upload(
        &self,
        user: &UserId,
        upload: MediaUpload,
    ) -> Result<UploadedMedia, UploadError> {
        upload_one(
            Arc::clone(&self.store),
            self.retry,
            self.limits,
            *user,
            upload,
        )
        .await
    }

    /// Upload every file concurrently. Results come back in input order and each
    /// file succeeds or fails on its own.
    pub async fn upload_batch(
        &self,
        user: &UserId,
        uploads: Vec<MediaUpload>,
    ) -> Vec<Result<UploadedMedia, UploadError>> {
        let names: Vec<String> = uploads
            .iter()
            .map(|upload| upload.file_name.clone())
            .collect();
        let mut results: Vec<Option<Result<UploadedMedia, UploadError>>> =
            names.iter().map(|_| None).collect();

        let mut tasks = JoinSet::new();
        for (index, upload) in uploads.into_iter().enumerate() {
            let store = Arc::clone(&self.store);
            let retry = self.retry;
            let limits = self.limits;
            let user = *user;
            tasks.spawn(async move { (index, upload_one(store, retry, limits, user, upload).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(err) => warn!(error = %err, "media upload task failed"),
            }
        }

        results
            .into_iter()
            .zip(names)
            .map(|(outcome, file_name)| {
                outcome.unwrap_or(Err(UploadError::Aborted { file_name }))
            })
            .collect()
    }
}

async fn upload_one<S>(
    store: Arc<S>,
    retry: RetryPolicy,
    limits: MediaLimits,
    user: UserId,
    upload: MediaUpload,
) -> Result<UploadedMedia, UploadError>
where
    S: BlobStore + ?Sized,
{
    let MediaUpload { file_name, bytes } = upload;
    let size = bytes.len() as u64;
    let info = limits.inspect(&file_name, size)?;
    if info.large {
        warn!(file_name = %file_name, size, "large video upload, consider compressing");
    }

    let key = object_key(&user, Utc::now(), &info.extension);
    let mut attempt = 1;
    loop {
        match store.put(&key, bytes.clone(), &info.content_type).await {
            Ok(uri) => {
                info!(user = %user, key = %key, kind = info.kind.label(), attempt, "media stored");
                return Ok(UploadedMedia {
                    file_name,
                    kind: info.kind,
                    content_type: info.content_type.essence_str().to_string(),
                    key,
                    uri,
                    size,
                    attempts: attempt,
                });
            }
            Err(source) if !source.is_transient() => {
                warn!(key = %key, error = %source, "media upload rejected");
                return Err(UploadError::Rejected { file_name, source });
            }
            Err(source) if attempt >= retry.max_attempts() => {
                warn!(key = %key, attempts = attempt, error = %source, "media upload gave up");
                return Err(UploadError::Exhausted {
                    file_name,
                    attempts: attempt,
                    source,
                });
            }
            Err(source) => {
                let delay = retry.delay(attempt);
                warn!(
                    key = %key,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %source,
                    "media upload failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::media::MemoryBlobStore;

    #[tokio::test]
    async fn validation_failures_are_not_sent_to_storage() {
        let store = Arc::new(MemoryBlobStore::new("http://localhost/media"));
        let uploader = MediaUploader::new(Arc::clone(&store), RetryPolicy::none());

        let err = uploader
            .upload(&UserId::new(), MediaUpload::new("empty.png", Vec::new()))
            .await
            .expect_err("empty file");

        assert!(err.is_validation());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn stored_media_reports_its_uri() {
        let store = Arc::new(MemoryBlobStore::new("http://localhost/media"));
        let uploader = MediaUploader::new(Arc::clone(&store), RetryPolicy::none());
        let user = UserId::new();

        let uploaded = uploader
            .upload(&user, MediaUpload::new("Lobby.JPG", vec![0xff, 0xd8, 0xff]))
            .await
            .expect("stored");

        assert_eq!(uploaded.kind, MediaKind::Image);
        assert_eq!(uploaded.content_type, "image/jpeg");
        assert!(uploaded.key.starts_with(&format!("{user}/")));
        assert!(uploaded.key.ends_with(".jpg"));
        assert_eq!(uploaded.uri, store.uri_for(&uploaded.key));
        assert_eq!(uploaded.attempts, 1);
    }
}
