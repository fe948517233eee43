use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mime::Mime;

/// Object storage the uploader writes listing media into.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return a publicly resolvable URI.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &Mime)
        -> Result<String, StorageError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Network hiccups and 5xx responses; worth another attempt.
    #[error("storage temporarily unavailable: {0}")]
    Transient(String),
    #[error("storage rejected the object: {0}")]
    Rejected(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process object store serving URIs under a public base URL.
#[derive(Debug)]
pub struct MemoryBlobStore {
    public_base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn uri_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &Mime,
    ) -> Result<String, StorageError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Rejected("blob store lock poisoned".to_string()))?;
        if objects.contains_key(key) {
            return Err(StorageError::Rejected(format!("object {key} already exists")));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.essence_str().to_string(),
            },
        );
        Ok(self.uri_for(key))
    }
}
