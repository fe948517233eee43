//! Listing media intake: type and size checks, object naming, and storage with
//! retry on transient failures.

mod key;
mod policy;
mod retry;
pub mod router;
mod store;
mod uploader;

pub use key::object_key;
pub use policy::{classify, MediaInfo, MediaKind, MediaLimits, MediaValidationError};
pub use retry::RetryPolicy;
pub use router::media_router;
pub use store::{BlobStore, MemoryBlobStore, StorageError, StoredObject};
pub use uploader::{MediaUpload, MediaUploader, UploadError, UploadedMedia};
