use std::path::Path;

use mime::Mime;
use serde::Serialize;

const MB: u64 = 1024 * 1024;

/// Attachment families accepted on listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Pdf,
    Document,
}

impl MediaKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Pdf => "pdf",
            Self::Document => "document",
        }
    }
}

/// Per-kind upload size ceilings, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaLimits {
    pub image: u64,
    pub video: u64,
    pub video_warning: u64,
    pub pdf: u64,
    pub document: u64,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            image: 10 * MB,
            video: 100 * MB,
            video_warning: 50 * MB,
            pdf: 10 * MB,
            document: 25 * MB,
        }
    }
}

impl MediaLimits {
    pub fn max_bytes(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.image,
            MediaKind::Video => self.video,
            MediaKind::Pdf => self.pdf,
            MediaKind::Document => self.document,
        }
    }

    /// Largest body any single upload may carry.
    pub fn largest(&self) -> u64 {
        self.image.max(self.video).max(self.pdf).max(self.document)
    }

    /// Check `file_name` and `size` against the accepted kinds and their limits.
    pub fn inspect(&self, file_name: &str, size: u64) -> Result<MediaInfo, MediaValidationError> {
        let info = classify(file_name)?;
        if size == 0 {
            return Err(MediaValidationError::Empty {
                file_name: file_name.to_string(),
            });
        }

        let limit = self.max_bytes(info.kind);
        if size > limit {
            return Err(MediaValidationError::TooLarge {
                file_name: file_name.to_string(),
                kind: info.kind,
                size,
                limit,
            });
        }

        Ok(MediaInfo {
            large: info.kind == MediaKind::Video && size > self.video_warning,
            ..info
        })
    }
}

/// Result of classifying an upload by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub kind: MediaKind,
    pub content_type: Mime,
    pub extension: String,
    /// Set for videos past the soft warning threshold.
    pub large: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaValidationError {
    #[error("'{file_name}' has no file extension")]
    MissingExtension { file_name: String },
    #[error("'{file_name}' has unsupported type {content_type}")]
    Unsupported {
        file_name: String,
        content_type: String,
    },
    #[error("'{file_name}' is empty")]
    Empty { file_name: String },
    #[error("'{file_name}' is {size} bytes, {} uploads are limited to {limit} bytes", kind.label())]
    TooLarge {
        file_name: String,
        kind: MediaKind,
        size: u64,
        limit: u64,
    },
}

/// Detect the media kind and content type from the file extension.
pub fn classify(file_name: &str) -> Result<MediaInfo, MediaValidationError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| MediaValidationError::MissingExtension {
            file_name: file_name.to_string(),
        })?;

    let content_type = mime_guess::from_ext(&extension).first_or_octet_stream();
    let kind = kind_of(&content_type).ok_or_else(|| MediaValidationError::Unsupported {
        file_name: file_name.to_string(),
        content_type: content_type.essence_str().to_string(),
    })?;

    Ok(MediaInfo {
        kind,
        content_type,
        extension,
        large: false,
    })
}

fn kind_of(content_type: &Mime) -> Option<MediaKind> {
    if content_type.type_() == mime::IMAGE {
        return Some(MediaKind::Image);
    }
    if content_type.type_() == mime::VIDEO {
        return Some(MediaKind::Video);
    }
    if content_type.essence_str() == mime::APPLICATION_PDF.essence_str() {
        return Some(MediaKind::Pdf);
    }

    let essence = content_type.essence_str();
    let document = essence == "application/msword"
        || essence == "application/rtf"
        || essence == "text/plain"
        || essence == "text/csv"
        || essence.starts_with("application/vnd.openxmlformats-officedocument.")
        || essence.starts_with("application/vnd.ms-")
        || essence.starts_with("application/vnd.oasis.opendocument.");
    document.then_some(MediaKind::Document)
}
