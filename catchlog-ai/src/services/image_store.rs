//! Catch photo storage
//!
//! Uploads are first written under a temporary name, then renamed to the
//! post id once the database row exists. Either step can be undone with
//! [`StoredImage::discard`].

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum accepted upload size (10 MiB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// URL prefix under which the images folder is served
pub const PUBLIC_PREFIX: &str = "/user_images";

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];
const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Image validation and storage errors
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Only image files are allowed: {0}")]
    Rejected(String),

    #[error("Image is {size} bytes, limit is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An image as received from the client
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Facts established by validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageKind {
    /// Lower-case extension without the dot
    pub extension: String,
    /// MIME type sniffed from the file's magic bytes
    pub mime_type: String,
}

/// Check name, declared type, size and content of an upload
///
/// Extension and declared MIME type must both name an allowed image type,
/// and the bytes themselves must sniff as one.
pub fn validate_image(image: &UploadedImage) -> Result<ImageKind, ImageError> {
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge {
            size: image.bytes.len(),
            max: MAX_IMAGE_BYTES,
        });
    }

    let extension = Path::new(&image.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| ImageError::Rejected(format!("unsupported file name '{}'", image.file_name)))?;

    let declared = image.content_type.as_deref().unwrap_or("").to_lowercase();
    if !ALLOWED_EXTENSIONS.iter().any(|allowed| declared.contains(allowed)) {
        return Err(ImageError::Rejected(format!(
            "unsupported content type '{}'",
            declared
        )));
    }

    let sniffed = infer::get(&image.bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .filter(|mime| ALLOWED_MIME_TYPES.contains(mime))
        .ok_or_else(|| ImageError::Rejected("file content is not a supported image".to_string()))?;

    Ok(ImageKind {
        extension,
        mime_type: sniffed.to_string(),
    })
}

/// Folder of catch photos
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and write an upload under a temporary name
    pub async fn store_temp(&self, image: &UploadedImage) -> Result<StoredImage, ImageError> {
        let kind = validate_image(image)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("temp-{}.{}", Uuid::new_v4(), kind.extension));
        tokio::fs::write(&path, &image.bytes).await?;

        debug!(path = %path.display(), bytes = image.bytes.len(), "Stored temporary image");

        Ok(StoredImage {
            dir: self.dir.clone(),
            path,
            kind,
            public_path: None,
        })
    }
}

/// An image written to disk, temporary until finalized
#[derive(Debug)]
pub struct StoredImage {
    dir: PathBuf,
    path: PathBuf,
    kind: ImageKind,
    public_path: Option<String>,
}

impl StoredImage {
    /// Current location on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.kind.mime_type
    }

    /// Public URL path once finalized
    pub fn public_path(&self) -> Option<&str> {
        self.public_path.as_deref()
    }

    /// Rename to `{post_id}.{ext}` and return the public path
    pub async fn finalize(&mut self, post_id: i64) -> Result<String, ImageError> {
        let file_name = format!("{}.{}", post_id, self.kind.extension);
        let final_path = self.dir.join(&file_name);

        tokio::fs::rename(&self.path, &final_path).await?;
        self.path = final_path;

        let public_path = format!("{}/{}", PUBLIC_PREFIX, file_name);
        self.public_path = Some(public_path.clone());
        Ok(public_path)
    }

    /// Best-effort removal of the file, wherever it currently is
    pub async fn discard(self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Discarded image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to discard image"),
        }
    }
}
