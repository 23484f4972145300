//! Post image metadata read from the static directory.

use std::path::{Path, PathBuf};

use imagesize::ImageError;
use thiserror::Error;

use crate::domain::posts::PostKey;

/// Extension every post image is stored under.
pub const POST_IMAGE_EXTENSION: &str = "webp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum ImageMetadataError {
    #[error("unsupported image format")]
    Unsupported,
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to inspect image: {0}")]
    Probe(String),
}

/// On-disk location of a post's image: `<static_dir>/<key>.webp`.
pub fn post_image_path(static_dir: &Path, key: &PostKey) -> PathBuf {
    static_dir.join(format!("{}.{POST_IMAGE_EXTENSION}", key.as_str()))
}

/// Public URL of a post's image.
pub fn post_image_url(key: &PostKey) -> String {
    format!("/static/{}.{POST_IMAGE_EXTENSION}", key.as_str())
}

pub fn image_dimensions(path: &Path) -> Result<ImageDimensions, ImageMetadataError> {
    let size = match imagesize::size(path) {
        Ok(size) => size,
        Err(ImageError::NotSupported) => return Err(ImageMetadataError::Unsupported),
        Err(ImageError::CorruptedImage) => {
            return Err(ImageMetadataError::Probe("corrupted image".to_string()));
        }
        Err(ImageError::IoError(err)) => return Err(ImageMetadataError::Io(err)),
    };

    let width = u32::try_from(size.width).map_err(|_| ImageMetadataError::Unsupported)?;
    let height = u32::try_from(size.height).map_err(|_| ImageMetadataError::Unsupported)?;
    Ok(ImageDimensions { width, height })
}
