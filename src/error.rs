use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single image → ASCII conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The acquisition layer produced no image (file not found, fetch failed).
    #[error("No image named '{}' was found", path.display())]
    MissingImage { path: PathBuf },

    /// Zero-sized source image or a zero target width.
    #[error("Invalid geometry: image {width}x{height}, target width {target_width}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        target_width: u32,
    },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    /// Missing image with no known source path (e.g. nothing was acquired).
    pub fn missing() -> Self {
        Self::MissingImage {
            path: PathBuf::from("<none>"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
