// Error types
// Failures that are recovered locally once the viewer is running

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A single image could not be turned into a drawable texture
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to upload {}: {reason}", path.display())]
    Upload { path: PathBuf, reason: String },
}

/// A folder could not be enumerated
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to list folder {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The text service could not be brought up
#[derive(Debug, Error)]
pub enum TextError {
    #[error("no usable font found on this system")]
    NoFonts,

    #[error("failed to load font file {}: {source}", path.display())]
    FontFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
