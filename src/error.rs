//! Error type for everything around the animation core.
//!
//! The engine itself cannot fail; these cover terminal I/O, PNG output and
//! configuration input.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// Terminal or file I/O failed.
    Io(io::Error),
    /// Encoding or writing an image failed.
    Image(image::ImageError),
    /// The settings file could not be parsed.
    Config { path: PathBuf, source: toml::de::Error },
    /// A color string was not `#rgb`, `#rrggbb` or `#rrggbbaa`.
    InvalidColor(String),
    /// Serializing the geometry dump failed.
    Json(serde_json::Error),
    /// The requested raster would be too large to allocate.
    CanvasTooLarge { width: f32, height: f32, scale: f32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Image(e) => write!(f, "Failed to write image: {}", e),
            Error::Config { path, source } => {
                write!(f, "Invalid config file {}: {}", path.display(), source)
            }
            Error::InvalidColor(s) => write!(f, "Invalid color '{}': expected #rgb, #rrggbb or #rrggbbaa", s),
            Error::Json(e) => write!(f, "Failed to serialize geometry: {}", e),
            Error::CanvasTooLarge { width, height, scale } => write!(
                f,
                "Canvas {}x{} at scale {} exceeds {} pixels",
                width,
                height,
                scale,
                crate::canvas::MAX_PIXELS
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Image(e) => Some(e),
            Error::Config { source, .. } => Some(source),
            Error::Json(e) => Some(e),
            Error::InvalidColor(_) | Error::CanvasTooLarge { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
