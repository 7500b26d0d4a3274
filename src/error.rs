//! Error types for the tracking library

use thiserror::Error;

/// Result type alias for the tracking library
pub type Result<T> = std::result::Result<T, TrackError>;

/// Errors that can occur while processing detections
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("detection input length mismatch: {rects} rects, {depths} depths, {types} types")]
    LengthMismatch {
        rects: usize,
        depths: usize,
        types: usize,
    },

    #[error("motion filter error: {0}")]
    Filter(#[from] anyhow::Error),
}
