//! Error types for the cover supply pipeline

use std::path::PathBuf;
use thiserror::Error;

use crate::SourceMode;

/// Errors raised inside the supply pipeline.
///
/// Source failures never cross the public fetch surface: [`crate::ImageSource::fetch_one`]
/// and [`crate::ImageSource::fetch_many`] turn them into absence plus a log line.
/// Only configuration calls on the coordinator hand a `CoverError` back to the caller.
#[derive(Debug, Error)]
pub enum CoverError {
    // === Source Errors ===
    #[error("{kind} source unavailable: {message}")]
    SourceUnavailable { kind: SourceMode, message: String },

    #[error("Catalog credentials are not configured")]
    MissingCredentials,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed to parse catalog response: {0}")]
    Parse(String),

    #[error("Failed to decode image '{locator}': {message}")]
    Decode { locator: String, message: String },

    // === Configuration Errors ===
    #[error("Configuration rejected: {0}")]
    ConfigurationRejected(String),

    // === I/O Errors ===
    #[error("Failed to read '{path}': {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CoverError {
    fn from(err: reqwest::Error) -> Self {
        CoverError::Http(err.to_string())
    }
}

pub type CoverResult<T> = Result<T, CoverError>;
