use std::path::PathBuf;
use thiserror::Error;

use crate::session::replies;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `pdfbinder`.
///
/// Each pipeline defines its own error enum. The dispatcher matches on these
/// to pick the reply a user sees; bootstrap and transport code keeps using
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum BinderError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Blob storage ────────────────────────────────────────────────────
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    // ── PDF rendering ───────────────────────────────────────────────────
    #[error("render: {0}")]
    Render(#[from] RenderError),

    // ── Pipelines ───────────────────────────────────────────────────────
    #[error("ingest: {0}")]
    Ingest(#[from] IngestError),

    #[error("assembly: {0}")]
    Assembly(#[from] AssemblyError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Storage errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file name: {0:?}")]
    InvalidName(String),
}

impl StorageError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

// ─── Render errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no images to render")]
    Empty,

    #[error("image #{index} could not be decoded: {message}")]
    Decode { index: usize, message: String },

    #[error("image #{index} has zero width or height")]
    EmptyImage { index: usize },

    #[error("failed to compress image #{index}: {source}")]
    Compress {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("render task aborted: {0}")]
    Aborted(String),
}

// ─── Ingestion errors ───────────────────────────────────────────────────────

/// Why an inbound image was not added to its session.
///
/// Every variant leaves the registry untouched.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("attachment is not an image")]
    NotAnImage,

    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("download failed: {0:#}")]
    Download(#[source] anyhow::Error),

    #[error("staging failed: {0}")]
    Staging(#[source] StorageError),
}

impl IngestError {
    /// Reply shown to the user for this rejection.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAnImage => replies::SEND_AN_IMAGE.to_string(),
            Self::TooLarge { limit, .. } => replies::too_large(*limit),
            Self::Download(_) | Self::Staging(_) => replies::PROCESSING_FAILED.to_string(),
        }
    }
}

// ─── Assembly errors ────────────────────────────────────────────────────────

/// Why `generate` did not deliver a document.
///
/// Only `NothingToGenerate` implies there is no session; every other variant
/// leaves the session exactly as it was so the user can retry.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no staged images")]
    NothingToGenerate,

    #[error("failed to load staged image: {0}")]
    Load(#[source] StorageError),

    #[error("conversion failed: {0}")]
    Conversion(#[source] RenderError),

    #[error("failed to stage rendered document: {0}")]
    Staging(#[source] StorageError),

    #[error("delivery failed: {0:#}")]
    Delivery(#[source] anyhow::Error),
}

impl AssemblyError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NothingToGenerate => replies::NOTHING_TO_GENERATE.to_string(),
            Self::Load(_) | Self::Conversion(_) | Self::Staging(_) => {
                replies::GENERATION_FAILED.to_string()
            }
            Self::Delivery(_) => replies::DELIVERY_FAILED.to_string(),
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, BinderError>;
