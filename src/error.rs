//! Crate-wide error types, one enum per subsystem boundary composed into
//! [`IngestError`] at the pipeline boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from component A (the downloader).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server returned 403 for {url}")]
    Forbidden { url: String },

    #[error("server returned status {status} for {url}")]
    BadStatus { url: String, status: u16 },

    #[error("could not write downloaded body to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from component B (ZIP extraction).
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{path} is not a valid zip archive")]
    NotAZip { path: PathBuf },

    #[error("zip error reading {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{path} contained no entry with an allowed extension")]
    NoPayload { path: PathBuf },

    #[error("io error extracting {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from components E/F/G/H (column discovery, CSV/JSON transform, filter).
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("could not identify required columns in {path}: missing {missing:?}")]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("csv error reading {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("json error reading {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized setting value {value:?} in {path}")]
    UnknownSetting { path: PathBuf, value: String },

    #[error("unrecognized code type {value:?} in {path}")]
    UnknownCodeType { path: PathBuf, value: String },

    #[error("hospital metadata row in {path} is missing a license/name field")]
    MissingHospitalIdentity { path: PathBuf },
}

/// Errors from component I (the database loader).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no hospital key available; refusing to delete prior charge rows")]
    MissingHospitalKey,
}

/// Top-level error composing all subsystem errors, surfaced at the pipeline boundary.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
