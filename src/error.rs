use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::report::FailureKind;

/// Failure talking to the remote host, for either the page or the asset.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("page has no <meta name=\"{name}\"> with a content attribute")]
    MissingAsset { name: String },
    #[error("page has no <title>")]
    MissingTitle,
    #[error("title does not match the expected pattern: {title:?}")]
    TitleMismatch { title: String },
    #[error("title label is not usable as a file name: {title:?}")]
    UnsafeTitle { title: String },
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("asset is not a valid gzip stream: {0}")]
    Decompress(#[source] io::Error),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("decompression task failed: {0}")]
    Join(String),
}

/// Everything that can stop one identifier's pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Network(_) => FailureKind::Network,
            PipelineError::Parse(_) => FailureKind::Parse,
            PipelineError::Materialize(_) => FailureKind::Materialize,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}
