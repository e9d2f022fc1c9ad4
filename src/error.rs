//! Error types for the library side.
//!
//! Data-quality problems are never errors here; they are findings in a
//! `ValidationReport`. These cover input that cannot be checked at all and
//! collaborator failures.

use std::path::PathBuf;

use thiserror::Error;

/// The document cannot be read as a `@graph` at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("top-level value is {0}, expected an object")]
    NotAnObject(&'static str),

    #[error("document has no @graph")]
    MissingGraph,

    #[error("@graph is {0}, expected an array")]
    GraphNotArray(&'static str),
}

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("cannot read contract {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid contract JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad pattern for field {field}: {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("contract has no target type")]
    NoTarget,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("fetch of {url} did not complete")]
    Incomplete { url: String },
}
