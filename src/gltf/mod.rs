//! Decoder for the glTF subset the try-on pipeline exports: JSON document,
//! base64/external buffers, strided accessors, and node hierarchy
//! reconstruction into the scene graph.

pub mod accessor;
pub mod builder;
pub mod document;
pub mod fetch;

use thiserror::Error;

pub use accessor::decode_accessor;
pub use builder::build_model;
pub use document::Document;
pub use fetch::fetch_document;

/// Everything that can go wrong while loading a model. Network and format
/// errors abort the load; nothing is attached to the scene on failure.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request for {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed data URI")]
    InvalidDataUri,
    #[error("unsupported buffer URI scheme: {0}")]
    UnsupportedUri(String),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("scene index {0} out of range")]
    MissingScene(usize),
    #[error("node index {0} out of range")]
    MissingNode(usize),
    #[error("mesh index {0} out of range")]
    MissingMesh(usize),
    #[error("accessor index {0} out of range")]
    MissingAccessor(usize),
    #[error("buffer view index {0} out of range")]
    MissingBufferView(usize),
    #[error("buffer index {0} out of range")]
    MissingBuffer(usize),
    #[error("accessor {0} reads past the end of its buffer")]
    AccessorOutOfBounds(usize),
    #[error("unsupported accessor component type {0}")]
    UnsupportedComponentType(u32),
    #[error("unsupported accessor element type {0:?}")]
    UnsupportedElementType(String),
    #[error("attribute {0} must be a float32 accessor")]
    AttributeNotFloat(String),
    #[error("index accessor must be an unsigned integer type")]
    InvalidIndexType,
    #[error("primitive has no POSITION attribute")]
    MissingPositionAttribute,
    #[error("attribute {name} has {actual} elements, expected {expected}")]
    AttributeCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}
