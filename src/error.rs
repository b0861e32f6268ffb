// THEORY:
// Errors in this crate are local. A `FetchError` belongs to exactly
// one candidate image and is absorbed by the `ImageEvaluator`, which turns it into
// an "unusable" metrics record. Only the surrounding glue (tables on disk and the
// external collaborators) can fail a whole command, and those failures are
// surfaced through their own error types.

use thiserror::Error;

/// Why a candidate image could not be turned into pixels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection failure, DNS failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    Http(u16),

    /// The payload was not a decodable raster image.
    #[error("could not decode image: {0}")]
    Decode(String),
}

/// Failures of the search provider and the background-removal service.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("missing credentials: set {0}")]
    MissingCredentials(&'static str),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("prediction {id} ended as {status}")]
    Prediction { id: String, status: String },

    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reading or writing CSV tables.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
