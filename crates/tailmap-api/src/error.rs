// ── API error taxonomy ──
//
// Every variant represents a single-source failure. Callers in the
// reconciliation layer treat all of them as recoverable: log and fall
// through to the next source in the chain.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP request itself failed (DNS, TLS, connect, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The directory API answered with a non-success status.
    #[error("directory API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("deserialization error: {message}")]
    Deserialization { message: String },

    /// The manual device file is missing, unreadable, or malformed.
    #[error("manual device file error: {message}")]
    InvalidFile { message: String },
}
