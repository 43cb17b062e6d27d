use thiserror::Error;

/// Unified error type for the entire Proxim workspace.
///
/// Nothing here is fatal to the process: every failure degrades to "this
/// peer/record is gone". Decode and I/O errors are handled where they occur
/// and surface upward only as status events.
#[derive(Error, Debug)]
pub enum ProximError {
    // ── Wire codec errors ──────────────────────────────────────
    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    // ── Transport errors ───────────────────────────────────────
    #[error("failed to reach hub at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ProximError>;
