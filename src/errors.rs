//! Error types for the log forwarder

use std::fmt;

pub type Result<T> = std::result::Result<T, ForwarderError>;

#[derive(Debug)]
pub enum ForwarderError {
    /// IO operation failed
    Io(std::io::Error),

    /// Redis command or connection failed
    Store(redis::RedisError),

    /// JSON serialization failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// A worker is already registered for this target
    DuplicateTarget(String),

    /// Opening the log stream failed
    StreamOpen { path: String, source: std::io::Error },

    /// Tag template expansion failed
    TagResolution(String),

    /// A frame could not be decoded (recoverable, the decoder resyncs)
    FrameDecode(String),

    /// An operation exceeded its configured timeout
    Timeout(String),
}

impl fmt::Display for ForwarderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwarderError::Io(err) => write!(f, "IO error: {}", err),
            ForwarderError::Store(err) => write!(f, "Redis error: {}", err),
            ForwarderError::Json(err) => write!(f, "JSON error: {}", err),
            ForwarderError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ForwarderError::DuplicateTarget(id) => {
                write!(f, "Logger for target {:?} already exists", id)
            }
            ForwarderError::StreamOpen { path, source } => {
                write!(f, "Error opening log stream {:?}: {}", path, source)
            }
            ForwarderError::TagResolution(msg) => write!(f, "Tag resolution error: {}", msg),
            ForwarderError::FrameDecode(msg) => write!(f, "Frame decode error: {}", msg),
            ForwarderError::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for ForwarderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ForwarderError::Io(err) => Some(err),
            ForwarderError::Store(err) => Some(err),
            ForwarderError::Json(err) => Some(err),
            ForwarderError::StreamOpen { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ForwarderError {
    fn from(err: std::io::Error) -> Self {
        ForwarderError::Io(err)
    }
}

impl From<redis::RedisError> for ForwarderError {
    fn from(err: redis::RedisError) -> Self {
        ForwarderError::Store(err)
    }
}

impl From<serde_json::Error> for ForwarderError {
    fn from(err: serde_json::Error) -> Self {
        ForwarderError::Json(err)
    }
}
