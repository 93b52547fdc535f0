use std::path::PathBuf;

use crate::Device;

#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("Could not find espeak {what} at {}", path.display())]
    MissingDependency { what: &'static str, path: PathBuf },
    #[error("HTTP {status} while downloading {url}")]
    Http { url: String, status: u16 },
    #[error("Transport error while downloading {url}: {message}")]
    Transport { url: String, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse voice pack: {0}")]
    VoiceParse(String),
    #[error("Voice '{0}' is not in the configured voice list")]
    UnknownVoice(String),
    #[error("Requested device '{0}' is not available")]
    DeviceUnavailable(Device),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SetupError {
    /// Whether repeating the failed download could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SetupError::Http { status, .. } => *status >= 500 || *status == 429,
            SetupError::Transport { .. } => true,
            _ => false,
        }
    }
}
