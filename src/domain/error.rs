// Error taxonomy for talking to the air-quality API and touching the disk
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AirQualityError {
    /// The request never produced a usable body (connection, HTTP status, timeout)
    #[error("request for {target} failed: {message}")]
    Transport { target: String, message: String },

    #[error("payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unrecognised payload: {0}")]
    Classification(String),

    #[error("cannot access {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AirQualityError {
    pub fn transport(target: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }
}
