use thiserror::Error;

#[derive(Debug, Error)]
pub enum DroidClawError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure or non-2xx answer from the chat-completion endpoint.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Perception error: {0}")]
    Perception(String),

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Task cancelled")]
    Cancelled,
}

impl serde::Serialize for DroidClawError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type DroidClawResult<T> = Result<T, DroidClawError>;
