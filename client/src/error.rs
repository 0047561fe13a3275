use thiserror::Error;

/// Anything that can go wrong talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("bad status code {code}: {message}")]
    Status { code: u16, message: String },
    #[error("json decode error: {0}")]
    Decode(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// The part worth showing to a user: the server's message for HTTP errors,
    /// the whole error otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

/// Why a job operation was refused or stopped.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid file type {media_type:?}: please upload a video or image file")]
    InvalidFileType { media_type: String },
    #[error("no file selected")]
    NoFileSelected,
    #[error("a job is already running")]
    Busy,
    #[error("the job was reset while a request was in flight")]
    Cancelled,
    #[error("upload failed: {0}")]
    Upload(#[source] ApiError),
    #[error("processing failed: {0}")]
    Trigger(#[source] ApiError),
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error(transparent)]
    Invalid(#[from] common::dashboard::TitleError),
    #[error("update failed: {0}")]
    Api(#[source] ApiError),
}

#[derive(Debug, Error)]
#[error("clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);
