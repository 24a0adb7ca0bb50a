use thiserror::Error;

/// Closed set of failure kinds surfaced at the presentation boundary.
///
/// Every failure is terminal for the current interaction; nothing here is
/// classified as retryable.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Please upload an image first!")]
    NoUpload,

    #[error("Request to the Gemini API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gemini rejected the request ({status}): {message}")]
    ProviderRejection { status: u16, message: String },

    #[error("Gemini returned no text in its response")]
    EmptyResponse,

    #[error("Unsupported image type: {0} (expected jpg, jpeg or png)")]
    UnsupportedImage(String),

    #[error("Image too large: {size} bytes (limit {limit})")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Stable machine-readable kind for the web UI.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NoUpload => "no_upload",
            AppError::Transport(_) => "transport",
            AppError::ProviderRejection { .. } => "provider_rejection",
            AppError::EmptyResponse => "empty_response",
            AppError::UnsupportedImage(_) => "unsupported_image",
            AppError::ImageTooLarge { .. } => "image_too_large",
            AppError::UploadFailed(_) => "upload_failed",
            AppError::Config(_) => "config",
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            AppError::ProviderRejection { status, .. } => Some(*status),
            AppError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
