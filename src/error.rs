use thiserror::Error;

/// Umbrella error for one pipeline invocation. Only `Browser(Session)` is
/// fatal to a whole run; everything else is handled per combination.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Browser(#[from] crate::browser::BrowserError),

    #[error(transparent)]
    Capture(#[from] crate::capture::CaptureError),

    #[error(transparent)]
    Extract(#[from] crate::extract::ExtractError),

    #[error(transparent)]
    Export(#[from] crate::export::ExportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ScrapeError {
    /// Capture timeouts are the one failure class worth retrying a whole
    /// combination for; everything else either recovers narrower or not at all.
    pub fn is_capture_timeout(&self) -> bool {
        matches!(
            self,
            ScrapeError::Capture(crate::capture::CaptureError::Timeout { .. })
        )
    }
}
