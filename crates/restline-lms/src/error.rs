//! Fatal errors of an extraction run

use restline_core::{AuthError, HttpError};

/// Errors that abort an extraction run.
///
/// Lenient failures (a listing page that could not be fetched, a 400 from the
/// export results endpoint) never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("unsupported dataset: {0}")]
    UnsupportedDataset(String),
    #[error("report not found: {0}")]
    ReportNotFound(String),
    #[error("export page {page} failed: {source}")]
    ExportFetch { page: usize, source: HttpError },
    #[error("report API request failed: {0}")]
    Http(#[from] HttpError),
    #[error("unexpected report API response: {0}")]
    Protocol(String),
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("serialize dataset: {0}")]
    Serialize(String),
    #[error("sink write failed for {key}: {source}")]
    Sink { key: String, source: std::io::Error },
}

impl ExtractError {
    /// Export results not ready yet; retried with a fixed backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ExportFetch { source, .. } if source.status() == Some(400))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export_err(status: Option<u16>) -> ExtractError {
        ExtractError::ExportFetch {
            page: 1,
            source: HttpError::Http {
                status,
                message: "x".into(),
            },
        }
    }

    #[test]
    fn only_export_400_is_transient() {
        assert!(export_err(Some(400)).is_transient());
        assert!(!export_err(Some(500)).is_transient());
        assert!(!export_err(Some(404)).is_transient());
        assert!(!export_err(None).is_transient());
        assert!(!ExtractError::ReportNotFound("r".into()).is_transient());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            ExtractError::UnsupportedDataset("grades".into()).to_string(),
            "unsupported dataset: grades"
        );
        assert_eq!(
            export_err(Some(503)).to_string(),
            "export page 1 failed: HTTP 503: x"
        );
    }
}
