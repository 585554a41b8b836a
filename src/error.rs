// Error taxonomy shared by every report pipeline.
//
// Any of these aborts the pipeline it was raised in; nothing is rendered
// after an error. Missing nullable columns are not errors and never reach
// this type.

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Misaligned input: {0}")]
    MisalignedInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Render failed: {0}")]
    Render(String),
}

impl From<sqlx::Error> for ReportError {
    fn from(e: sqlx::Error) -> Self {
        ReportError::SourceUnavailable(e.to_string())
    }
}

impl From<csv::Error> for ReportError {
    fn from(e: csv::Error) -> Self {
        ReportError::SourceUnavailable(e.to_string())
    }
}

impl From<image::ImageError> for ReportError {
    fn from(e: image::ImageError) -> Self {
        ReportError::Render(e.to_string())
    }
}

impl From<std::io::Error> for ReportError {
    fn from(e: std::io::Error) -> Self {
        ReportError::Render(e.to_string())
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
