use thiserror::Error;

/// Failures raised by the request-to-produce parser.
#[derive(Debug, Error)]
pub enum RtpError {
    /// The opening text carries no request-for-production vocabulary.
    #[error("document is not a recognizable request for production: {0}")]
    InvalidFormat(String),

    /// Upstream text extraction produced too little text to parse.
    #[error("insufficient extracted text: {0}")]
    PdfExtraction(String),

    #[error("failed to extract request: {0}")]
    RequestExtraction(String),

    /// Catch-all, e.g. a valid filing in which no request could be located.
    #[error("failed to parse requests: {0}")]
    Parsing(String),
}

pub type RtpResult<T> = std::result::Result<T, RtpError>;
