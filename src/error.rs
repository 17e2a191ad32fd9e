use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Invalid schema URL: {url} - {details}")]
    InvalidUrl { url: String, details: String },

    #[error("Schema fetch failed: {url} - {details}")]
    SchemaFetch { url: String, details: String },

    #[error("Schema compilation failed: {path} - {details}")]
    SchemaCompile { path: PathBuf, details: String },

    #[error("{}", .errors.join("; "))]
    DocumentInvalid { errors: Vec<String> },

    #[error("{details}")]
    Syntax { details: String },

    #[error("{program} tool not found. Please install libxml2-utils.")]
    ToolingMissing { program: String },

    #[error("{details}")]
    ContentCheck { details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },
}

impl ValidationError {
    /// Wrap any failure of a schema download with the URL it concerned
    pub fn fetch(url: &str, source: ValidationError) -> Self {
        match source {
            already @ ValidationError::SchemaFetch { .. } => already,
            other => ValidationError::SchemaFetch {
                url: url.to_string(),
                details: other.to_string(),
            },
        }
    }

    /// Whether the document itself was rejected by the schema, as opposed to an
    /// infrastructure failure on the way there
    pub fn is_document_invalid(&self) -> bool {
        matches!(self, ValidationError::DocumentInvalid { .. })
    }
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: {}", details(.errors))]
    SchemaParseFailed { errors: Vec<String> },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Document parsing failed: {}", details(.errors))]
    DocumentParseFailed { errors: Vec<String> },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("Invalid path for libxml2: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Document too large for libxml2: {size} bytes")]
    DocumentTooLarge { size: usize },

    #[error("Schema validation internal error: code {code}")]
    InternalError { code: i32 },
}

fn details(errors: &[String]) -> String {
    if errors.is_empty() {
        "no diagnostics reported".to_string()
    } else {
        errors.join("; ")
    }
}

impl From<LibXml2Error> for ValidationError {
    fn from(err: LibXml2Error) -> Self {
        match err {
            LibXml2Error::DocumentParseFailed { errors } => ValidationError::Syntax {
                details: details(&errors),
            },
            other => ValidationError::LibXml2Internal {
                details: other.to_string(),
            },
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
