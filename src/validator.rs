//! IP-XACT Validation Engine
//!
//! Two validation paths share one engine:
//!
//! - **Simple path** ([`IpxactValidator::validate_against_schema`]): fetch, compile and validate;
//!   any infrastructure failure degrades to the content check in [`crate::content_check`].
//! - **Strict path** ([`IpxactValidator::validate_ipxact_component`]): fetch and compile; when
//!   the schema will not compile in-process, hand the document to an external validator.
//!   Syntax errors, schema violations and other failures get distinct message prefixes.
//!
//! A schema-detected violation is handled the same way on both paths, as selected by
//! [`InvalidDocumentPolicy`].
//!
//! Neither path returns an error: every failure becomes a [`ValidationResult`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use libc::c_int;
use serde::{Deserialize, Serialize};

use crate::content_check::{self, ContentReport};
use crate::error::{Result, ValidationError};
use crate::external_tool::{ExternalValidator, ToolVerdict};
use crate::libxml2::{
    DocumentVerdict, LibXml2Version, LibXml2Wrapper, XML_PARSE_HUGE, XML_PARSE_NONET, XmlDocument,
    XmlSchemaPtr,
};
use crate::schema_fetcher::{IPXACT_SCHEMA_URL, SchemaFetcher, SchemaSource};

pub const SCHEMA_SUCCESS_MESSAGE: &str = "XML validates against schema";
pub const IPXACT_SUCCESS_MESSAGE: &str = "XML validates against IP-XACT schema";

/// Which check produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMethod {
    /// In-process XSD validation
    Schema,
    /// Command-line validator
    ExternalTool,
    /// String-based fallback
    Content,
    /// Nothing could be checked
    None,
}

/// Final verdict of a validation path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
    pub method: ValidationMethod,
}

impl ValidationResult {
    pub fn success(method: ValidationMethod, message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            message: message.into(),
            method,
        }
    }

    pub fn failure(method: ValidationMethod, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            method,
        }
    }

    /// Process exit code mirroring the verdict
    pub fn exit_code(&self) -> u8 {
        if self.is_valid { 0 } else { 1 }
    }
}

/// What to do when the schema rejects the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InvalidDocumentPolicy {
    /// Surface the schema's constraint messages
    #[default]
    Report,
    /// Ignore the schema verdict and run the content check instead
    Fallback,
}

/// Candidate parser configurations, tried in preference order by the capability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// No network, no hardcoded size limits
    Lax,
    /// No network access while parsing
    Strict,
    /// libxml2 defaults
    Plain,
}

impl ValidationMode {
    /// Probe order of the simple path
    pub const PREFERENCE: [ValidationMode; 3] =
        [ValidationMode::Lax, ValidationMode::Strict, ValidationMode::Plain];

    /// Probe order of the strict path
    pub const STRICT_PREFERENCE: [ValidationMode; 2] =
        [ValidationMode::Strict, ValidationMode::Plain];

    /// Oldest libxml2 that understands this mode's parser options
    pub fn min_version(self) -> Option<LibXml2Version> {
        match self {
            ValidationMode::Lax => Some(LibXml2Version::new(2, 7, 0)),
            ValidationMode::Strict => Some(LibXml2Version::new(2, 6, 0)),
            ValidationMode::Plain => None,
        }
    }

    pub fn parse_options(self) -> c_int {
        match self {
            ValidationMode::Lax => XML_PARSE_NONET | XML_PARSE_HUGE,
            ValidationMode::Strict => XML_PARSE_NONET,
            ValidationMode::Plain => 0,
        }
    }

    /// An unknown version only supports modes without a requirement
    pub fn is_supported_by(self, version: Option<LibXml2Version>) -> bool {
        match self.min_version() {
            None => true,
            Some(min) => version.is_some_and(|v| v >= min),
        }
    }

    /// First candidate the runtime supports, `Plain` if none
    pub fn select(version: Option<LibXml2Version>, candidates: &[ValidationMode]) -> Self {
        candidates
            .iter()
            .copied()
            .find(|mode| mode.is_supported_by(version))
            .unwrap_or(ValidationMode::Plain)
    }
}

/// Why the simple path gave up on the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The schema rejected the document and the policy asks for a fallback
    SchemaRejected,
    /// Fetching, compiling or parsing failed
    SchemaUnavailable(String),
}

/// Progress notifications emitted while validating
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationProgress {
    ModeSelected {
        mode: ValidationMode,
        library_version: Option<LibXml2Version>,
    },
    FetchingSchema {
        url: String,
    },
    ContentFallback {
        reason: FallbackReason,
    },
    ExternalToolFallback {
        reason: String,
    },
    ContentChecked {
        report: ContentReport,
    },
}

/// Progress callback type for validation updates
pub type ProgressCallback = Arc<dyn Fn(ValidationProgress) + Send + Sync>;

/// Settings of one validator instance
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    pub schema_url: String,
    pub schema_dir: PathBuf,
    pub on_invalid: InvalidDocumentPolicy,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            schema_url: IPXACT_SCHEMA_URL.to_string(),
            schema_dir: PathBuf::from("schema"),
            on_invalid: InvalidDocumentPolicy::default(),
        }
    }
}

/// Validates IP-XACT documents against a downloaded schema
pub struct IpxactValidator<S> {
    fetcher: SchemaFetcher<S>,
    libxml2: LibXml2Wrapper,
    external: ExternalValidator,
    config: ValidatorConfig,
    progress: Option<ProgressCallback>,
}

impl<S: SchemaSource> IpxactValidator<S> {
    pub fn new(source: S, config: ValidatorConfig) -> Self {
        Self {
            fetcher: SchemaFetcher::new(source),
            libxml2: LibXml2Wrapper::new(),
            external: ExternalValidator::default(),
            config,
            progress: None,
        }
    }

    pub fn with_external_validator(mut self, external: ExternalValidator) -> Self {
        self.external = external;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn library_version(&self) -> Option<LibXml2Version> {
        self.libxml2.runtime_version()
    }

    fn report(&self, progress: ValidationProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }

    fn select_mode(&self, candidates: &[ValidationMode]) -> ValidationMode {
        let library_version = self.libxml2.runtime_version();
        let mode = ValidationMode::select(library_version, candidates);
        tracing::debug!(?mode, version = ?library_version, "selected validation mode");
        self.report(ValidationProgress::ModeSelected {
            mode,
            library_version,
        });
        mode
    }

    async fn fetch_schema(&self, schema_url: &str) -> Result<PathBuf> {
        self.report(ValidationProgress::FetchingSchema {
            url: schema_url.to_string(),
        });
        self.fetcher.fetch(schema_url, &self.config.schema_dir).await
    }

    fn compile_schema(&self, schema_path: &Path) -> Result<XmlSchemaPtr> {
        self.libxml2
            .parse_schema_file(schema_path)
            .map_err(|e| ValidationError::SchemaCompile {
                path: schema_path.to_path_buf(),
                details: e.to_string(),
            })
    }

    fn parse_document(&self, xml: &[u8], mode: ValidationMode) -> Result<XmlDocument> {
        let document = self.libxml2.parse_document(xml, mode.parse_options())?;
        for warning in &document.warnings {
            tracing::warn!(%warning, "document parser warning");
        }
        Ok(document)
    }

    fn check_document(&self, schema: &XmlSchemaPtr, document: &XmlDocument) -> Result<()> {
        match self.libxml2.validate_document(schema, document)? {
            DocumentVerdict::Valid => Ok(()),
            DocumentVerdict::Invalid { errors, .. } => {
                Err(ValidationError::DocumentInvalid { errors })
            }
            DocumentVerdict::InternalError { code } => Err(ValidationError::LibXml2Internal {
                details: format!("validation returned {}", code),
            }),
        }
    }

    /// Validate the file at `path` on the simple path against the configured schema.
    ///
    /// The raw bytes go to libxml2, which honours the declared encoding. An unreadable file
    /// goes straight to the content check, which reports the read error.
    pub async fn validate_xml_file(&self, path: &Path) -> ValidationResult {
        match tokio::fs::read(path).await {
            Ok(xml) => {
                let schema_url = self.config.schema_url.clone();
                self.validate_bytes(&xml, &schema_url).await
            }
            Err(e) => {
                self.report(ValidationProgress::ContentFallback {
                    reason: FallbackReason::SchemaUnavailable(e.to_string()),
                });
                content_check::check_file(path).await
            }
        }
    }

    /// Simple path: schema validation with the content check as safety net
    pub async fn validate_against_schema(&self, xml: &str, schema_url: &str) -> ValidationResult {
        self.validate_bytes(xml.as_bytes(), schema_url).await
    }

    async fn validate_bytes(&self, xml: &[u8], schema_url: &str) -> ValidationResult {
        let mode = self.select_mode(&ValidationMode::PREFERENCE);

        let error = match self.schema_check(xml, schema_url, mode).await {
            Ok(()) => {
                return ValidationResult::success(ValidationMethod::Schema, SCHEMA_SUCCESS_MESSAGE);
            }
            Err(error) => error,
        };

        if error.is_document_invalid() {
            return self.on_rejected(
                ValidationMethod::Schema,
                format!("Schema validation error: {}", error),
                xml,
            );
        }

        tracing::warn!(%error, "schema validation unavailable, falling back to content check");
        self.report(ValidationProgress::ContentFallback {
            reason: FallbackReason::SchemaUnavailable(error.to_string()),
        });
        self.content_fallback(xml)
    }

    async fn schema_check(
        &self,
        xml: &[u8],
        schema_url: &str,
        mode: ValidationMode,
    ) -> Result<()> {
        let schema_path = self.fetch_schema(schema_url).await?;
        let schema = self.compile_schema(&schema_path)?;
        let document = self.parse_document(xml, mode)?;
        self.check_document(&schema, &document)
    }

    /// Apply the invalid-document policy to a schema rejection
    fn on_rejected(
        &self,
        method: ValidationMethod,
        message: String,
        xml: &[u8],
    ) -> ValidationResult {
        match self.config.on_invalid {
            InvalidDocumentPolicy::Report => ValidationResult::failure(method, message),
            InvalidDocumentPolicy::Fallback => {
                tracing::info!(%message, "schema rejected document, falling back to content check");
                self.report(ValidationProgress::ContentFallback {
                    reason: FallbackReason::SchemaRejected,
                });
                self.content_fallback(xml)
            }
        }
    }

    /// Content check on the raw document, which must be UTF-8 at this point
    fn content_fallback(&self, xml: &[u8]) -> ValidationResult {
        match content_check::inspect_bytes(xml) {
            Ok(report) => {
                self.report(ValidationProgress::ContentChecked {
                    report: report.clone(),
                });
                report.into_result()
            }
            Err(error) => content_check::error_result(error),
        }
    }

    /// Strict path: report syntax, schema and infrastructure failures distinctly
    pub async fn validate_ipxact_component(&self, xml: &str) -> ValidationResult {
        match self.strict_check(xml).await {
            Ok(result) => result,
            Err(error) if error.is_document_invalid() => self.on_rejected(
                ValidationMethod::Schema,
                format!("Schema validation error: {}", error),
                xml.as_bytes(),
            ),
            Err(error) => strict_failure(ValidationMethod::Schema, error),
        }
    }

    async fn strict_check(&self, xml: &str) -> Result<ValidationResult> {
        let schema_path = self.fetch_schema(&self.config.schema_url).await?;

        let mode = self.select_mode(&ValidationMode::STRICT_PREFERENCE);
        let document = self.parse_document(xml.as_bytes(), mode)?;

        let schema = match self.compile_schema(&schema_path) {
            Ok(schema) => schema,
            Err(error) => {
                drop(document);
                tracing::warn!(%error, "failed to load schema directly, using external validator");
                self.report(ValidationProgress::ExternalToolFallback {
                    reason: error.to_string(),
                });
                return Ok(self.external_check(&schema_path, xml).await);
            }
        };

        self.check_document(&schema, &document)?;
        Ok(ValidationResult::success(
            ValidationMethod::Schema,
            IPXACT_SUCCESS_MESSAGE,
        ))
    }

    async fn external_check(&self, schema_path: &Path, xml: &str) -> ValidationResult {
        match self.external.validate(schema_path, xml).await {
            Ok(ToolVerdict::Valid) => {
                ValidationResult::success(ValidationMethod::ExternalTool, IPXACT_SUCCESS_MESSAGE)
            }
            Ok(ToolVerdict::Invalid { stderr }) => self.on_rejected(
                ValidationMethod::ExternalTool,
                format!("Schema validation error: {}", stderr.trim_end()),
                xml.as_bytes(),
            ),
            Err(error) => strict_failure(ValidationMethod::ExternalTool, error),
        }
    }
}

fn strict_failure(method: ValidationMethod, error: ValidationError) -> ValidationResult {
    let message = match &error {
        ValidationError::DocumentInvalid { .. } => format!("Schema validation error: {}", error),
        ValidationError::Syntax { .. } => format!("XML syntax error: {}", error),
        _ => format!("Validation error: {}", error),
    };
    let method = match error {
        ValidationError::SchemaFetch { .. }
        | ValidationError::InvalidUrl { .. }
        | ValidationError::Io(_) => ValidationMethod::None,
        _ => method,
    };
    ValidationResult::failure(method, message)
}
