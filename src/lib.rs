//! # ipxact-validate Library
//!
//! Validates IP-XACT (IEEE 1685-2014) component descriptions against the Accellera XSD schema.
//! The schema and everything it includes or imports is downloaded on demand, compiled with
//! libxml2, and used to validate the document. When the schema path is unavailable the validators
//! degrade to an external `xmllint` run or to a string-level content check.

pub mod app;
pub mod cli;
pub mod config;
pub mod content_check;
pub mod error;
pub mod error_reporter;
pub mod external_tool;
pub mod http_client;
pub mod libxml2;
pub mod logging;
pub mod output;
pub mod schema_fetcher;
pub mod validator;

pub use cli::{CommonArgs, IpxactCli, SimpleCli, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use content_check::{ContentReport, check_content};
pub use error::{LibXml2Error, ValidationError};
pub use external_tool::{ExternalValidator, ToolVerdict};
pub use http_client::{AsyncHttpClient, HttpClientConfig};
pub use libxml2::{LibXml2Version, LibXml2Wrapper, XmlSchemaPtr};
pub use output::Output;
pub use schema_fetcher::{FetchSession, IPXACT_SCHEMA_URL, SchemaFetcher, SchemaSource};
pub use validator::{
    InvalidDocumentPolicy, IpxactValidator, ProgressCallback, ValidationMethod, ValidationMode,
    ValidationProgress, ValidationResult, ValidatorConfig,
};
