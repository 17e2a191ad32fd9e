use clap::{Args, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::validator::InvalidDocumentPolicy;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only the final verdict
    Quiet,
    /// Banner, progress and verdict
    #[default]
    Normal,
    /// Everything, including probe decisions
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Options shared by both validators. Unset options leave the configured value alone.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct CommonArgs {
    /// Root schema URL
    #[arg(long = "schema-url", value_name = "URL")]
    pub schema_url: Option<String>,

    /// Directory the schema files are downloaded into
    #[arg(long = "schema-dir", value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds (0 waits indefinitely)
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Number of retry attempts for failed downloads
    #[arg(long = "retry-attempts", value_name = "N")]
    pub retry_attempts: Option<u32>,

    /// What to do when the schema rejects the document
    #[arg(long = "on-invalid", value_enum, value_name = "POLICY")]
    pub on_invalid: Option<InvalidDocumentPolicy>,

    /// External validator program used when the schema cannot be compiled in-process
    #[arg(long = "xmllint", value_name = "PROGRAM")]
    pub xmllint: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet mode (verdict only)
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Validate an XML file against the IP-XACT schema, falling back to a content check
#[derive(Parser, Debug, Clone)]
#[command(name = "simple_validator")]
#[command(version)]
pub struct SimpleCli {
    /// XML file to validate
    pub xml_file: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Validate an IP-XACT component against the IEEE 1685-2014 schema
#[derive(Parser, Debug, Clone)]
#[command(name = "validate_ipxact")]
#[command(version)]
pub struct IpxactCli {
    /// IP-XACT component file to validate
    pub xml_file: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}
