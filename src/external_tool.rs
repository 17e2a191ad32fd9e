//! Last-resort schema validation through a command-line validator (`xmllint`).

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{Result, ValidationError};

pub const DEFAULT_PROGRAM: &str = "xmllint";

/// Result of one external validator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolVerdict {
    Valid,
    Invalid { stderr: String },
}

/// Runs `<program> --schema <schema> <xml> --noout` on a temporary copy of the document
#[derive(Debug, Clone)]
pub struct ExternalValidator {
    program: String,
    scratch_dir: Option<PathBuf>,
}

impl Default for ExternalValidator {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl ExternalValidator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            scratch_dir: None,
        }
    }

    /// Place temporary documents in `dir` instead of the system temp directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Validate `xml` against the schema file.
    ///
    /// The temporary document is removed when this returns, whatever the outcome.
    pub async fn validate(&self, schema_file: &Path, xml: &str) -> Result<ToolVerdict> {
        let mut builder = tempfile::Builder::new();
        builder.suffix(".xml");
        let mut scratch = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        scratch.write_all(xml.as_bytes())?;
        scratch.flush()?;

        tracing::debug!(
            program = %self.program,
            schema = %schema_file.display(),
            document = %scratch.path().display(),
            "running external validator"
        );

        let output = Command::new(&self.program)
            .arg("--schema")
            .arg(schema_file)
            .arg(scratch.path())
            .arg("--noout")
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ValidationError::ToolingMissing {
                    program: self.program.clone(),
                },
                _ => ValidationError::Io(e),
            })?;

        // `scratch` drops here on every path above, deleting the file.
        if output.status.success() {
            Ok(ToolVerdict::Valid)
        } else {
            Ok(ToolVerdict::Invalid {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
