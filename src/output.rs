//! User-facing output for the validator binaries.
//!
//! Everything here goes to stdout; diagnostics go through `tracing` on stderr.

use std::path::Path;

use crate::cli::VerbosityLevel;
use crate::content_check::ContentReport;
use crate::libxml2::LibXml2Version;
use crate::validator::{FallbackReason, ValidationMethod, ValidationProgress, ValidationResult};

/// Output formatter for human-readable results
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Tool name, crate version and the libxml2 it runs against
    pub fn format_banner(&self, tool: &str, library_version: Option<LibXml2Version>) -> String {
        let library = match library_version {
            Some(version) => version.to_string(),
            None => "unknown".to_string(),
        };
        format!(
            "{} {}\nlibxml2 version: {}",
            tool,
            env!("CARGO_PKG_VERSION"),
            library
        )
    }

    /// Line for a progress event, `None` when the event is not shown at this verbosity
    pub fn format_progress(&self, progress: &ValidationProgress) -> Option<String> {
        if self.verbosity == VerbosityLevel::Quiet {
            return None;
        }

        match progress {
            ValidationProgress::ModeSelected { mode, .. } => {
                (self.verbosity >= VerbosityLevel::Verbose)
                    .then(|| format!("Using {:?} validation mode", mode))
            }
            ValidationProgress::FetchingSchema { url } => {
                Some(format!("Downloading schema from {}", url))
            }
            ValidationProgress::ContentFallback { reason } => Some(match reason {
                FallbackReason::SchemaRejected => {
                    "Schema validation failed. Trying basic content validation...".to_string()
                }
                FallbackReason::SchemaUnavailable(details) => {
                    let mut line =
                        "Error during schema validation. Trying basic content validation..."
                            .to_string();
                    if self.verbosity >= VerbosityLevel::Verbose {
                        line.push_str(&format!("\n  {}", details));
                    }
                    line
                }
            }),
            ValidationProgress::ExternalToolFallback { reason } => Some(format!(
                "Failed to load schema directly: {}\nUsing alternate validation method...",
                reason
            )),
            ValidationProgress::ContentChecked { report } => (self.verbosity
                >= VerbosityLevel::Verbose)
                .then(|| self.format_content_report(report)),
        }
    }

    pub fn format_content_report(&self, report: &ContentReport) -> String {
        let missing = if report.missing_elements.is_empty() {
            "none".to_string()
        } else {
            report.missing_elements.join(", ")
        };
        format!(
            "Content check: {} port, {} wire, {} transactional; missing: {}",
            report.port_tags, report.wire_tags, report.transactional_tags, missing
        )
    }

    /// Final `✅ Success:` / `❌ Error:` line
    pub fn format_result(&self, result: &ValidationResult) -> String {
        let mut line = if result.is_valid {
            format!("{} {}", self.colorize("✅ Success:", "32"), result.message)
        } else {
            format!("{} {}", self.colorize("❌ Error:", "31"), result.message)
        };

        if self.verbosity >= VerbosityLevel::Verbose {
            line.push_str(&format!(" [{}]", method_label(result.method)));
        }
        line
    }

    pub fn format_file_not_found(&self, path: &Path) -> String {
        format!(
            "{} File not found: {}",
            self.colorize("❌ Error:", "31"),
            path.display()
        )
    }

    pub fn format_read_error(&self, error: &std::io::Error) -> String {
        format!("Error reading file: {}", error)
    }

    pub fn print_banner(&self, tool: &str, library_version: Option<LibXml2Version>) {
        if self.verbosity > VerbosityLevel::Quiet {
            println!("{}", self.format_banner(tool, library_version));
        }
    }

    pub fn print_progress(&self, progress: &ValidationProgress) {
        if let Some(line) = self.format_progress(progress) {
            println!("{}", line);
        }
    }

    pub fn print_result(&self, result: &ValidationResult) {
        println!("{}", self.format_result(result));
    }
}

fn method_label(method: ValidationMethod) -> &'static str {
    match method {
        ValidationMethod::Schema => "schema",
        ValidationMethod::ExternalTool => "external validator",
        ValidationMethod::Content => "content check",
        ValidationMethod::None => "not validated",
    }
}
