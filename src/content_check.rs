//! Schema-free fallback checks on raw IP-XACT text.
//!
//! Matching is literal substring matching. It is neither namespace- nor attribute-aware, so a
//! commented-out `<ipxact:port>` counts as present, and the port/wire comparison is a count
//! heuristic rather than a nesting check.

use std::path::Path;

use crate::error::ValidationError;
use crate::validator::{ValidationMethod, ValidationResult};

/// Tags every IP-XACT component must contain, in reporting order
pub const REQUIRED_ELEMENTS: [&str; 9] = [
    "<ipxact:vendor>",
    "<ipxact:library>",
    "<ipxact:name>",
    "<ipxact:version>",
    "<ipxact:model>",
    "<ipxact:views>",
    "<ipxact:view>",
    "<ipxact:ports>",
    "<ipxact:port>",
];

pub const PORT_TAG: &str = "<ipxact:port>";
pub const WIRE_TAG: &str = "<ipxact:wire>";
pub const TRANSACTIONAL_TAG: &str = "<ipxact:transactional>";

pub const PASSED_MESSAGE: &str = "XML structure appears valid (basic check passed)";
pub const PORT_CHILD_MESSAGE: &str =
    "Some port elements are missing required wire or transactional child elements";

/// What the content check observed in a document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentReport {
    pub missing_elements: Vec<&'static str>,
    pub port_tags: usize,
    pub wire_tags: usize,
    pub transactional_tags: usize,
}

impl ContentReport {
    /// Ports outnumber their possible wire/transactional children
    pub fn has_unbacked_ports(&self) -> bool {
        self.port_tags > 0 && self.wire_tags + self.transactional_tags < self.port_tags
    }

    pub fn into_result(self) -> ValidationResult {
        if !self.missing_elements.is_empty() {
            return ValidationResult::failure(
                ValidationMethod::Content,
                format!(
                    "Required elements missing: {}",
                    self.missing_elements.join(", ")
                ),
            );
        }

        if self.has_unbacked_ports() {
            return ValidationResult::failure(ValidationMethod::Content, PORT_CHILD_MESSAGE);
        }

        ValidationResult::success(ValidationMethod::Content, PASSED_MESSAGE)
    }
}

/// Collect the tag presence and counts the fallback decision is based on
pub fn inspect(content: &str) -> ContentReport {
    let report = ContentReport {
        missing_elements: REQUIRED_ELEMENTS
            .iter()
            .copied()
            .filter(|tag| !content.contains(tag))
            .collect(),
        port_tags: content.matches(PORT_TAG).count(),
        wire_tags: content.matches(WIRE_TAG).count(),
        transactional_tags: content.matches(TRANSACTIONAL_TAG).count(),
    };
    tracing::debug!(
        missing = report.missing_elements.len(),
        ports = report.port_tags,
        wires = report.wire_tags,
        transactional = report.transactional_tags,
        "content check"
    );
    report
}

/// Run the fallback check on XML text
pub fn check_content(content: &str) -> ValidationResult {
    inspect(content).into_result()
}

/// Inspect raw document bytes, which must be UTF-8
pub fn inspect_bytes(content: &[u8]) -> Result<ContentReport, ValidationError> {
    std::str::from_utf8(content)
        .map(inspect)
        .map_err(|e| ValidationError::ContentCheck {
            details: e.to_string(),
        })
}

/// Run the fallback check on a file, reading it as UTF-8
pub async fn check_file(path: &Path) -> ValidationResult {
    let report = match tokio::fs::read(path).await {
        Ok(content) => inspect_bytes(&content),
        Err(e) => Err(ValidationError::ContentCheck {
            details: e.to_string(),
        }),
    };
    match report {
        Ok(report) => report.into_result(),
        Err(error) => error_result(error),
    }
}

/// Failed verdict for a content check that could not run
pub fn error_result(error: ValidationError) -> ValidationResult {
    ValidationResult::failure(
        ValidationMethod::Content,
        format!("Content validation error: {}", error),
    )
}
