//! Download a schema together with everything it includes or imports.
//!
//! References are discovered by literal pattern matching on the downloaded text and every file
//! lands flat in one directory under its URL basename. Two dependencies sharing a basename
//! overwrite each other.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{Result, ValidationError};

/// Accellera IP-XACT 1685-2014 schema root
pub const IPXACT_SCHEMA_URL: &str = "http://www.accellera.org/XMLSchema/IPXACT/1685-2014/index.xsd";

static INCLUDE_REGEX: OnceLock<Regex> = OnceLock::new();
static IMPORT_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_include_regex() -> &'static Regex {
    INCLUDE_REGEX.get_or_init(|| {
        Regex::new(r#"<xs:include schemaLocation="([^"]+)""#)
            .expect("Failed to compile include regex")
    })
}

fn get_import_regex() -> &'static Regex {
    IMPORT_REGEX.get_or_init(|| {
        Regex::new(r#"<xs:import schemaLocation="([^"]+)""#)
            .expect("Failed to compile import regex")
    })
}

/// Where schema bytes come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// A dependency download that failed without aborting the traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub url: String,
    pub reason: String,
}

/// State of one fetch run: which URLs were tried and which of them failed
#[derive(Debug, Default)]
pub struct FetchSession {
    visited: HashSet<String>,
    attempts: Vec<String>,
    failures: Vec<FailedDownload>,
}

impl FetchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url` as visited; false if it already was
    fn claim(&mut self, url: &str) -> bool {
        if !self.visited.insert(url.to_string()) {
            return false;
        }
        self.attempts.push(url.to_string());
        true
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// URLs in the order they were downloaded
    pub fn attempts(&self) -> &[String] {
        &self.attempts
    }

    pub fn failures(&self) -> &[FailedDownload] {
        &self.failures
    }
}

/// `include` then `import` schemaLocation values, each in document order
pub fn extract_references(content: &str) -> Vec<String> {
    get_include_regex()
        .captures_iter(content)
        .chain(get_import_regex().captures_iter(content))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Resolve a schemaLocation against the URL of the schema that mentions it
pub fn resolve_reference(current_url: &str, reference: &str) -> Result<String> {
    if reference.starts_with("http") {
        return Ok(reference.to_string());
    }

    let base = Url::parse(current_url).map_err(|e| ValidationError::InvalidUrl {
        url: current_url.to_string(),
        details: e.to_string(),
    })?;
    base.join(reference)
        .map(String::from)
        .map_err(|e| ValidationError::InvalidUrl {
            url: reference.to_string(),
            details: e.to_string(),
        })
}

/// Everything up to and including the last `/` of a URL
pub fn base_directory(url: &str) -> String {
    match url.rfind('/') {
        Some(index) => url[..=index].to_string(),
        None => String::new(),
    }
}

/// Final path segment of a URL, used as the local file name
pub fn basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Local file name for `url`, rejecting URLs that name a directory
fn local_file_name(url: &str) -> Result<&str> {
    match basename(url) {
        "" => Err(ValidationError::InvalidUrl {
            url: url.to_string(),
            details: "URL does not name a file".to_string(),
        }),
        name => Ok(name),
    }
}

/// Downloads a schema and its transitive dependencies into a flat directory
pub struct SchemaFetcher<S> {
    source: S,
}

impl<S: SchemaSource> SchemaFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch `base_url` and its dependencies into `target_dir` with a fresh session.
    ///
    /// Returns the local path of the root schema.
    pub async fn fetch(&self, base_url: &str, target_dir: &Path) -> Result<PathBuf> {
        let mut session = FetchSession::new();
        self.fetch_with_session(base_url, target_dir, &mut session)
            .await
    }

    /// Fetch with a caller-owned session; URLs already visited in `session` are skipped.
    pub async fn fetch_with_session(
        &self,
        base_url: &str,
        target_dir: &Path,
        session: &mut FetchSession,
    ) -> Result<PathBuf> {
        let root_path = target_dir.join(local_file_name(base_url)?);
        tokio::fs::create_dir_all(target_dir).await?;
        tracing::debug!(
            base_url,
            base_dir = %base_directory(base_url),
            target = %target_dir.display(),
            "fetching schema"
        );

        if session.claim(base_url) {
            let references = self
                .download(base_url, target_dir)
                .await
                .map_err(|e| ValidationError::fetch(base_url, e))?;
            self.download_dependencies(base_url, references, target_dir, session)
                .await;
        }

        Ok(root_path)
    }

    /// Depth-first traversal with an explicit stack
    async fn download_dependencies(
        &self,
        root_url: &str,
        root_references: Vec<String>,
        target_dir: &Path,
        session: &mut FetchSession,
    ) {
        let mut worklist: Vec<(String, String)> = Self::pending(root_url, root_references);

        while let Some((parent, reference)) = worklist.pop() {
            let url = match resolve_reference(&parent, &reference) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(%parent, %reference, error = %e, "skipping unresolvable schema reference");
                    session.failures.push(FailedDownload {
                        url: reference,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !session.claim(&url) {
                continue;
            }

            match self.download(&url, target_dir).await {
                Ok(references) => worklist.extend(Self::pending(&url, references)),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "error downloading schema dependency");
                    session.failures.push(FailedDownload {
                        url,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Stack entries for `references` of `parent`, reversed so the first reference pops first
    fn pending(parent: &str, references: Vec<String>) -> Vec<(String, String)> {
        references
            .into_iter()
            .rev()
            .map(|reference| (parent.to_string(), reference))
            .collect()
    }

    /// Download one file, store it and return the references it contains
    async fn download(&self, url: &str, target_dir: &Path) -> Result<Vec<String>> {
        let local_path = target_dir.join(local_file_name(url)?);
        tracing::info!("Downloading schema file: {}", url);
        let data = self.source.fetch(url).await?;

        tokio::fs::write(&local_path, &data).await?;

        Ok(extract_references(&String::from_utf8_lossy(&data)))
    }
}
