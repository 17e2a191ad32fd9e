use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ipxact_validate::{SchemaSource, ValidationError};

/// In-memory schema source that records every URL it is asked for
#[derive(Clone, Default)]
pub struct RecordingSchemaSource {
    bodies: HashMap<String, Vec<u8>>,
    requests: Arc<Mutex<Vec<String>>>,
    offline: bool,
}

impl RecordingSchemaSource {
    pub fn new(bodies: HashMap<String, Vec<u8>>) -> Self {
        Self {
            bodies,
            ..Default::default()
        }
    }

    /// Every fetch fails as if the network were down
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// Shared handle on the request log, usable after the source has been moved
    pub fn request_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requests)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaSource for RecordingSchemaSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ValidationError> {
        self.requests.lock().unwrap().push(url.to_string());

        if self.offline {
            return Err(ValidationError::SchemaFetch {
                url: url.to_string(),
                details: "connection refused".to_string(),
            });
        }

        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| ValidationError::HttpStatus {
                url: url.to_string(),
                status: 404,
                message: "HTTP 404: Not Found".to_string(),
            })
    }
}

/// Minimal HTTP/1.1 server on a loopback port, answering GET requests from a route table.
/// Unknown paths get a 404. Every request path is recorded.
pub struct MockHttpServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl MockHttpServer {
    pub async fn start(routes: HashMap<String, (u16, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let log = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut buffer = vec![0u8; 8192];
                    let read = socket.read(&mut buffer).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buffer[..read]);
                    let path = request
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/")
                        .to_string();
                    log.lock().unwrap().push(path.clone());

                    let (status, body) = routes
                        .get(&path)
                        .cloned()
                        .unwrap_or((404, b"not found".to_vec()));
                    let head = format!(
                        "HTTP/1.1 {} X\r\ncontent-type: application/xml\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url,
            requests,
            handle,
        }
    }

    /// Serve `files` under `prefix` (e.g. `/ipxact/`), all with status 200
    pub async fn serving(prefix: &str, files: Vec<(&str, String)>) -> Self {
        let routes = files
            .into_iter()
            .map(|(name, body)| (format!("{}{}", prefix, name), (200, body.into_bytes())))
            .collect();
        Self::start(routes).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
