//! Test doubles shared by the unit tests of this crate.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use vox_types::Provider;

use crate::error::{BridgeError, Result};
use crate::providers::{GenerationClient, Resources, TranslationRequest};
use crate::queue::MessageQueue;
use crate::registry::Registry;
use crate::router::GenerationRouter;
use crate::storage::BlobStore;

/// Provider stub whose behaviour is picked by the prompt text:
/// `"explode"` panics, `"abort"` panics inside a blocking task, `"fail"`
/// errors, `"silence"` is missing content, anything else is echoed.
pub struct ScriptedClient {
    provider: Provider,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(provider: Provider) -> Arc<Self> {
        Arc::new(Self {
            provider,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn script(&self, prompt: &str) -> Result<()> {
        match prompt {
            "explode" => panic!("provider stub exploded"),
            "fail" => Err(BridgeError::Provider("upstream exploded".into())),
            "silence" => Err(BridgeError::MissingContent("no choices".into())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn generate_text(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(format!(
            "text {model_id} system={} {prompt}",
            system_prompt.unwrap_or("-")
        ));
        if prompt == "abort" {
            tokio::task::spawn_blocking::<_, ()>(|| panic!("blocking stage exploded")).await?;
        }
        self.script(prompt)?;
        Ok(format!("echo: {prompt}"))
    }

    async fn generate_image(&self, model_id: &str, prompt: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(format!("image {model_id} {prompt}"));
        self.script(prompt)?;
        Ok(tiny_png())
    }

    async fn translate(&self, model_id: &str, request: TranslationRequest<'_>) -> Result<String> {
        self.calls.lock().unwrap().push(format!(
            "translate {model_id} {}->{}",
            request.source_language, request.target_language
        ));
        self.script(request.text)?;
        Ok(format!("[{}] {}", request.target_language, request.text))
    }
}

/// Router over the built-in registry with the given clients registered.
pub fn router_with(clients: &[Arc<ScriptedClient>]) -> GenerationRouter {
    let resources = clients
        .iter()
        .fold(Resources::new(), |r, c| r.with_client(c.clone()));
    let mut registry = Registry::new();
    registry.register(resources.availability());
    GenerationRouter::new(Arc::new(registry), resources)
}

/// Blob store that keeps nothing and hands out predictable URLs.
#[derive(Default)]
pub struct NullBlobStore;

#[async_trait]
impl BlobStore for NullBlobStore {
    async fn put(
        &self,
        request_id: &str,
        file_name: &str,
        prefix: &str,
        _: Vec<u8>,
    ) -> Result<String> {
        Ok(format!("https://blobs.test/bucket/{prefix}{request_id}/{file_name}"))
    }
}

pub fn tiny_png() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([200, 40, 40])))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Queue whose writes always fail.
pub struct BrokenQueue;

#[async_trait]
impl MessageQueue for BrokenQueue {
    async fn push(&self, _: String) -> Result<()> {
        Err(BridgeError::Queue("connection refused".into()))
    }

    async fn pull(&self, _: Duration) -> Result<Option<String>> {
        Ok(None)
    }

    async fn purge(&self) -> Result<()> {
        Err(BridgeError::Queue("connection refused".into()))
    }
}

/// One HTTP request seen by [`StubServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Local HTTP/1.1 endpoint answering every request with the same canned
/// response and recording what it received.
pub struct StubServer {
    pub base_url: String,
    captured: mpsc::UnboundedReceiver<CapturedRequest>,
}

impl StubServer {
    pub async fn start(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.into();
        let (tx, captured) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let request = read_request(&mut socket).await;
                let _ = tx.send(request);
                let head = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: {content_type}\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            captured,
        }
    }

    /// The next request the server answered.
    pub async fn request(&mut self) -> CapturedRequest {
        self.captured.recv().await.expect("stub server saw no request")
    }
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the request head");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_owned();
    let path = request_line.next().unwrap_or_default().to_owned();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_owned()))
        .collect();

    let length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end..].to_vec();
    while body.len() < length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        method,
        path,
        headers,
        body,
    }
}
