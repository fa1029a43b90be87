/*!
 * Common test utilities for the ebook-translator test suite
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ebook_translator::app_config::Config;

// Re-export the mock engines module
pub mod mock_engines;

/// Route library logs to the test output, once per process
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Wraps body markup into a minimal XHTML page
pub fn xhtml_page(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\"><head></head><body>{}</body></html>",
        body
    )
}

/// Creates an unpacked book with one XHTML page per `(href, body)` pair
pub fn create_test_book(dir: &Path, pages: &[(&str, &str)]) -> Result<PathBuf> {
    let book_dir = dir.join("book");
    fs::create_dir_all(&book_dir)?;
    for (href, body) in pages {
        create_test_file(&book_dir, href, &xhtml_page(body))?;
    }
    Ok(book_dir)
}

/// Default configuration with the cache kept inside `dir`
pub fn test_config(dir: &Path) -> Config {
    Config {
        cache_path: Some(dir.join("cache")),
        log_translation: false,
        ..Config::default()
    }
}

/// Helper to get the absolute path to a file under samples/
pub fn sample_path(relative_path: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("samples");
    path.push(relative_path);
    path
}

/// One-shot HTTP server answering each connection with the next canned response
pub struct MockHttpServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockHttpServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let request = read_request(&mut socket).await.unwrap_or_default();
                log.lock().push(request);
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    if status < 400 { "OK" } else { "Error" },
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Ok(Self { url, requests })
    }

    /// Raw requests received so far, headers and body
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buffer[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buffer.len() >= end + 4 + length {
                break;
            }
        }
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
