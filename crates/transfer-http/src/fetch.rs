//! Streamed downloads with buffered writes and cancellation

use futures_util::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Write buffer size for downloads (2 MB) - reduces I/O operations
pub const WRITE_BUFFER_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transfer cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// What the server answered and how much of the body was received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub received_bytes: u64,
}

fn header_string(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Send a request, giving up as soon as `cancel` fires.
pub async fn send_cancellable(
    request: RequestBuilder,
    cancel: &CancellationToken,
) -> Result<Response, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = request.send() => result.map_err(FetchError::from),
    }
}

/// Stream a response body into `destination`.
///
/// `on_chunk` receives the running byte count after every chunk. When `cancel` fires
/// the partial file is removed and `FetchError::Cancelled` is returned.
pub async fn stream_to_file<F>(
    response: Response,
    destination: &Path,
    cancel: &CancellationToken,
    mut on_chunk: F,
) -> Result<FetchOutcome, FetchError>
where
    F: FnMut(u64),
{
    let status = response.status().as_u16();
    let content_type = header_string(&response, CONTENT_TYPE);
    let content_disposition = header_string(&response, CONTENT_DISPOSITION);

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = File::create(destination).await?;

    let mut stream = response.bytes_stream();
    let mut write_buffer: Vec<u8> = Vec::with_capacity(WRITE_BUFFER_SIZE);
    let mut received: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            chunk = stream.next() => Some(chunk),
        };

        let chunk = match next {
            None => {
                drop(file);
                let _ = tokio::fs::remove_file(destination).await;
                return Err(FetchError::Cancelled);
            }
            Some(None) => break,
            Some(Some(chunk)) => chunk,
        };

        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(destination).await;
                return Err(FetchError::Network(e.to_string()));
            }
        };

        write_buffer.extend_from_slice(&chunk);
        received += chunk.len() as u64;
        on_chunk(received);

        if write_buffer.len() >= WRITE_BUFFER_SIZE {
            file.write_all(&write_buffer).await?;
            write_buffer.clear();
        }
    }

    if !write_buffer.is_empty() {
        file.write_all(&write_buffer).await?;
    }
    file.flush().await?;

    Ok(FetchOutcome {
        status,
        content_type,
        content_disposition,
        received_bytes: received,
    })
}

/// Read at most `limit` bytes of a response body as lossy UTF-8.
pub async fn read_body_text(response: Response, limit: usize) -> Result<String, FetchError> {
    let mut stream = response.bytes_stream();
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = limit.saturating_sub(body.len());
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(body: Vec<u8>, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/object"))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("Content-Disposition", "attachment; filename=\"a.bin\"")
                    .set_body_raw(body, "application/octet-stream"),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn stream_to_file_writes_body_and_reports_headers() {
        let body = vec![1u8; 3 * 1024 * 1024 + 17];
        let server = serve(body.clone(), 200).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("a.part");

        let response = reqwest::get(format!("{}/object", server.uri())).await.unwrap();
        let mut last = 0;
        let outcome = stream_to_file(response, &dest, &CancellationToken::new(), |n| last = n)
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.received_bytes, body.len() as u64);
        assert_eq!(last, body.len() as u64);
        assert_eq!(
            outcome.content_disposition.as_deref(),
            Some("attachment; filename=\"a.bin\"")
        );
        assert_eq!(
            outcome.content_type.as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[tokio::test]
    async fn cancelled_stream_removes_partial_file() {
        let server = serve(vec![0u8; 1024], 200).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("b.part");

        let response = reqwest::get(format!("{}/object", server.uri())).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = stream_to_file(response, &dest, &cancel, |_| {}).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn send_cancellable_short_circuits_on_cancelled_token() {
        let server = serve(Vec::new(), 200).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = reqwest::Client::new().get(format!("{}/object", server.uri()));
        let result = send_cancellable(request, &cancel).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[tokio::test]
    async fn read_body_text_truncates_at_limit() {
        let server = serve(b"abcdefghij".to_vec(), 500).await;
        let response = reqwest::get(format!("{}/object", server.uri())).await.unwrap();
        let text = read_body_text(response, 4).await.unwrap();
        assert_eq!(text, "abcd");
    }
}
