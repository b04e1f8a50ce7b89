//! Upload body that reports bytes handed to the HTTP connection

use futures_util::StreamExt;
use reqwest::Body;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Read size per upload chunk (256 KB)
pub const UPLOAD_CHUNK_SIZE: usize = 256 * 1024;

/// Wrap a file into a streaming request body.
///
/// `on_progress` receives the running total of bytes read from the file, which is
/// the closest equivalent of the browser's upload progress event.
pub fn progress_body<F>(file: File, mut on_progress: F) -> Body
where
    F: FnMut(u64) + Send + Sync + 'static,
{
    let mut sent: u64 = 0;
    let stream = ReaderStream::with_capacity(file, UPLOAD_CHUNK_SIZE).inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            sent += bytes.len() as u64;
            on_progress(sent);
        }
    });
    Body::wrap_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::progress_body;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_bytes, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn body_streams_file_and_reports_running_total() {
        let server = MockServer::start().await;
        let payload = vec![7u8; 600 * 1024];
        Mock::given(method("POST"))
            .and(path("/sink"))
            .and(body_bytes(payload.clone()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&payload).unwrap();
        let file = tokio::fs::File::open(tmp.path()).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let body = progress_body(file, move |sent| seen_clone.lock().unwrap().push(sent));

        let response = reqwest::Client::new()
            .post(format!("{}/sink", server.uri()))
            .body(body)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let seen = seen.lock().unwrap();
        assert!(seen.len() >= 3);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*seen.last().unwrap(), payload.len() as u64);
    }
}
