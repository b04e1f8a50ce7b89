//! Managed download: streamed into a hidden `.part` file with progress, then
//! renamed after the server-provided file name once the size checks out.

use super::types::{DownloadParams, INCOMPLETE_DOWNLOAD, NETWORK_ERROR};
use crate::api::ConsoleClient;
use crate::errors::{detailed_message, ConsoleError};
use crate::transfer::{remove_trace, Transfer, TransferKind, TransferListener, TransferOutcome};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use transfer_http::{
    percent_rounded, read_body_text, send_cancellable, stream_to_file, CancellationToken,
    FetchError,
};

const ERROR_BODY_LIMIT: usize = 64 * 1024;
const DEFAULT_FILE_NAME: &str = "download";

pub(crate) fn is_folder(object_path: &str) -> bool {
    object_path.ends_with('/')
}

/// File name announced by `Content-Disposition`: the URL-decoded text between
/// the first pair of double quotes.
pub(crate) fn filename_from_disposition(header: Option<&str>) -> String {
    let Some(header) = header else {
        return DEFAULT_FILE_NAME.to_string();
    };
    let decoded = urlencoding::decode(header)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| header.to_string());
    let name = decoded.split('"').nth(1).unwrap_or_default();

    // Never let the server pick a directory
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

/// `dir/name`, or `dir/name (n).ext` when that is taken
pub(crate) fn available_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{} ({}){}", stem, n, extension));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

pub(crate) fn part_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!(".{}.part", id))
}

/// Move a finished `.part` file to its final name.
pub(crate) async fn finish_part(part: &Path, dir: &Path, name: &str) -> std::io::Result<PathBuf> {
    let destination = available_destination(dir, name);
    tokio::fs::rename(part, &destination).await?;
    Ok(destination)
}

/// User-facing message for a download the server refused.
///
/// JSON bodies give their `detailedMessage`; anything else is reported as an
/// incomplete download.
pub(crate) async fn rejection_message(id: &str, response: Response) -> String {
    let status = response.status().as_u16();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    let body = read_body_text(response, ERROR_BODY_LIMIT)
        .await
        .unwrap_or_default();
    log::warn!("download {}: status {} - {}", id, status, body);

    let message = if is_json { detailed_message(&body) } else { None };
    message.unwrap_or_else(|| INCOMPLETE_DOWNLOAD.to_string())
}

/// Report a transport failure to `listener` and turn it into an outcome.
pub(crate) fn fetch_failure(
    id: &str,
    listener: &dyn TransferListener,
    err: FetchError,
) -> TransferOutcome {
    let message = match err {
        FetchError::Cancelled => {
            listener.abort();
            return TransferOutcome::Cancelled;
        }
        FetchError::Network(e) => {
            log::warn!("download {}: {}", id, e);
            NETWORK_ERROR.to_string()
        }
        FetchError::Io(e) => format!("Failed to write file: {}", e),
    };
    listener.error(&message);
    TransferOutcome::Failed(message)
}

pub struct DownloadRequest {
    params: DownloadParams,
    url: String,
    client: ConsoleClient,
    dest_dir: PathBuf,
    listener: Arc<dyn TransferListener>,
    cancel: CancellationToken,
}

impl DownloadRequest {
    pub fn new(
        params: DownloadParams,
        url: String,
        client: ConsoleClient,
        dest_dir: PathBuf,
        listener: Arc<dyn TransferListener>,
    ) -> Self {
        Self {
            params,
            url,
            client,
            dest_dir,
            listener,
            cancel: CancellationToken::new(),
        }
    }

    fn fail(&self, message: &str) -> TransferOutcome {
        self.listener.error(message);
        TransferOutcome::Failed(message.to_string())
    }

    fn fetch_failed(&self, err: FetchError) -> TransferOutcome {
        fetch_failure(&self.params.id, self.listener.as_ref(), err)
    }

    async fn run(&self) -> TransferOutcome {
        let request = self.client.request(Method::GET, &self.url);
        let response = match send_cancellable(request, &self.cancel).await {
            Ok(response) => response,
            Err(e) => return self.fetch_failed(e),
        };

        if response.status().as_u16() != 200 {
            let message = rejection_message(&self.params.id, response).await;
            return self.fail(&message);
        }

        let part = part_path(&self.dest_dir, &self.params.id);
        let listener = self.listener.clone();
        let total = self.params.file_size;
        let outcome = match stream_to_file(response, &part, &self.cancel, |received| {
            listener.progress(percent_rounded(received, total))
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => return self.fetch_failed(e),
        };

        let complete =
            is_folder(&self.params.object_path) || outcome.received_bytes == self.params.file_size;
        if !complete {
            let _ = tokio::fs::remove_file(&part).await;
            let err = ConsoleError::SizeMismatch {
                expected: self.params.file_size,
                received: outcome.received_bytes,
            };
            log::warn!("download {}: {}", self.params.id, err);
            return self.fail(INCOMPLETE_DOWNLOAD);
        }

        let name = filename_from_disposition(outcome.content_disposition.as_deref());
        match finish_part(&part, &self.dest_dir, &name).await {
            Ok(saved) => {
                log::info!("download {}: saved {}", self.params.id, saved.display());
                self.listener.complete();
                TransferOutcome::Completed
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                self.fail(&format!("Failed to save {}: {}", name, e))
            }
        }
    }
}

impl Transfer for DownloadRequest {
    fn kind(&self) -> TransferKind {
        TransferKind::Download
    }

    fn send(self: Arc<Self>) -> JoinHandle<TransferOutcome> {
        tokio::spawn(async move {
            let outcome = self.run().await;
            remove_trace(&self.params.id).await;
            outcome
        })
    }

    fn abort(&self) {
        self.cancel.cancel();
    }
}
