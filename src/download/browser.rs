use super::types::{DownloadParams, BROWSER_DOWNLOAD_NOTICE};
use super::worker::{fetch_failure, filename_from_disposition, finish_part, part_path, rejection_message};
use crate::api::ConsoleClient;
use crate::transfer::{remove_trace, Transfer, TransferKind, TransferListener, TransferOutcome};
use reqwest::Method;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use transfer_http::{send_cancellable, stream_to_file, CancellationToken};

/// Hand-off for objects too large to track: announces itself with a toast and
/// streams straight to disk without progress reports.
pub struct BrowserDownload {
    params: DownloadParams,
    url: String,
    client: ConsoleClient,
    dest_dir: PathBuf,
    listener: Arc<dyn TransferListener>,
    cancel: CancellationToken,
}

impl BrowserDownload {
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

    async fn run(&self) -> TransferOutcome {
        self.listener.toast(BROWSER_DOWNLOAD_NOTICE);

        let request = self.client.request(Method::GET, &self.url);
        let response = match send_cancellable(request, &self.cancel).await {
            Ok(response) => response,
            Err(e) => return fetch_failure(&self.params.id, self.listener.as_ref(), e),
        };
        if response.status().as_u16() != 200 {
            let message = rejection_message(&self.params.id, response).await;
            return self.fail(&message);
        }

        let part = part_path(&self.dest_dir, &self.params.id);
        let outcome = match stream_to_file(response, &part, &self.cancel, |_| {}).await {
            Ok(outcome) => outcome,
            Err(e) => return fetch_failure(&self.params.id, self.listener.as_ref(), e),
        };

        let name = filename_from_disposition(outcome.content_disposition.as_deref());
        match finish_part(&part, &self.dest_dir, &name).await {
            Ok(saved) => {
                log::info!("browser download {}: saved {}", self.params.id, saved.display());
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

impl Transfer for BrowserDownload {
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
