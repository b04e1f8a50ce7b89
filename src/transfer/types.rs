//! Transfer handles and their payloads

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Objects above this size (50 GiB) skip managed downloads and stream untracked
pub const BROWSER_DOWNLOAD_THRESHOLD: u64 = 53_687_091_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Upload,
    Download,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::Upload => write!(f, "upload"),
            TransferKind::Download => write!(f, "download"),
        }
    }
}

/// How a transfer task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

impl TransferOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed(_))
    }
}

/// Multipart payload of an upload, kept in the registry beside its call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    /// Multipart field name; the console names it after the file size
    pub field_name: String,
    pub file_name: String,
    pub source: PathBuf,
    pub size: u64,
    pub content_type: Option<String>,
}

/// A registered in-flight request.
///
/// `send` starts the request on a tokio task. `abort` is cooperative: the task
/// notices it, reports the cancellation and clears its registry entries.
pub trait Transfer: Send + Sync {
    fn kind(&self) -> TransferKind;

    fn send(self: Arc<Self>) -> JoinHandle<TransferOutcome>;

    fn abort(&self);
}

/// Lifecycle callbacks of a single transfer
pub trait TransferListener: Send + Sync {
    fn progress(&self, percent: u32);

    fn complete(&self);

    fn error(&self, message: &str);

    fn abort(&self);

    fn toast(&self, _message: &str) {}
}
