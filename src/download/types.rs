//! Download request parameters and handles

use super::browser::BrowserDownload;
use super::worker::DownloadRequest;
use crate::api::types::BucketObject;
use crate::transfer::{Transfer, TransferOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const NETWORK_ERROR: &str = "A network error occurred.";
pub const INCOMPLETE_DOWNLOAD: &str = "Unexpected response, download incomplete.";
pub const BROWSER_DOWNLOAD_NOTICE: &str = "File download will be handled directly by the browser.";

/// Names longer than this need a rename before saving on Windows
pub const MAX_WINDOWS_NAME_LENGTH: usize = 200;

/// What to fetch and under which registry ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadParams {
    pub id: String,
    pub bucket: String,
    pub object_path: String,
    pub version_id: Option<String>,
    /// Expected size in bytes; folders report 0
    pub file_size: u64,
    pub override_file_name: Option<String>,
}

/// Either a tracked download or an untracked one for very large objects
#[derive(Clone)]
pub enum DownloadCall {
    Managed(Arc<DownloadRequest>),
    Browser(Arc<BrowserDownload>),
}

impl DownloadCall {
    pub fn is_browser(&self) -> bool {
        matches!(self, DownloadCall::Browser(_))
    }

    pub fn as_transfer(&self) -> Arc<dyn Transfer> {
        match self {
            DownloadCall::Managed(call) => call.clone(),
            DownloadCall::Browser(call) => call.clone(),
        }
    }

    pub fn send(&self) -> JoinHandle<TransferOutcome> {
        self.as_transfer().send()
    }
}

/// Result of downloading the current selection
#[derive(Debug)]
pub enum DownloadSelection {
    Nothing,
    /// The single selected object must be renamed first
    RenameRequired(BucketObject),
    Single {
        id: String,
        handle: JoinHandle<TransferOutcome>,
    },
    Zip(Option<PathBuf>),
}
