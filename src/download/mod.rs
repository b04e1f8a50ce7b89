//! Object downloads
//!
//! - `commands`: single-object, selection and zip entry points
//! - `worker`: tracked download into a `.part` file with size check
//! - `browser`: untracked hand-off for objects above the size threshold

pub mod commands;
mod browser;
mod types;
mod worker;

pub use browser::BrowserDownload;
pub use commands::{
    download, download_object, download_selected, download_selected_as_zip, zip_file_name,
};
pub use types::{
    DownloadCall, DownloadParams, DownloadSelection, BROWSER_DOWNLOAD_NOTICE, INCOMPLETE_DOWNLOAD,
    MAX_WINDOWS_NAME_LENGTH, NETWORK_ERROR,
};
pub use worker::DownloadRequest;
