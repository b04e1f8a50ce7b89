//! Streaming HTTP transfer engine
//!
//! Shared by the upload and download drivers of the object browser:
//! - Upload bodies that report how many bytes have been handed to the connection
//! - Streamed downloads into a file with buffered writes and per-chunk progress
//! - Cooperative cancellation through `CancellationToken`
//! - Bounded reads of error bodies so a misbehaving server cannot exhaust memory

mod body;
mod fetch;
mod progress;

pub use body::{progress_body, UPLOAD_CHUNK_SIZE};
pub use fetch::{
    read_body_text, send_cancellable, stream_to_file, FetchError, FetchOutcome,
    WRITE_BUFFER_SIZE,
};
pub use progress::{percent_floor, percent_rounded};
pub use tokio_util::sync::CancellationToken;
