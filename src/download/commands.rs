//! Download entry points used by the browser views and the CLI

use super::browser::BrowserDownload;
use super::types::{DownloadCall, DownloadParams, DownloadSelection, MAX_WINDOWS_NAME_LENGTH};
use super::worker::{available_destination, DownloadRequest};
use crate::api::types::BucketObject;
use crate::api::ConsoleClient;
use crate::errors::{ConsoleError, ErrorResponseHandler};
use crate::store::{Action, Store, TransferItem};
use crate::transfer::{
    make_id, make_identity, store_call_for_object_with_id, StoreListener, TransferKind,
    TransferListener, TransferOutcome, BROWSER_DOWNLOAD_THRESHOLD,
};
use chrono::{DateTime, Local};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use transfer_http::{stream_to_file, CancellationToken};

/// Build the call for one object; nothing is registered or started.
pub fn download(
    client: &ConsoleClient,
    dest_dir: &Path,
    params: DownloadParams,
    listener: Arc<dyn TransferListener>,
) -> DownloadCall {
    let url = client.download_url(
        &params.bucket,
        &params.object_path,
        params.version_id.as_deref(),
        params.override_file_name.as_deref(),
    );

    if params.file_size > BROWSER_DOWNLOAD_THRESHOLD {
        return DownloadCall::Browser(Arc::new(BrowserDownload::new(
            params,
            url,
            client.clone(),
            dest_dir.to_path_buf(),
            listener,
        )));
    }
    DownloadCall::Managed(Arc::new(DownloadRequest::new(
        params,
        url,
        client.clone(),
        dest_dir.to_path_buf(),
        listener,
    )))
}

/// Register, announce and start the download of one object.
pub async fn download_object(
    client: &ConsoleClient,
    store: &Store,
    dest_dir: &Path,
    bucket: &str,
    object: &BucketObject,
    override_file_name: Option<&str>,
) -> (String, JoinHandle<TransferOutcome>) {
    let identity = make_identity(bucket, &object.name);
    let id = make_id(8);

    let params = DownloadParams {
        id: id.clone(),
        bucket: bucket.to_string(),
        object_path: object.name.clone(),
        version_id: object.version_id.clone(),
        file_size: object.size.max(0) as u64,
        override_file_name: override_file_name.map(str::to_string),
    };
    let listener: Arc<dyn TransferListener> = Arc::new(StoreListener::new(store.clone(), &identity));
    let call = download(client, dest_dir, params, listener);

    store_call_for_object_with_id(&id, call.as_transfer()).await;
    store.dispatch(Action::SetNewObject(TransferItem::new(
        &id,
        &identity,
        bucket,
        &object.name,
        TransferKind::Download,
    )));

    (id, call.send())
}

/// `MM-dd-yyyy-HH-mm-ss_files_list.zip`
pub fn zip_file_name(now: DateTime<Local>) -> String {
    format!("{}_files_list.zip", now.format("%m-%d-%Y-%H-%M-%S"))
}

fn zip_failure_text(err: &ConsoleError) -> String {
    match err {
        ConsoleError::Http { status, .. } => StatusCode::from_u16(*status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string(),
        other => other.to_string(),
    }
}

/// Ask the server for a zip of `objects` and save it as `file_name`.
///
/// Failures become an error snack and yield `None`.
pub async fn download_selected_as_zip(
    client: &ConsoleClient,
    store: &Store,
    dest_dir: &Path,
    bucket: &str,
    objects: &[String],
    file_name: &str,
) -> Option<PathBuf> {
    let saved = async {
        let response = client.download_multiple_objects(bucket, objects).await?;
        let destination = available_destination(dest_dir, file_name);
        stream_to_file(response, &destination, &CancellationToken::new(), |_| {}).await?;
        Ok::<_, ConsoleError>(destination)
    }
    .await;

    match saved {
        Ok(path) => {
            log::info!("zip download: {} objects saved to {}", objects.len(), path.display());
            Some(path)
        }
        Err(err) => {
            store.dispatch(Action::SetErrorSnackMessage(ErrorResponseHandler::new(
                format!("Download of multiple files failed. {}", zip_failure_text(&err)),
                "",
            )));
            None
        }
    }
}

/// Download whatever is selected in the listing.
///
/// One object downloads directly; several are bundled into a zip, skipping
/// delete markers.
pub async fn download_selected(
    client: &ConsoleClient,
    store: &Store,
    dest_dir: &Path,
    bucket: &str,
) -> DownloadSelection {
    let selected = store.select(|s| s.object_browser.selected_records());

    match selected.as_slice() {
        [] => DownloadSelection::Nothing,
        [object] => {
            if cfg!(windows) && object.name.chars().count() > MAX_WINDOWS_NAME_LENGTH {
                store.dispatch(Action::SetDownloadRenameModal(Some(object.clone())));
                return DownloadSelection::RenameRequired(object.clone());
            }
            let (id, handle) = download_object(client, store, dest_dir, bucket, object, None).await;
            DownloadSelection::Single { id, handle }
        }
        many => {
            let names: Vec<String> = many
                .iter()
                .filter(|o| {
                    if o.delete_flag {
                        log::info!("Skipping {} from download.", o.name);
                    }
                    !o.delete_flag
                })
                .map(|o| o.name.clone())
                .collect();
            let file_name = zip_file_name(Local::now());
            DownloadSelection::Zip(
                download_selected_as_zip(client, store, dest_dir, bucket, &names, &file_name).await,
            )
        }
    }
}
