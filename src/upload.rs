//! Upload driver: one multipart POST per file with progress, cancellation and
//! object manager bookkeeping.

use crate::api::ConsoleClient;
use crate::errors::{detailed_message, ApiError, ConsoleError, ConsoleResult, ErrorResponseHandler};
use crate::store::{Action, Store, TransferItem};
use crate::transfer::{
    form_data_for_object_id, make_id, make_identity, remove_trace, store_call_for_object_with_id,
    store_form_data_with_id, StoreListener, Transfer, TransferKind, TransferListener,
    TransferOutcome, UploadForm,
};
use futures_util::future::join_all;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::task::JoinHandle;
use transfer_http::{percent_floor, progress_body, send_cancellable, CancellationToken, FetchError};

const ERROR_BODY_LIMIT: usize = 64 * 1024;
const NETWORK_ERROR: &str = "A network error occurred.";

/// A local file picked for upload.
///
/// `drop_path` mirrors a drag-and-drop path and `relative_path` a folder-picker
/// path; both include the file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadFile {
    pub source: PathBuf,
    pub name: String,
    pub drop_path: String,
    pub relative_path: String,
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn from_path(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source,
            name,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub total: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn succeeded(&self) -> usize {
        self.total - self.failed
    }
}

/// Destination prefix of an upload.
///
/// Drag-and-drop paths win over folder-picker paths, which win over
/// `folder_path`. Only the directories of that relative path are used.
pub fn upload_prefix_path(
    path: &str,
    folder_path: &str,
    drop_path: &str,
    relative_path: &str,
) -> String {
    let relative = if !drop_path.is_empty() {
        drop_path.strip_prefix("./").unwrap_or(drop_path)
    } else if !relative_path.is_empty() {
        relative_path
    } else {
        folder_path
    };

    if path.is_empty() && relative.is_empty() {
        return String::new();
    }

    let segments: Vec<&str> = relative.split('/').collect();
    let final_folder = segments[..segments.len() - 1].join("/");
    let path_clean = path.strip_suffix('/').unwrap_or(path);

    let mut prefix = path_clean.to_string();
    if !path_clean.ends_with('/') && !final_folder.is_empty() && !final_folder.starts_with('/') {
        prefix.push('/');
    }
    prefix.push_str(&final_folder);
    if !final_folder.ends_with('/') || (final_folder.trim().is_empty() && !path.ends_with('/')) {
        prefix.push('/');
    }
    prefix
}

/// Object key for `name` under `prefix`, without a leading `/`
pub fn upload_key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
        .trim_start_matches('/')
        .to_string()
}

/// User-facing message for a rejected upload
fn rejection_message(status: u16, body: &str, default_message: &str) -> String {
    if status == 413 {
        return "Error - File size too large".to_string();
    }
    if body.trim().is_empty() {
        return default_message.to_string();
    }
    match serde_json::from_str::<ApiError>(body) {
        Ok(_) => detailed_message(body).unwrap_or_else(|| default_message.to_string()),
        Err(_) => "something went wrong".to_string(),
    }
}

/// A registered multipart upload; its form lives in the registry under `id`.
pub struct UploadRequest {
    id: String,
    url: String,
    client: ConsoleClient,
    listener: Arc<dyn TransferListener>,
    cancel: CancellationToken,
    default_error: String,
}

impl UploadRequest {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        client: ConsoleClient,
        listener: Arc<dyn TransferListener>,
        multiple_files: bool,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            client,
            listener,
            cancel: CancellationToken::new(),
            default_error: format!(
                "An error occurred while uploading the file{}.",
                if multiple_files { "s" } else { "" }
            ),
        }
    }

    fn fail(&self, message: &str) -> TransferOutcome {
        self.listener.error(message);
        TransferOutcome::Failed(message.to_string())
    }

    async fn build_form(&self, form: &UploadForm) -> Result<Form, String> {
        let file = File::open(&form.source)
            .await
            .map_err(|e| format!("Failed to open {}: {}", form.source.display(), e))?;

        let listener = self.listener.clone();
        let total = form.size;
        let body = progress_body(file, move |sent| listener.progress(percent_floor(sent, total)));

        let mut part = Part::stream_with_length(body, form.size).file_name(form.file_name.clone());
        if let Some(content_type) = &form.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| format!("Invalid content type {}: {}", content_type, e))?;
        }
        Ok(Form::new().part(form.field_name.clone(), part))
    }

    async fn run(&self) -> TransferOutcome {
        let Some(form) = form_data_for_object_id(&self.id).await else {
            return self.fail("Upload form not found");
        };
        let multipart = match self.build_form(&form).await {
            Ok(multipart) => multipart,
            Err(e) => return self.fail(&e),
        };

        let request = self
            .client
            .request(Method::POST, &self.url)
            .multipart(multipart);

        let response = match send_cancellable(request, &self.cancel).await {
            Ok(response) => response,
            Err(FetchError::Cancelled) => {
                self.listener.abort();
                return TransferOutcome::Cancelled;
            }
            Err(e) => {
                log::warn!("upload {}: {}", self.id, e);
                return self.fail(NETWORK_ERROR);
            }
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            log::info!("upload {}: {} done ({})", self.id, form.file_name, status);
            self.listener.complete();
            return TransferOutcome::Completed;
        }

        let body = transfer_http::read_body_text(response, ERROR_BODY_LIMIT)
            .await
            .unwrap_or_default();
        log::warn!("upload {}: status {} - {}", self.id, status, body);
        self.fail(&rejection_message(status, &body, &self.default_error))
    }
}

impl Transfer for UploadRequest {
    fn kind(&self) -> TransferKind {
        TransferKind::Upload
    }

    fn send(self: Arc<Self>) -> JoinHandle<TransferOutcome> {
        tokio::spawn(async move {
            let outcome = self.run().await;
            remove_trace(&self.id).await;
            outcome
        })
    }

    fn abort(&self) {
        self.cancel.cancel();
    }
}

/// Register, announce and start the upload of one file.
///
/// Returns the registry ID and the task handle.
pub async fn upload_object(
    client: &ConsoleClient,
    store: &Store,
    bucket: &str,
    file: &UploadFile,
    path: &str,
    folder_path: &str,
    multiple_files: bool,
) -> ConsoleResult<(String, JoinHandle<TransferOutcome>)> {
    let metadata = tokio::fs::metadata(&file.source).await?;
    if !metadata.is_file() {
        return Err(ConsoleError::Validation(format!(
            "{} is not a file",
            file.source.display()
        )));
    }

    let prefix = upload_prefix_path(path, folder_path, &file.drop_path, &file.relative_path);
    let key = upload_key(&prefix, &file.name);
    let id = make_id(8);
    let identity = make_identity(bucket, &prefix);

    let listener: Arc<dyn TransferListener> = Arc::new(StoreListener::new(store.clone(), &identity));
    let call = Arc::new(UploadRequest::new(
        &id,
        client.upload_url(bucket, &key),
        client.clone(),
        listener,
        multiple_files,
    ));

    store_call_for_object_with_id(&id, call.clone()).await;
    let mut item = TransferItem::new(&id, &identity, bucket, &key, TransferKind::Upload);
    item.waiting_for_file = false;
    store.dispatch(Action::SetNewObject(item));
    store_form_data_with_id(
        &id,
        UploadForm {
            field_name: metadata.len().to_string(),
            file_name: file.name.clone(),
            source: file.source.clone(),
            size: metadata.len(),
            content_type: file.content_type.clone(),
        },
    )
    .await;

    Ok((id, call.send()))
}

/// Upload every file concurrently and report once all have settled.
pub async fn upload_objects(
    client: &ConsoleClient,
    store: &Store,
    bucket: &str,
    files: &[UploadFile],
    path: &str,
    folder_path: &str,
) -> UploadSummary {
    let path_prefix = if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    };
    let multiple = files.len() > 1;

    store.dispatch(Action::OpenList);

    let mut failed = 0;
    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        match upload_object(client, store, bucket, file, &path_prefix, folder_path, multiple).await {
            Ok((_, handle)) => handles.push(handle),
            Err(e) => {
                log::warn!("upload of {} not started: {}", file.source.display(), e);
                failed += 1;
            }
        }
    }

    for outcome in join_all(handles).await {
        match outcome {
            Ok(TransferOutcome::Completed) => {}
            Ok(_) => failed += 1,
            Err(e) => {
                log::warn!("upload task panicked: {}", e);
                failed += 1;
            }
        }
    }

    let summary = UploadSummary {
        total: files.len(),
        failed,
    };
    if summary.failed > 0 {
        store.dispatch(Action::SetErrorSnackMessage(ErrorResponseHandler::new(
            "There were some errors during file upload",
            format!("Uploaded files {}/{}", summary.succeeded(), summary.total),
        )));
    }
    store.dispatch(Action::SetReloadObjectsList(true));
    summary
}

/// All regular files below `root`, with folder-picker relative paths
/// that start with the folder's own name. Hidden entries are skipped.
pub async fn collect_folder_files(root: &Path) -> ConsoleResult<Vec<UploadFile>> {
    if !root.is_dir() {
        return Err(ConsoleError::Validation(format!(
            "Not a directory: {}",
            root.display()
        )));
    }
    let folder_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }

            let metadata = tokio::fs::metadata(&path).await?;
            if metadata.is_dir() {
                stack.push(path);
            } else if metadata.is_file() {
                let relative = path
                    .strip_prefix(root)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                let mut file = UploadFile::from_path(&path);
                file.relative_path = if folder_name.is_empty() {
                    relative
                } else {
                    format!("{}/{}", folder_name, relative)
                };
                files.push(file);
            }
        }
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TransferStatus;
    use std::io::Write;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn prefix_for_flat_pick_at_root_is_empty() {
        assert_eq!(upload_prefix_path("", "", "", ""), "");
        assert_eq!(upload_key("", "a.txt"), "a.txt");
    }

    #[test]
    fn prefix_inside_current_path() {
        assert_eq!(upload_prefix_path("docs/", "", "", ""), "docs/");
        assert_eq!(upload_prefix_path("docs", "", "", ""), "docs/");
    }

    #[test]
    fn drop_path_wins_over_picker_path() {
        let prefix = upload_prefix_path("docs/", "", "/photos/2024/a.jpg", "other/a.jpg");
        assert_eq!(prefix, "docs/photos/2024/");
        assert_eq!(upload_key(&prefix, "a.jpg"), "docs/photos/2024/a.jpg");
    }

    #[test]
    fn picker_relative_path_at_root_gets_leading_slash_trimmed() {
        let prefix = upload_prefix_path("", "", "", "photos/a.jpg");
        assert_eq!(prefix, "/photos/");
        assert_eq!(upload_key(&prefix, "a.jpg"), "photos/a.jpg");
    }

    #[test]
    fn folder_path_is_used_last() {
        assert_eq!(upload_prefix_path("", "backup/x", "", ""), "/backup/");
    }

    #[test]
    fn rejection_messages() {
        let default = "An error occurred while uploading the file.";
        assert_eq!(rejection_message(413, "", default), "Error - File size too large");
        assert_eq!(
            rejection_message(400, r#"{"detailedMessage":"Bucket is read only"}"#, default),
            "Bucket is read only"
        );
        assert_eq!(rejection_message(500, "<html>", default), "something went wrong");
        assert_eq!(rejection_message(500, "", default), default);
    }

    fn temp_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(content).unwrap();
        tmp
    }

    #[tokio::test]
    async fn successful_upload_completes_item_and_clears_registry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/buckets/b/objects/upload"))
            .and(query_param("prefix", "docs/report.txt"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = temp_file(b"quarterly numbers");
        let mut file = UploadFile::from_path(tmp.path());
        file.name = "report.txt".into();

        let client = ConsoleClient::new(server.uri(), None, false).unwrap();
        let store = Store::new();
        let (id, handle) = upload_object(&client, &store, "b", &file, "docs/", "", false)
            .await
            .unwrap();

        assert_eq!(handle.await.unwrap(), TransferOutcome::Completed);
        assert!(crate::transfer::call_for_object_id(&id).await.is_none());
        assert!(form_data_for_object_id(&id).await.is_none());

        let state = store.snapshot().object_browser;
        let item = &state.object_manager.objects_to_manage[0];
        assert_eq!(item.prefix, "docs/report.txt");
        assert_eq!(item.status(), TransferStatus::Completed);
        assert_eq!(item.percentage, 100);
    }

    #[tokio::test]
    async fn rejected_uploads_are_summarised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/buckets/b/objects/upload"))
            .and(query_param("prefix", "big.bin"))
            .respond_with(ResponseTemplate::new(413))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/buckets/b/objects/upload"))
            .and(query_param("prefix", "ok.txt"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let big = temp_file(&[0u8; 2048]);
        let ok = temp_file(b"fine");
        let mut big_file = UploadFile::from_path(big.path());
        big_file.name = "big.bin".into();
        let mut ok_file = UploadFile::from_path(ok.path());
        ok_file.name = "ok.txt".into();

        let client = ConsoleClient::new(server.uri(), None, false).unwrap();
        let store = Store::new();
        let summary =
            upload_objects(&client, &store, "b", &[big_file, ok_file], "", "").await;

        assert_eq!(summary, UploadSummary { total: 2, failed: 1 });
        let state = store.snapshot();
        let failed = state
            .object_browser
            .object_manager
            .objects_to_manage
            .iter()
            .find(|i| i.failed)
            .unwrap();
        assert_eq!(failed.error_message, "Error - File size too large");
        let snack = state.system.snack.unwrap();
        assert_eq!(snack.message, "There were some errors during file upload");
        assert_eq!(snack.detailed_message, "Uploaded files 1/2");
        assert!(state.object_browser.reload_objects_list);
        assert!(state.object_browser.object_manager.manager_open);
    }

    #[tokio::test]
    async fn cancelled_upload_is_marked_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
            .mount(&server)
            .await;

        let tmp = temp_file(b"slow");
        let client = ConsoleClient::new(server.uri(), None, false).unwrap();
        let store = Store::new();
        let (id, handle) =
            upload_object(&client, &store, "b", &UploadFile::from_path(tmp.path()), "", "", false)
                .await
                .unwrap();

        assert!(crate::transfer::cancel_transfer(&id).await);
        assert_eq!(handle.await.unwrap(), TransferOutcome::Cancelled);

        let state = store.snapshot().object_browser;
        let item = &state.object_manager.objects_to_manage[0];
        assert!(item.cancelled && item.done);
        assert!(crate::transfer::call_for_object_id(&id).await.is_none());
    }

    #[tokio::test]
    async fn folder_files_carry_folder_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("album");
        std::fs::create_dir_all(root.join("2024")).unwrap();
        std::fs::write(root.join("cover.jpg"), b"x").unwrap();
        std::fs::write(root.join("2024").join("a.jpg"), b"y").unwrap();
        std::fs::write(root.join(".DS_Store"), b"z").unwrap();

        let files = collect_folder_files(&root).await.unwrap();
        let relative: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(relative, vec!["album/2024/a.jpg", "album/cover.jpg"]);
        assert_eq!(
            upload_key(
                &upload_prefix_path("", "", "", &files[0].relative_path),
                &files[0].name
            ),
            "album/2024/a.jpg"
        );
    }
}
