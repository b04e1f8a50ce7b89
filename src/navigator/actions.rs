use crate::api::types::{BucketObject, DeleteFile};
use crate::api::{ConsoleClient, DeleteObjectParams};
use crate::errors::{ConsoleError, ConsoleResult, ErrorResponseHandler};
use crate::store::{Action, Store};
use reqwest::StatusCode;
use std::collections::HashMap;

const RETENTION_HINT: &str = "Please check retention mode and if object is WORM protected.";

/// Choices of the delete dialog
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Only valid when a single object is deleted
    pub version_id: Option<String>,
    pub all_versions: bool,
    pub non_current_versions: bool,
    /// Bypass governance retention
    pub bypass: bool,
    /// The bucket has a retention configuration; failures get a WORM hint
    pub retention_configured: bool,
}

fn status_text(err: &ConsoleError) -> String {
    match err {
        ConsoleError::Http { status, .. } => StatusCode::from_u16(*status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string()),
        other => other.to_string(),
    }
}

fn single_delete_failure(err: &ConsoleError, retention_configured: bool) -> ErrorResponseHandler {
    let hint = if retention_configured { RETENTION_HINT } else { "" };
    ErrorResponseHandler::new(
        format!("Could not delete object. {}. {}", status_text(err), hint),
        "",
    )
}

/// Delete the selected objects; names ending in `/` delete the whole prefix.
///
/// One object goes through the single delete endpoint, several through the
/// bulk one. Success asks the listing to reload, failure raises an error snack.
pub async fn delete_objects(
    client: &ConsoleClient,
    store: &Store,
    bucket: &str,
    objects: &[String],
    options: &DeleteOptions,
) -> ConsoleResult<()> {
    let result = match objects {
        [] => return Ok(()),
        [object] => {
            let params = DeleteObjectParams {
                prefix: object.clone(),
                version_id: options.version_id.clone(),
                recursive: object.ends_with('/'),
                all_versions: options.all_versions,
                non_current_versions: options.non_current_versions,
                bypass: options.bypass,
            };
            client
                .delete_object(bucket, &params)
                .await
                .map_err(|e| (single_delete_failure(&e, options.retention_configured), e))
        }
        _ => {
            let files: Vec<DeleteFile> = objects
                .iter()
                .map(|path| DeleteFile {
                    path: path.clone(),
                    version_id: Some(String::new()),
                    recursive: path.ends_with('/'),
                })
                .collect();
            client
                .delete_multiple_objects(bucket, &files, options.all_versions, options.bypass)
                .await
                .map_err(|e| (e.to_handler(), e))
        }
    };

    match result {
        Ok(()) => {
            log::info!("deleted {} objects from {}", objects.len(), bucket);
            store.dispatch(Action::SetSelectedObjects(Vec::new()));
            store.dispatch(Action::SetReloadObjectsList(true));
            Ok(())
        }
        Err((snack, err)) => {
            store.dispatch(Action::SetErrorSnackMessage(snack));
            Err(err)
        }
    }
}

/// Version ID sent with tag edits; single-node setups address the `null` version.
pub fn tag_version_id(object: &BucketObject, distributed: bool) -> String {
    if distributed {
        object.version_id.clone().unwrap_or_default()
    } else {
        "null".to_string()
    }
}

/// Merge `set` into the object's tags and drop `remove`, then save the result.
pub async fn update_object_tags(
    client: &ConsoleClient,
    store: &Store,
    bucket: &str,
    object: &BucketObject,
    set: &HashMap<String, String>,
    remove: &[String],
    distributed: bool,
) -> ConsoleResult<HashMap<String, String>> {
    let mut tags = object.tags.clone();
    tags.extend(set.iter().map(|(k, v)| (k.clone(), v.clone())));
    for key in remove {
        tags.remove(key);
    }

    let version_id = tag_version_id(object, distributed);
    match client
        .put_object_tags(bucket, &object.name, &version_id, tags.clone())
        .await
    {
        Ok(()) => {
            store.dispatch(Action::SetReloadObjectsList(true));
            Ok(tags)
        }
        Err(err) => {
            store.dispatch(Action::SetErrorSnackMessage(err.to_handler()));
            Err(err)
        }
    }
}
