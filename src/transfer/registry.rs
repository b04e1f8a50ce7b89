use super::types::{Transfer, UploadForm};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::Instant;

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

// Global registry of in-flight calls and their upload forms
lazy_static::lazy_static! {
    static ref CALL_REGISTRY: Mutex<HashMap<String, Arc<dyn Transfer>>> = Mutex::new(HashMap::new());
    static ref FORM_REGISTRY: Mutex<HashMap<String, UploadForm>> = Mutex::new(HashMap::new());
}

/// Random alphanumeric ID; transfers use 8 characters
pub fn make_id(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Identity of a transfer item in the object manager list
pub fn make_identity(bucket: &str, object_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let salt: f64 = rand::random();
    urlencoding::encode(&format!("{}-{}-{}-{}", bucket, object_name, millis, salt)).into_owned()
}

pub async fn store_call_for_object_with_id(id: &str, call: Arc<dyn Transfer>) {
    CALL_REGISTRY.lock().await.insert(id.to_string(), call);
}

pub async fn call_for_object_id(id: &str) -> Option<Arc<dyn Transfer>> {
    CALL_REGISTRY.lock().await.get(id).cloned()
}

pub async fn store_form_data_with_id(id: &str, form: UploadForm) {
    FORM_REGISTRY.lock().await.insert(id.to_string(), form);
}

pub async fn form_data_for_object_id(id: &str) -> Option<UploadForm> {
    FORM_REGISTRY.lock().await.get(id).cloned()
}

/// Forget both the call and the form of `id`
pub async fn remove_trace(id: &str) {
    CALL_REGISTRY.lock().await.remove(id);
    FORM_REGISTRY.lock().await.remove(id);
}

/// Abort the call registered under `id`. Returns whether one was found.
pub async fn cancel_transfer(id: &str) -> bool {
    match call_for_object_id(id).await {
        Some(call) => {
            log::info!("transfer_cancel: {} ({})", id, call.kind());
            call.abort();
            true
        }
        None => {
            log::debug!("transfer_cancel: {} not registered", id);
            false
        }
    }
}

pub async fn active_transfer_ids() -> Vec<String> {
    CALL_REGISTRY.lock().await.keys().cloned().collect()
}

/// Abort every registered call; returns the IDs that were signalled.
pub async fn cancel_all_transfers() -> Vec<String> {
    let mut cancelled = Vec::new();
    for id in active_transfer_ids().await {
        if cancel_transfer(&id).await {
            cancelled.push(id);
        }
    }
    cancelled
}

/// Wait until none of `ids` is registered any more, polling until `timeout`.
///
/// A call leaves the registry only after it reported its outcome, so `true`
/// means every listener has heard the end of its transfer.
pub async fn settle_transfers(ids: &[String], timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let pending = {
            let calls = CALL_REGISTRY.lock().await;
            ids.iter().filter(|id| calls.contains_key(*id)).count()
        };
        if pending == 0 {
            return true;
        }
        if Instant::now() >= deadline {
            log::warn!("transfer_settle: {} transfers still running", pending);
            return false;
        }
        tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
    }
}
