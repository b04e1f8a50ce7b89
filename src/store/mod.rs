//! Client-side state container
//!
//! Reducers run synchronously under one lock, in dispatch order. Observers
//! subscribe to a broadcast channel of `StoreEvent`s instead of polling.

pub mod browser;
pub mod object_manager;
pub mod system;

use crate::api::types::BucketObject;
use crate::errors::ErrorResponseHandler;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

pub use browser::{ObjectBrowserState, RewindState, ViewMode};
pub use object_manager::{ObjectManager, TransferItem, TransferStatus};
pub use system::{SnackKind, SnackMessage, SystemState};

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub object_browser: ObjectBrowserState,
    pub system: SystemState,
}

#[derive(Debug, Clone)]
pub enum Action {
    // object manager
    SetNewObject(TransferItem),
    UpdateProgress { instance_id: String, progress: u32 },
    CompleteObject(String),
    FailObject { instance_id: String, message: String },
    CancelObjectInList(String),
    DeleteFromList(String),
    CleanList,
    ToggleList,
    OpenList,
    CloseList,
    // browser
    SetRewindEnable {
        state: bool,
        bucket: String,
        date: Option<DateTime<Utc>>,
    },
    ResetRewind,
    SetVersionsModeEnabled {
        status: bool,
        object_name: Option<String>,
    },
    SetSelectedVersion(String),
    SetSelectedObjects(Vec<String>),
    SetSearchObjects(String),
    SetSearchVersions(String),
    SetShowDeletedObjects(bool),
    SetRecords(Vec<BucketObject>),
    SetVersions(Vec<BucketObject>),
    SetLoadingObjectsList(bool),
    SetLoadingVersions(bool),
    SetLoadingObjectInfo(bool),
    SetObjectDetailsView(bool),
    SetSelectedObjectView(Option<String>),
    SetSimplePath(String),
    SetReloadObjectsList(bool),
    SetDownloadRenameModal(Option<BucketObject>),
    // system
    SetSnackBarMessage(String),
    SetErrorSnackMessage(ErrorResponseHandler),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    TransferAdded(TransferItem),
    TransferProgress {
        instance_id: String,
        percentage: u32,
    },
    TransferStatusChanged {
        instance_id: String,
        status: TransferStatus,
        error: Option<String>,
    },
    Snack(SnackMessage),
    ListReload,
}

struct StoreInner {
    state: Mutex<AppState>,
    events: broadcast::Sender<StoreEvent>,
}

/// Shared handle; clones observe the same state
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn status_event(item: &TransferItem) -> StoreEvent {
    let status = item.status();
    let error = (!item.error_message.is_empty()).then(|| item.error_message.clone());
    match error.as_ref() {
        Some(err) => warn!("transfer_status: {} -> {} error={}", item.instance_id, status, err),
        None => info!("transfer_status: {} -> {}", item.instance_id, status),
    }
    StoreEvent::TransferStatusChanged {
        instance_id: item.instance_id.clone(),
        status,
        error,
    }
}

impl Store {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(AppState::default()),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    /// Read a piece of state without cloning all of it
    pub fn select<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&AppState) -> T,
    {
        f(&self.lock())
    }

    /// Apply `action` and broadcast what changed.
    pub fn dispatch(&self, action: Action) {
        let events = {
            let mut state = self.lock();
            reduce(&mut state, action)
        };
        for event in events {
            // No subscribers is fine
            let _ = self.inner.events.send(event);
        }
    }
}

fn reduce(state: &mut AppState, action: Action) -> Vec<StoreEvent> {
    let browser = &mut state.object_browser;
    let manager = &mut browser.object_manager;

    match action {
        Action::SetNewObject(item) => {
            info!(
                "transfer_added: {} {} {}/{}",
                item.instance_id, item.kind, item.bucket_name, item.prefix
            );
            manager.set_new_object(item.clone());
            vec![StoreEvent::TransferAdded(item)]
        }
        Action::UpdateProgress {
            instance_id,
            progress,
        } => {
            if !manager.update_progress(&instance_id, progress) {
                return Vec::new();
            }
            let percentage = manager
                .find(&instance_id)
                .map(|item| item.percentage)
                .unwrap_or_default();
            vec![StoreEvent::TransferProgress {
                instance_id,
                percentage,
            }]
        }
        Action::CompleteObject(instance_id) => {
            terminal_event(manager.complete_object(&instance_id), manager, &instance_id)
        }
        Action::FailObject {
            instance_id,
            message,
        } => terminal_event(
            manager.fail_object(&instance_id, &message),
            manager,
            &instance_id,
        ),
        Action::CancelObjectInList(instance_id) => terminal_event(
            manager.cancel_object_in_list(&instance_id),
            manager,
            &instance_id,
        ),
        Action::DeleteFromList(instance_id) => {
            manager.delete_from_list(&instance_id);
            Vec::new()
        }
        Action::CleanList => {
            manager.clean_list();
            Vec::new()
        }
        Action::ToggleList => {
            manager.toggle_list();
            Vec::new()
        }
        Action::OpenList => {
            manager.open_list();
            Vec::new()
        }
        Action::CloseList => {
            manager.close_list();
            Vec::new()
        }
        Action::SetRewindEnable {
            state: enabled,
            bucket,
            date,
        } => {
            browser.set_rewind_enable(enabled, &bucket, date);
            Vec::new()
        }
        Action::ResetRewind => {
            browser.reset_rewind();
            Vec::new()
        }
        Action::SetVersionsModeEnabled {
            status,
            object_name,
        } => {
            browser.set_versions_mode_enabled(status, object_name.as_deref());
            Vec::new()
        }
        Action::SetSelectedVersion(version_id) => {
            browser.set_selected_version(&version_id);
            Vec::new()
        }
        Action::SetSelectedObjects(objects) => {
            browser.set_selected_objects(objects);
            Vec::new()
        }
        Action::SetSearchObjects(search) => {
            browser.search_objects = search;
            Vec::new()
        }
        Action::SetSearchVersions(search) => {
            browser.search_versions = search;
            Vec::new()
        }
        Action::SetShowDeletedObjects(show) => {
            browser.show_deleted = show;
            Vec::new()
        }
        Action::SetRecords(records) => {
            browser.records = records;
            Vec::new()
        }
        Action::SetVersions(versions) => {
            browser.versions = versions;
            Vec::new()
        }
        Action::SetLoadingObjectsList(loading) => {
            browser.loading_objects = loading;
            Vec::new()
        }
        Action::SetLoadingVersions(loading) => {
            browser.loading_versions = loading;
            Vec::new()
        }
        Action::SetLoadingObjectInfo(loading) => {
            browser.loading_object_info = loading;
            Vec::new()
        }
        Action::SetObjectDetailsView(open) => {
            browser.set_object_details_view(open);
            Vec::new()
        }
        Action::SetSelectedObjectView(path) => {
            browser.selected_internal_paths = path;
            Vec::new()
        }
        Action::SetSimplePath(path) => {
            browser.simple_path = Some(path);
            Vec::new()
        }
        Action::SetReloadObjectsList(reload) => {
            browser.reload_objects_list = reload;
            if reload {
                vec![StoreEvent::ListReload]
            } else {
                Vec::new()
            }
        }
        Action::SetDownloadRenameModal(object) => {
            browser.download_rename_modal = object;
            Vec::new()
        }
        Action::SetSnackBarMessage(message) => {
            vec![StoreEvent::Snack(state.system.set_snack_bar_message(&message))]
        }
        Action::SetErrorSnackMessage(error) => {
            warn!(
                "error snack: {} {}",
                error.error_message, error.detailed_error
            );
            vec![StoreEvent::Snack(state.system.set_error_snack_message(&error))]
        }
    }
}

fn terminal_event(changed: bool, manager: &ObjectManager, instance_id: &str) -> Vec<StoreEvent> {
    if !changed {
        return Vec::new();
    }
    manager
        .find(instance_id)
        .map(|item| vec![status_event(item)])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferKind;

    fn item(instance: &str) -> TransferItem {
        TransferItem::new("ID123456", instance, "bucket", "a.txt", TransferKind::Download)
    }

    #[tokio::test]
    async fn dispatch_broadcasts_transfer_lifecycle() {
        let store = Store::new();
        let mut rx = store.subscribe();

        store.dispatch(Action::SetNewObject(item("one")));
        store.dispatch(Action::UpdateProgress {
            instance_id: "one".into(),
            progress: 30,
        });
        store.dispatch(Action::CompleteObject("one".into()));

        assert!(matches!(rx.recv().await.unwrap(), StoreEvent::TransferAdded(_)));
        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::TransferProgress {
                instance_id: "one".into(),
                percentage: 30
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::TransferStatusChanged {
                instance_id: "one".into(),
                status: TransferStatus::Completed,
                error: None
            }
        );
    }

    #[test]
    fn progress_is_monotonic_through_dispatch() {
        let store = Store::new();
        store.dispatch(Action::SetNewObject(item("one")));
        let mut seen = Vec::new();
        for pct in [10, 50, 20, 70, 70, 100] {
            store.dispatch(Action::UpdateProgress {
                instance_id: "one".into(),
                progress: pct,
            });
            seen.push(store.select(|s| {
                s.object_browser.object_manager.find("one").unwrap().percentage
            }));
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[test]
    fn failure_is_reported_with_message_and_snack_is_stored() {
        let store = Store::new();
        let mut rx = store.subscribe();
        store.dispatch(Action::SetNewObject(item("one")));
        store.dispatch(Action::FailObject {
            instance_id: "one".into(),
            message: "A network error occurred.".into(),
        });
        store.dispatch(Action::SetErrorSnackMessage(ErrorResponseHandler::new(
            "There were some errors during file upload",
            "Uploaded files s/t",
        )));

        let _ = rx.try_recv();
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::TransferStatusChanged {
                instance_id: "one".into(),
                status: TransferStatus::Failed,
                error: Some("A network error occurred.".into())
            }
        );
        let snack = store.snapshot().system.snack.unwrap();
        assert_eq!(snack.kind, SnackKind::Error);
        assert_eq!(snack.detailed_message, "Uploaded files s/t");
    }

    #[test]
    fn unknown_instance_emits_nothing() {
        let store = Store::new();
        let mut rx = store.subscribe();
        store.dispatch(Action::CompleteObject("ghost".into()));
        store.dispatch(Action::CancelObjectInList("ghost".into()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reload_request_is_broadcast() {
        let store = Store::new();
        let mut rx = store.subscribe();
        store.dispatch(Action::SetReloadObjectsList(true));
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::ListReload);
        assert!(store.select(|s| s.object_browser.reload_objects_list));
    }
}
