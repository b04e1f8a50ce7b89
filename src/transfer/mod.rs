//! In-flight transfer bookkeeping
//!
//! - `registry`: ID -> call/form tables used for cancellation and lookup
//! - `types`: the `Transfer` handle trait, outcomes and upload forms
//! - `StoreListener`: turns transfer callbacks into store actions

pub mod registry;
mod types;

use crate::store::{Action, Store};

pub use registry::{
    active_transfer_ids, call_for_object_id, cancel_all_transfers, cancel_transfer,
    form_data_for_object_id, make_id, make_identity, remove_trace, settle_transfers,
    store_call_for_object_with_id, store_form_data_with_id,
};
pub use types::{
    Transfer, TransferKind, TransferListener, TransferOutcome, UploadForm,
    BROWSER_DOWNLOAD_THRESHOLD,
};

/// Routes the callbacks of one transfer to the object manager list
#[derive(Clone)]
pub struct StoreListener {
    store: Store,
    instance_id: String,
}

impl StoreListener {
    pub fn new(store: Store, instance_id: impl Into<String>) -> Self {
        Self {
            store,
            instance_id: instance_id.into(),
        }
    }
}

impl TransferListener for StoreListener {
    fn progress(&self, percent: u32) {
        self.store.dispatch(Action::UpdateProgress {
            instance_id: self.instance_id.clone(),
            progress: percent,
        });
    }

    fn complete(&self) {
        self.store
            .dispatch(Action::CompleteObject(self.instance_id.clone()));
    }

    fn error(&self, message: &str) {
        self.store.dispatch(Action::FailObject {
            instance_id: self.instance_id.clone(),
            message: message.to_string(),
        });
    }

    fn abort(&self) {
        self.store
            .dispatch(Action::CancelObjectInList(self.instance_id.clone()));
    }

    fn toast(&self, message: &str) {
        self.store
            .dispatch(Action::SetSnackBarMessage(message.to_string()));
    }
}
