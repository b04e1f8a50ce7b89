//! Transfer list shown by the object manager panel

use crate::transfer::TransferKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One tracked upload or download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    /// Registry ID of the call (8 alphanumerics)
    pub id: String,
    /// Identity used by every reducer
    pub instance_id: String,
    pub bucket_name: String,
    pub prefix: String,
    pub kind: TransferKind,
    pub percentage: u32,
    pub done: bool,
    pub waiting_for_file: bool,
    pub failed: bool,
    pub cancelled: bool,
    pub error_message: String,
}

impl TransferItem {
    /// Fresh item as dispatched right before the request starts
    pub fn new(
        id: impl Into<String>,
        instance_id: impl Into<String>,
        bucket_name: impl Into<String>,
        prefix: impl Into<String>,
        kind: TransferKind,
    ) -> Self {
        Self {
            id: id.into(),
            instance_id: instance_id.into(),
            bucket_name: bucket_name.into(),
            prefix: prefix.into(),
            kind,
            percentage: 0,
            done: false,
            waiting_for_file: true,
            failed: false,
            cancelled: false,
            error_message: String::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.done || self.failed || self.cancelled
    }

    pub fn status(&self) -> TransferStatus {
        if self.cancelled {
            TransferStatus::Cancelled
        } else if self.failed {
            TransferStatus::Failed
        } else if self.done {
            TransferStatus::Completed
        } else if self.waiting_for_file {
            TransferStatus::Pending
        } else {
            TransferStatus::InProgress
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Pending => write!(f, "pending"),
            TransferStatus::InProgress => write!(f, "in_progress"),
            TransferStatus::Completed => write!(f, "completed"),
            TransferStatus::Failed => write!(f, "failed"),
            TransferStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<&str> for TransferStatus {
    fn from(s: &str) -> Self {
        match s {
            "in_progress" => TransferStatus::InProgress,
            "completed" => TransferStatus::Completed,
            "failed" => TransferStatus::Failed,
            "cancelled" => TransferStatus::Cancelled,
            _ => TransferStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectManager {
    pub objects_to_manage: Vec<TransferItem>,
    pub manager_open: bool,
    pub new_items: bool,
}

impl ObjectManager {
    fn position(&self, instance_id: &str) -> Option<usize> {
        let found = self
            .objects_to_manage
            .iter()
            .position(|item| item.instance_id == instance_id);
        if found.is_none() {
            log::debug!("object manager: unknown instance {}", instance_id);
        }
        found
    }

    pub fn find(&self, instance_id: &str) -> Option<&TransferItem> {
        self.objects_to_manage
            .iter()
            .find(|item| item.instance_id == instance_id)
    }

    pub fn set_new_object(&mut self, item: TransferItem) {
        self.objects_to_manage.push(item);
        self.new_items = true;
    }

    /// Returns true when the item changed.
    pub fn update_progress(&mut self, instance_id: &str, progress: u32) -> bool {
        let Some(idx) = self.position(instance_id) else {
            return false;
        };
        let item = &mut self.objects_to_manage[idx];
        if item.is_terminal() {
            return false;
        }
        let progress = progress.min(100);
        let changed = progress > item.percentage || item.waiting_for_file;
        item.percentage = item.percentage.max(progress);
        item.waiting_for_file = false;
        changed
    }

    pub fn complete_object(&mut self, instance_id: &str) -> bool {
        let Some(idx) = self.position(instance_id) else {
            return false;
        };
        let item = &mut self.objects_to_manage[idx];
        item.percentage = 100;
        item.waiting_for_file = false;
        item.done = true;
        true
    }

    pub fn fail_object(&mut self, instance_id: &str, message: &str) -> bool {
        let Some(idx) = self.position(instance_id) else {
            return false;
        };
        let item = &mut self.objects_to_manage[idx];
        item.failed = true;
        item.waiting_for_file = false;
        item.error_message = message.to_string();
        true
    }

    pub fn cancel_object_in_list(&mut self, instance_id: &str) -> bool {
        let Some(idx) = self.position(instance_id) else {
            return false;
        };
        let item = &mut self.objects_to_manage[idx];
        item.cancelled = true;
        item.done = true;
        item.percentage = 0;
        true
    }

    pub fn delete_from_list(&mut self, instance_id: &str) {
        self.objects_to_manage
            .retain(|item| item.instance_id != instance_id);
        if self.objects_to_manage.is_empty() {
            self.manager_open = false;
        }
    }

    /// Drop finished items (those at 100%)
    pub fn clean_list(&mut self) {
        self.objects_to_manage.retain(|item| item.percentage != 100);
        if self.objects_to_manage.is_empty() {
            self.manager_open = false;
        }
        self.new_items = false;
    }

    pub fn toggle_list(&mut self) {
        self.manager_open = !self.manager_open;
        self.new_items = false;
    }

    pub fn open_list(&mut self) {
        self.manager_open = true;
    }

    pub fn close_list(&mut self) {
        self.manager_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(ids: &[&str]) -> ObjectManager {
        let mut manager = ObjectManager::default();
        for id in ids {
            manager.set_new_object(TransferItem::new(
                "ABCDEFGH",
                *id,
                "bucket",
                format!("{}.txt", id),
                TransferKind::Upload,
            ));
        }
        manager
    }

    #[test]
    fn new_object_marks_new_items_and_waits_for_file() {
        let manager = manager_with(&["a"]);
        assert!(manager.new_items);
        let item = manager.find("a").unwrap();
        assert!(item.waiting_for_file);
        assert_eq!(item.status(), TransferStatus::Pending);
    }

    #[test]
    fn progress_never_decreases_and_stops_at_terminal_states() {
        let mut manager = manager_with(&["a", "b"]);

        assert!(manager.update_progress("a", 40));
        assert!(!manager.update_progress("a", 10));
        assert_eq!(manager.find("a").unwrap().percentage, 40);
        assert!(!manager.find("a").unwrap().waiting_for_file);

        manager.fail_object("a", "boom");
        assert!(!manager.update_progress("a", 90));
        assert_eq!(manager.find("a").unwrap().percentage, 40);
        assert_eq!(manager.find("a").unwrap().error_message, "boom");

        manager.cancel_object_in_list("b");
        assert!(!manager.update_progress("b", 50));
        let b = manager.find("b").unwrap();
        assert_eq!(b.percentage, 0);
        assert!(b.cancelled && b.done);
    }

    #[test]
    fn unknown_instances_are_ignored() {
        let mut manager = manager_with(&["a"]);
        assert!(!manager.update_progress("zzz", 10));
        assert!(!manager.complete_object("zzz"));
        assert!(!manager.fail_object("zzz", "x"));
        assert!(!manager.cancel_object_in_list("zzz"));
        assert_eq!(manager.objects_to_manage.len(), 1);
    }

    #[test]
    fn complete_sets_full_progress() {
        let mut manager = manager_with(&["a"]);
        manager.complete_object("a");
        let item = manager.find("a").unwrap();
        assert_eq!(item.percentage, 100);
        assert!(item.done && !item.waiting_for_file);
        assert_eq!(item.status(), TransferStatus::Completed);
    }

    #[test]
    fn clean_list_drops_finished_and_closes_when_empty() {
        let mut manager = manager_with(&["a", "b"]);
        manager.open_list();
        manager.complete_object("a");
        manager.clean_list();
        assert_eq!(manager.objects_to_manage.len(), 1);
        assert!(manager.manager_open);
        assert!(!manager.new_items);

        manager.delete_from_list("b");
        assert!(manager.objects_to_manage.is_empty());
        assert!(!manager.manager_open);
    }

    #[test]
    fn toggle_flips_open_and_clears_new_items() {
        let mut manager = manager_with(&["a"]);
        manager.toggle_list();
        assert!(manager.manager_open);
        assert!(!manager.new_items);
        manager.close_list();
        assert!(!manager.manager_open);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TransferStatus::Pending,
            TransferStatus::InProgress,
            TransferStatus::Completed,
            TransferStatus::Failed,
            TransferStatus::Cancelled,
        ] {
            assert_eq!(TransferStatus::from(status.to_string().as_str()), status);
        }
    }
}
