//! Listing, selection, rewind and versions-mode state of the object browser

use super::object_manager::ObjectManager;
use crate::api::types::BucketObject;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewindState {
    pub enabled: bool,
    pub bucket: String,
    pub date: Option<DateTime<Utc>>,
}

/// Which listing the browser is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Live,
    Rewind,
    VersionsMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectBrowserState {
    pub rewind: RewindState,
    pub versions_mode: bool,
    pub versioned_file: String,
    pub selected_version: String,
    pub selected_objects: Vec<String>,
    pub search_objects: String,
    pub search_versions: String,
    pub show_deleted: bool,
    pub records: Vec<BucketObject>,
    pub versions: Vec<BucketObject>,
    pub object_details_open: bool,
    pub selected_internal_paths: Option<String>,
    pub simple_path: Option<String>,
    pub loading_objects: bool,
    pub loading_versions: bool,
    pub loading_object_info: bool,
    pub reload_objects_list: bool,
    pub download_rename_modal: Option<BucketObject>,
    pub object_manager: ObjectManager,
}

impl Default for ObjectBrowserState {
    fn default() -> Self {
        Self {
            rewind: RewindState::default(),
            versions_mode: false,
            versioned_file: String::new(),
            selected_version: String::new(),
            selected_objects: Vec::new(),
            search_objects: String::new(),
            search_versions: String::new(),
            show_deleted: false,
            records: Vec::new(),
            versions: Vec::new(),
            object_details_open: false,
            selected_internal_paths: None,
            simple_path: None,
            loading_objects: true,
            loading_versions: true,
            loading_object_info: true,
            reload_objects_list: false,
            download_rename_modal: None,
            object_manager: ObjectManager::default(),
        }
    }
}

impl ObjectBrowserState {
    pub fn view_mode(&self) -> ViewMode {
        if self.rewind.enabled {
            ViewMode::Rewind
        } else if self.versions_mode {
            ViewMode::VersionsMode
        } else {
            ViewMode::Live
        }
    }

    /// Any rewind toggle leaves versions mode; enabling also drops the selection.
    pub fn set_rewind_enable(&mut self, state: bool, bucket: &str, date: Option<DateTime<Utc>>) {
        self.rewind.enabled = state;
        self.rewind.bucket = bucket.to_string();
        self.rewind.date = date;

        self.versions_mode = false;
        self.versioned_file.clear();
        if state {
            self.selected_objects.clear();
            self.selected_version.clear();
        }
    }

    pub fn reset_rewind(&mut self) {
        self.rewind = RewindState::default();
    }

    pub fn set_versions_mode_enabled(&mut self, status: bool, object_name: Option<&str>) {
        if status {
            self.reset_rewind();
        }
        self.versions_mode = status;
        self.versioned_file = if status {
            object_name.unwrap_or_default().to_string()
        } else {
            String::new()
        };
        self.selected_version.clear();
    }

    pub fn set_selected_version(&mut self, version_id: &str) {
        self.selected_version = version_id.to_string();
        if !version_id.is_empty() {
            self.selected_objects.clear();
        }
    }

    pub fn set_selected_objects(&mut self, objects: Vec<String>) {
        if objects != self.selected_objects {
            self.selected_version.clear();
        }
        self.selected_objects = objects;
    }

    pub fn set_object_details_view(&mut self, open: bool) {
        self.object_details_open = open;
        if !open {
            self.selected_internal_paths = None;
        }
    }

    /// Records whose names are currently selected, in listing order
    pub fn selected_records(&self) -> Vec<BucketObject> {
        self.records
            .iter()
            .filter(|r| self.selected_objects.contains(&r.name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn enabling_rewind_leaves_versions_mode_and_clears_selection() {
        let mut state = ObjectBrowserState::default();
        state.set_versions_mode_enabled(true, Some("a.txt"));
        state.set_selected_objects(vec!["a.txt".into()]);
        state.set_rewind_enable(true, "bucket", date());

        assert!(!state.versions_mode);
        assert!(state.versioned_file.is_empty());
        assert!(state.selected_objects.is_empty());
        assert_eq!(state.view_mode(), ViewMode::Rewind);
    }

    #[test]
    fn rewind_keeps_bucket_and_date_until_reset() {
        let mut state = ObjectBrowserState::default();
        state.set_rewind_enable(true, "photos", date());
        let snapshot = state.clone();
        assert_eq!(
            snapshot.rewind,
            RewindState {
                enabled: true,
                bucket: "photos".into(),
                date: date(),
            }
        );

        state.reset_rewind();
        assert_eq!(state.rewind, RewindState::default());
        assert_eq!(snapshot.rewind.date, date());
    }

    #[test]
    fn disabling_rewind_also_leaves_versions_mode() {
        let mut state = ObjectBrowserState::default();
        state.versions_mode = true;
        state.set_rewind_enable(false, "", None);
        assert!(!state.versions_mode);
        assert_eq!(state.view_mode(), ViewMode::Live);
    }

    #[test]
    fn versions_mode_leaves_rewind_and_clears_selected_version() {
        let mut state = ObjectBrowserState::default();
        state.set_rewind_enable(true, "bucket", date());
        state.selected_version = "v1".into();

        state.set_versions_mode_enabled(true, Some("a.txt"));
        assert!(!state.rewind.enabled);
        assert_eq!(state.versioned_file, "a.txt");
        assert!(state.selected_version.is_empty());
        assert_eq!(state.view_mode(), ViewMode::VersionsMode);

        state.set_versions_mode_enabled(false, Some("a.txt"));
        assert!(state.versioned_file.is_empty());
    }

    #[test]
    fn selecting_version_and_objects_are_mutually_exclusive() {
        let mut state = ObjectBrowserState::default();
        state.set_selected_objects(vec!["a".into(), "b".into()]);
        state.set_selected_version("v2");
        assert!(state.selected_objects.is_empty());

        state.set_selected_objects(vec!["a".into()]);
        assert!(state.selected_version.is_empty());
    }

    #[test]
    fn closing_details_clears_internal_path() {
        let mut state = ObjectBrowserState::default();
        state.selected_internal_paths = Some("dir/a.txt".into());
        state.set_object_details_view(true);
        assert!(state.selected_internal_paths.is_some());
        state.set_object_details_view(false);
        assert!(state.selected_internal_paths.is_none());
    }
}
