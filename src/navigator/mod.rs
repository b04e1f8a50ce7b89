//! Object listing and version navigation
//!
//! Pure helpers decide what to show (filter, sort, version views) and which
//! listing query fits the current browser state. The loaders run those queries
//! against the console and write the results back into the store. Deletes and
//! tag edits ask the listing to reload once the console accepts them.

mod actions;
mod permissions;

use crate::api::types::BucketObject;
use crate::api::{ConsoleClient, ListObjectsParams};
use crate::errors::ConsoleResult;
use crate::store::{Action, ObjectBrowserState, Store};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

pub use actions::{delete_objects, tag_version_id, update_object_tags, DeleteOptions};
pub use permissions::permission_items;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Name,
    LastModified,
    Size,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortField::Name),
            "last_modified" => Ok(SortField::LastModified),
            "size" => Ok(SortField::Size),
            other => Err(format!("unknown sort field `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionSort {
    #[default]
    Date,
    Size,
}

fn modified_millis(object: &BucketObject) -> Option<i64> {
    DateTime::parse_from_rfc3339(&object.last_modified)
        .ok()
        .map(|d| d.timestamp_millis())
}

// Zero or missing sizes rank below every real size
fn listing_size(object: &BucketObject) -> i64 {
    if object.size == 0 {
        -1
    } else {
        object.size
    }
}

/// Comparator for the listing table
pub fn sort_list_objects(field: SortField) -> fn(&BucketObject, &BucketObject) -> Ordering {
    match field {
        SortField::Name => |a, b| a.name.cmp(&b.name),
        SortField::LastModified => |a, b| modified_millis(a).cmp(&modified_millis(b)),
        SortField::Size => |a, b| listing_size(a).cmp(&listing_size(b)),
    }
}

/// Case-insensitive substring match on object names
pub fn filter_records(records: &[BucketObject], search: &str) -> Vec<BucketObject> {
    if search.is_empty() {
        return records.to_vec();
    }
    let needle = search.to_lowercase();
    records
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Filter, sort ascending, then reverse for descending order
pub fn visible_records(
    records: &[BucketObject],
    search: &str,
    field: SortField,
    direction: SortDirection,
) -> Vec<BucketObject> {
    let mut visible = filter_records(records, search);
    visible.sort_by(sort_list_objects(field));
    if direction == SortDirection::Desc {
        visible.reverse();
    }
    visible
}

/// Versions whose ID contains `search`; entries without an ID are dropped.
pub fn filter_versions(versions: &[BucketObject], search: &str) -> Vec<BucketObject> {
    versions
        .iter()
        .filter(|v| {
            v.version_id
                .as_deref()
                .is_some_and(|id| id.contains(search))
        })
        .cloned()
        .collect()
}

pub fn sort_versions(versions: &mut [BucketObject], by: VersionSort) {
    match by {
        VersionSort::Size => versions.sort_by_key(|v| v.size),
        VersionSort::Date => versions.sort_by(|a, b| modified_millis(b).cmp(&modified_millis(a))),
    }
}

pub fn total_space(versions: &[BucketObject]) -> i64 {
    versions.iter().map(|v| v.size.max(0)).sum()
}

/// The `is_latest` entry, or an empty placeholder
pub fn latest_version(versions: &[BucketObject]) -> BucketObject {
    versions
        .iter()
        .find(|v| v.is_latest)
        .cloned()
        .unwrap_or_default()
}

/// Versions panel content for the current search
pub fn versions_view(state: &ObjectBrowserState, by: VersionSort) -> Vec<BucketObject> {
    let mut view = filter_versions(&state.versions, &state.search_versions);
    sort_versions(&mut view, by);
    view
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingQuery {
    Live { prefix: String, with_versions: bool },
    Rewind { date: DateTime<Utc>, prefix: String },
}

/// Rewind applies only to the bucket it was enabled for.
pub fn listing_query(state: &ObjectBrowserState, bucket: &str, path: &str) -> ListingQuery {
    if state.rewind.enabled && state.rewind.bucket == bucket {
        if let Some(date) = state.rewind.date {
            return ListingQuery::Rewind {
                date,
                prefix: path.to_string(),
            };
        }
    }
    ListingQuery::Live {
        prefix: path.to_string(),
        with_versions: state.show_deleted,
    }
}

/// Fetch the listing for `path` into `records`.
pub async fn load_objects(
    client: &ConsoleClient,
    store: &Store,
    bucket: &str,
    path: &str,
) -> ConsoleResult<Vec<BucketObject>> {
    store.dispatch(Action::SetLoadingObjectsList(true));
    let query = store.select(|s| listing_query(&s.object_browser, bucket, path));
    log::debug!("load_objects: {} {:?}", bucket, query);

    let result = match query {
        ListingQuery::Rewind { date, prefix } => {
            let prefix = (!prefix.is_empty()).then_some(prefix.as_str());
            client.get_bucket_rewind(bucket, &date, prefix).await
        }
        ListingQuery::Live {
            prefix,
            with_versions,
        } => {
            let params = ListObjectsParams {
                prefix: (!prefix.is_empty()).then_some(prefix),
                with_versions,
                ..Default::default()
            };
            client.list_objects(bucket, &params).await
        }
    };

    store.dispatch(Action::SetLoadingObjectsList(false));
    store.dispatch(Action::SetReloadObjectsList(false));
    match result {
        Ok(records) => {
            store.dispatch(Action::SetRecords(records.clone()));
            Ok(records)
        }
        Err(err) => {
            store.dispatch(Action::SetErrorSnackMessage(err.to_handler()));
            Err(err)
        }
    }
}

/// Fetch the versions of one object and return its current entry.
///
/// Unversioned buckets yield the plain object and an empty version list.
pub async fn load_versions(
    client: &ConsoleClient,
    store: &Store,
    bucket: &str,
    object_name: &str,
    versioned: bool,
) -> ConsoleResult<BucketObject> {
    store.dispatch(Action::SetLoadingVersions(true));
    let params = ListObjectsParams {
        prefix: Some(object_name.to_string()),
        with_versions: versioned,
        ..Default::default()
    };
    let result = client.list_objects(bucket, &params).await;
    store.dispatch(Action::SetLoadingVersions(false));

    let objects = match result {
        Ok(objects) => objects,
        Err(err) => {
            store.dispatch(Action::SetErrorSnackMessage(err.to_handler()));
            return Err(err);
        }
    };

    // The API may return neighbours sharing the prefix
    let matching: Vec<BucketObject> = objects
        .into_iter()
        .filter(|o| o.name == object_name)
        .collect();

    if versioned {
        let latest = latest_version(&matching);
        store.dispatch(Action::SetVersions(matching));
        Ok(latest)
    } else {
        store.dispatch(Action::SetVersions(Vec::new()));
        Ok(matching.into_iter().next().unwrap_or_default())
    }
}
