//! Browsable folders derived from session policy resources, for users who may
//! read inside a bucket but not list it.

use crate::api::types::{BucketObject, PermissionResource};

fn applies_to_bucket(resource: &str, bucket: &str) -> bool {
    resource.ends_with(&format!(":{}", bucket)) || resource.contains(&format!(":{}/", bucket))
}

fn push_unique(items: &mut Vec<BucketObject>, name: String) {
    if !items.iter().any(|i| i.name == name) {
        items.push(BucketObject::folder(name));
    }
}

/// Folder placeholders reachable from `current_path`.
///
/// Returns `None` when no resource applies to `bucket`.
pub fn permission_items(
    bucket: &str,
    current_path: &str,
    resources: &[PermissionResource],
) -> Option<Vec<BucketObject>> {
    let for_bucket: Vec<&PermissionResource> = resources
        .iter()
        .filter(|p| {
            p.resource
                .as_deref()
                .is_some_and(|r| applies_to_bucket(r, bucket))
        })
        .collect();
    if for_bucket.is_empty() {
        return None;
    }

    let current: Vec<&str> = current_path.split('/').collect();
    let segment_at = |index: usize| current.get(index).copied().filter(|s| !s.is_empty());
    let mut items: Vec<BucketObject> = Vec::new();

    for permission in for_bucket {
        let resource = permission.resource.as_deref().unwrap_or_default();
        let url = resource.rsplit(':').next().unwrap_or_default();
        let url_parts: Vec<&str> = url.split('/').collect();

        // Resource paths below the bucket itself
        if url_parts.len() > 1 {
            for (index, part) in url_parts.iter().enumerate() {
                if *part == "*" {
                    break;
                }
                match segment_at(index) {
                    Some(segment) if segment != *part => break,
                    Some(_) => {}
                    None => push_unique(&mut items, format!("{}/", part)),
                }
            }
        }

        let by_prefix = matches!(
            permission.condition_operator.as_deref(),
            Some("StringEquals") | Some("StringLike")
        );
        if !by_prefix {
            continue;
        }

        let clean_current = current_path.strip_suffix('/').unwrap_or(current_path);
        for prefix in permission.prefixes.iter().flatten() {
            if prefix.is_empty() {
                continue;
            }
            if !current_path.is_empty() && !prefix.starts_with(clean_current) {
                continue;
            }

            let mut route: Vec<&str> = Vec::new();
            for (index, part) in prefix.split('/').enumerate() {
                if part.is_empty() || part.contains('*') {
                    break;
                }
                if Some(part) != current.get(index).copied() {
                    let lead = if route.is_empty() {
                        String::new()
                    } else {
                        format!("{}/", route.join("/"))
                    };
                    push_unique(&mut items, format!("{}{}/", lead, part));
                    break;
                }
                route.push(part);
            }
        }
    }

    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(arn: &str, operator: Option<&str>, prefixes: &[&str]) -> PermissionResource {
        PermissionResource {
            resource: Some(arn.to_string()),
            condition_operator: operator.map(str::to_string),
            prefixes: Some(prefixes.iter().map(|p| p.to_string()).collect()),
        }
    }

    fn names(items: &[BucketObject]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn unrelated_resources_yield_none() {
        let resources = vec![resource("arn:aws:s3:::other/*", None, &[])];
        assert!(permission_items("photos", "", &resources).is_none());
        assert!(permission_items("photos", "", &[]).is_none());
    }

    #[test]
    fn resource_path_segments_become_folders() {
        let resources = vec![resource("arn:aws:s3:::photos/2024/*", None, &[])];
        let items = permission_items("photos", "", &resources).unwrap();
        assert_eq!(names(&items), vec!["photos/", "2024/"]);
    }

    #[test]
    fn condition_prefixes_offer_the_next_folder_once() {
        let resources = vec![
            resource(
                "arn:aws:s3:::photos",
                Some("StringLike"),
                &["team/alice/*", "team/bob/*"],
            ),
            resource("arn:aws:s3:::photos", Some("StringEquals"), &["team/alice/*"]),
        ];
        let root = permission_items("photos", "", &resources).unwrap();
        assert_eq!(names(&root), vec!["team/"]);

        let inside = permission_items("photos", "team/", &resources).unwrap();
        assert_eq!(names(&inside), vec!["team/alice/", "team/bob/"]);
    }

    #[test]
    fn other_operators_ignore_prefixes() {
        let resources = vec![resource("arn:aws:s3:::photos", Some("ForAnyValue"), &["x/"])];
        assert!(permission_items("photos", "", &resources).unwrap().is_empty());
    }
}
