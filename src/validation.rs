//! Client-side form validation: bucket naming rules and quota amounts.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref VALID_BUCKET_CHARACTERS: Regex =
        Regex::new(r"^[a-z0-9][a-z0-9\.\-]{1,61}[a-z0-9]$").unwrap();
    static ref IP_ADDRESS_FORMAT: Regex = Regex::new(r"^(\d+\.){3}\d+$").unwrap();
    static ref QUOTA_AMOUNT: Regex = Regex::new(r"^\d*(?:\.\d{1,2})?$").unwrap();
}

const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
const K8S_UNITS: [&str; 7] = ["B", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketNameRule {
    Length,
    Characters,
    AdjacentPeriods,
    IpAddress,
    ReservedPrefix,
    ReservedSuffix,
    Unique,
}

impl BucketNameRule {
    pub fn message(&self) -> &'static str {
        match self {
            BucketNameRule::Length => {
                "Bucket names must be between 3 (min) and 63 (max) characters long."
            }
            BucketNameRule::Characters => {
                "Bucket names can consist only of lowercase letters, numbers, dots (.), and hyphens (-)."
            }
            BucketNameRule::AdjacentPeriods => {
                "Bucket names must not contain two adjacent periods, or a period adjacent to a hyphen."
            }
            BucketNameRule::IpAddress => {
                "Bucket names must not be formatted as an IP address (for example, 192.168.5.4)."
            }
            BucketNameRule::ReservedPrefix => "Bucket names must not start with the prefix xn--.",
            BucketNameRule::ReservedSuffix => {
                "Bucket names must not end with the suffix -s3alias. This suffix is reserved for access point alias names."
            }
            BucketNameRule::Unique => "Bucket names must be unique within a partition.",
        }
    }
}

impl fmt::Display for BucketNameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Rules broken by `name`; empty when the name is acceptable.
///
/// `existing` holds the bucket names already present.
pub fn bucket_name_errors(name: &str, existing: &[String]) -> Vec<BucketNameRule> {
    let length = name.chars().count();
    let checks = [
        (BucketNameRule::Length, (3..=63).contains(&length)),
        (BucketNameRule::Characters, VALID_BUCKET_CHARACTERS.is_match(name)),
        (
            BucketNameRule::AdjacentPeriods,
            !(name.contains(".-") || name.contains("-.") || name.contains("..")),
        ),
        (BucketNameRule::IpAddress, !IP_ADDRESS_FORMAT.is_match(name)),
        (BucketNameRule::ReservedPrefix, !name.starts_with("xn--")),
        (BucketNameRule::ReservedSuffix, !name.ends_with("-s3alias")),
        (BucketNameRule::Unique, !existing.iter().any(|b| b == name)),
    ];

    checks
        .into_iter()
        .filter(|(_, passed)| !passed)
        .map(|(rule, _)| rule)
        .collect()
}

/// Quota amounts allow at most two decimals.
pub fn is_valid_quota_amount(value: &str) -> bool {
    QUOTA_AMOUNT.is_match(value)
}

/// Convert `value` in `unit` to bytes; `from_k8s` selects the `Ki`/`Mi` names.
///
/// Unknown units and unparsable values give 0.
pub fn quota_to_bytes(value: &str, unit: &str, from_k8s: bool) -> u64 {
    let table = if from_k8s { &K8S_UNITS } else { &UNITS };
    let Some(power) = table.iter().position(|u| *u == unit) else {
        return 0;
    };
    let Ok(amount) = value.trim().parse::<f64>() else {
        return 0;
    };
    if !amount.is_finite() || amount < 0.0 {
        return 0;
    }
    (amount * 1024f64.powi(power as i32)) as u64
}
