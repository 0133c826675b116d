//! core::version
//!
//! Ordering of dotted numeric version strings such as `1.2` or `1.10.0`.
//!
//! Components are compared left to right as integers. A component that does
//! not parse as an integer counts as `0` rather than being rejected, so
//! `1.x` sorts like `1.0`. When the common prefix is equal the shorter
//! version sorts first (`1.2 < 1.2.0`).
//!
//! # Example
//!
//! ```
//! use std::cmp::Ordering;
//! use cascade_merge::core::version::compare_versions;
//!
//! assert_eq!(compare_versions("1.2", "1.10"), Ordering::Less);
//! assert_eq!(compare_versions("2.0", "1.99"), Ordering::Greater);
//! assert_eq!(compare_versions("1.2", "1.2"), Ordering::Equal);
//! ```

use std::cmp::Ordering;

/// Compare two dotted version strings.
pub fn compare_versions(v1: &str, v2: &str) -> Ordering {
    let mut left = v1.split('.').map(component);
    let mut right = v2.split('.').map(component);

    loop {
        match (left.next(), right.next()) {
            (Some(a), Some(b)) => match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Sign form of [`compare_versions`]: `-1`, `0` or `1`.
pub fn compare(v1: &str, v2: &str) -> i32 {
    match compare_versions(v1, v2) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

// Lenient on purpose: malformed components are treated as zero.
fn component(part: &str) -> i64 {
    part.trim().parse().unwrap_or(0)
}
