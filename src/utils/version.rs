//! RPM version comparison.

use crate::model::PackageMetadata;
use std::cmp::Ordering;

/// Compare two version or release strings segment by segment.
///
/// Numeric segments compare numerically and sort after alphabetic ones,
/// `~` sorts before anything (pre-releases) and `^` sorts after the bare
/// version but before any further segment (post-release snapshots).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let one = a.as_bytes();
    let two = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    while i < one.len() || j < two.len() {
        while i < one.len() && !is_segment_start(one[i]) {
            i += 1;
        }
        while j < two.len() && !is_segment_start(two[j]) {
            j += 1;
        }

        let c1 = one.get(i).copied();
        let c2 = two.get(j).copied();

        if c1 == Some(b'~') || c2 == Some(b'~') {
            if c1 != Some(b'~') {
                return Ordering::Greater;
            }
            if c2 != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if c1 == Some(b'^') || c2 == Some(b'^') {
            if c1.is_none() {
                return Ordering::Less;
            }
            if c2.is_none() {
                return Ordering::Greater;
            }
            if c1 != Some(b'^') {
                return Ordering::Greater;
            }
            if c2 != Some(b'^') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        let (Some(first), Some(_)) = (c1, c2) else {
            break;
        };

        let numeric = first.is_ascii_digit();
        let take = |s: &[u8], start: usize| -> usize {
            let mut end = start;
            while end < s.len()
                && if numeric {
                    s[end].is_ascii_digit()
                } else {
                    s[end].is_ascii_alphabetic()
                }
            {
                end += 1;
            }
            end
        };

        let end1 = take(one, i);
        let end2 = take(two, j);
        let mut seg1 = &one[i..end1];
        let mut seg2 = &two[j..end2];
        i = end1;
        j = end2;

        // Segment types differ: numbers are newer than letters
        if seg2.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        if numeric {
            seg1 = trim_leading_zeros(seg1);
            seg2 = trim_leading_zeros(seg2);
            match seg1.len().cmp(&seg2.len()) {
                Ordering::Equal => {}
                other => return other,
            }
        }

        match seg1.cmp(seg2) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    match (i >= one.len(), j >= two.len()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

/// Compare two packages by epoch, version and release.
pub fn compare_evr(a: &PackageMetadata, b: &PackageMetadata) -> Ordering {
    a.epoch
        .unwrap_or(0)
        .cmp(&b.epoch.unwrap_or(0))
        .then_with(|| compare_versions(&a.version, &b.version))
        .then_with(|| compare_versions(&a.release, &b.release))
}

const fn is_segment_start(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'~' || c == b'^'
}

fn trim_leading_zeros(seg: &[u8]) -> &[u8] {
    let start = seg.iter().position(|&c| c != b'0').unwrap_or(seg.len());
    &seg[start..]
}
