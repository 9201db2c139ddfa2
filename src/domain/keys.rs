//! Storage key generation shared by every backend.
//!
//! Key format: `{unix_nanos}-{12 hex}-{file_name}`. The timestamp keeps keys
//! roughly time-ordered, the random part separates saves that land on the same
//! clock tick.

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const RANDOM_SUFFIX_LEN: usize = 12;
/// Longest sanitized name; with the key prefix it stays under the 255-byte filename limit.
pub const MAX_NAME_BYTES: usize = 200;
/// Extensions longer than this are treated as part of the stem when truncating.
const MAX_EXTENSION_BYTES: usize = 16;

/// Reduce an untrusted, client-declared file name to a single safe path component.
///
/// Returns `None` when nothing usable is left (empty, `.` or `..`). Long names
/// are cut to [`MAX_NAME_BYTES`], keeping the extension.
pub fn sanitize_file_name(declared: &str) -> Option<String> {
    let last = declared.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    match cleaned {
        "" | "." | ".." => None,
        name => Some(truncate_name(name)),
    }
}

fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME_BYTES {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_BYTES => name.split_at(dot),
        _ => (name, ""),
    };

    let mut end = MAX_NAME_BYTES - extension.len();
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", stem[..end].trim_end(), extension)
}

/// Build a storage key for an already sanitized file name.
pub fn unique_key(file_name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();

    format!("{}-{}-{}", nanos, &random[..RANDOM_SUFFIX_LEN], file_name)
}
