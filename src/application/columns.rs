//! Column selection for listing responses.
//!
//! Clients may ask for a subset of fields via repeated `columns[]` query
//! parameters. Unknown names are ignored; when nothing known remains the
//! selection falls back to the full field set.

/// Fields an author payload can expose.
pub const AUTHOR_COLUMNS: &[&str] = &["id", "name", "bio", "birth_date", "created_at", "updated_at"];

/// Fields a book payload can expose.
pub const BOOK_COLUMNS: &[&str] = &[
    "id",
    "title",
    "description",
    "publish_date",
    "author_id",
    "created_at",
    "updated_at",
];

/// Reduce a requested column list to the known subset, deduplicated and
/// sorted. Returns `None` when no known column survives, which callers treat
/// as "all fields".
pub fn normalize(requested: &[String], known: &'static [&'static str]) -> Option<Vec<&'static str>> {
    let mut picked: Vec<&'static str> = Vec::new();
    for name in requested {
        if let Some(column) = known.iter().find(|column| **column == name.as_str()) {
            if !picked.contains(column) {
                picked.push(column);
            }
        }
    }
    if picked.is_empty() {
        None
    } else {
        picked.sort_unstable();
        Some(picked)
    }
}

/// Strip every field not named in `columns` from a serialized record.
pub fn project(value: &mut serde_json::Value, columns: &[&'static str]) {
    if let serde_json::Value::Object(map) = value {
        map.retain(|key, _| columns.iter().any(|column| *column == key));
    }
}
