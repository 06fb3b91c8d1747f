//! Query matching over the record store.
//!
//! A query filters by exactly one field:
//! - date only: case-sensitive substring match on the date
//! - region only: case-insensitive substring match on the region
//!
//! A query with neither field set returns `None` so the full dataset is never
//! dumped. A query with both fields set matches nothing: there is no combined
//! filter, and existing clients see an empty list for it.

use crate::storage::{Record, RecordStore};

/// Find the records matching a region or date filter, in store order
pub fn find<'a>(store: &'a RecordStore, region: &str, date: &str) -> Option<Vec<&'a Record>> {
    match (region.is_empty(), date.is_empty()) {
        (true, true) => None,
        (true, false) => Some(store.iter().filter(|r| r.date.contains(date)).collect()),
        (false, true) => {
            let region = upper_chars(region);
            Some(
                store
                    .iter()
                    .filter(|r| upper_chars(&r.region).contains(&region))
                    .collect(),
            )
        }
        (false, false) => Some(Vec::new()),
    }
}

/// Uppercase one char at a time. Chars whose uppercase form is more than one
/// char (`ß` -> `SS`) are kept as they are, so string lengths in chars never
/// change.
fn upper_chars(s: &str) -> String {
    s.chars()
        .map(|c| {
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) => u,
                _ => c,
            }
        })
        .collect()
}
