//! In-memory record store.
//!
//! Holds every row of the dataset in file order. The store is built once at
//! startup and shared read-only between connection tasks behind an `Arc`,
//! so no locking is involved.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// One row of the dataset: statistics for a single region on a single date.
///
/// Values are kept exactly as they appear in the file; nothing is parsed as
/// a number. Field order here is the field order on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub positive: String,
    pub test: String,
    pub date: String,
    pub discharge: String,
    pub expire: String,
    pub admit: String,
    pub region: String,
}

/// Immutable, ordered collection of all loaded records
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Create a new store from rows in file order
    pub fn new(records: Vec<Record>) -> Arc<Self> {
        info!(records = records.len(), "Initializing record store");
        Arc::new(Self { records })
    }

    /// All records, in the order they were loaded
    #[cfg(test)]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a record with only the fields the matcher looks at filled in
    pub(crate) fn record(region: &str, date: &str) -> Record {
        Record {
            positive: "0".to_string(),
            test: "0".to_string(),
            date: date.to_string(),
            discharge: "0".to_string(),
            expire: "0".to_string(),
            admit: "0".to_string(),
            region: region.to_string(),
        }
    }

    #[test]
    fn test_store_preserves_order() {
        let store = RecordStore::new(vec![
            record("Sindh", "2020-06-01"),
            record("Punjab", "2020-06-01"),
            record("Balochistan", "2020-06-02"),
        ]);

        assert_eq!(store.len(), 3);
        let regions: Vec<&str> = store.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["Sindh", "Punjab", "Balochistan"]);
    }

    #[test]
    fn test_empty_store() {
        let store = RecordStore::new(Vec::new());
        assert!(store.is_empty());
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let store = RecordStore::new(vec![record("Sindh", "2020-06-01")]);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.records()[0].region.clone())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "Sindh");
        }
    }

    #[test]
    fn test_record_serializes_in_wire_order() {
        let json = serde_json::to_string(&record("Sindh", "2020-06-01")).unwrap();
        assert_eq!(
            json,
            r#"{"positive":"0","test":"0","date":"2020-06-01","discharge":"0","expire":"0","admit":"0","region":"Sindh"}"#
        );
    }
}
