//! Dataset loading.
//!
//! The dataset is a headerless CSV file with a fixed positional layout:
//!
//! ```text
//! positive,test,date,discharge,expire,region,admit
//! ```
//!
//! Note that region comes before admit in the file, the reverse of the
//! order records are serialized in. Loading is all-or-nothing: any I/O or
//! parse error aborts the load. Bytes that are not valid UTF-8 do not count
//! as a parse error; they are replaced with U+FFFD.

use crate::storage::Record;
use csv::{ByteRecord, ReaderBuilder};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COL_POSITIVE: usize = 0;
const COL_TEST: usize = 1;
const COL_DATE: usize = 2;
const COL_DISCHARGE: usize = 3;
const COL_EXPIRE: usize = 4;
const COL_REGION: usize = 5;
const COL_ADMIT: usize = 6;

/// Minimum number of fields every row must have
pub const MIN_FIELDS: usize = 7;

/// Load every row of the CSV file at `path`
pub fn load(path: &Path) -> Result<Vec<Record>, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::Open(path.to_path_buf(), e))?;
    let records = read_records(file)?;

    info!(path = %path.display(), records = records.len(), "Dataset loaded");
    Ok(records)
}

/// Parse records from any CSV source
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>, DatasetError> {
    let mut reader = ReaderBuilder::new().has_headers(false).from_reader(reader);

    let mut records = Vec::new();
    for result in reader.byte_records() {
        let row = result.map_err(DatasetError::Parse)?;
        records.push(parse_row(&row)?);
    }

    debug!(rows = records.len(), "Parsed dataset rows");
    Ok(records)
}

/// Map one CSV row onto a record by column position
fn parse_row(row: &ByteRecord) -> Result<Record, DatasetError> {
    if row.len() < MIN_FIELDS {
        return Err(DatasetError::ShortRow {
            line: row.position().map(|p| p.line()).unwrap_or(0),
            fields: row.len(),
        });
    }

    Ok(Record {
        positive: field(row, COL_POSITIVE),
        test: field(row, COL_TEST),
        date: field(row, COL_DATE),
        discharge: field(row, COL_DISCHARGE),
        expire: field(row, COL_EXPIRE),
        admit: field(row, COL_ADMIT),
        region: field(row, COL_REGION),
    })
}

fn field(row: &ByteRecord, index: usize) -> String {
    String::from_utf8_lossy(&row[index]).into_owned()
}

/// Dataset loading errors
#[derive(Debug)]
pub enum DatasetError {
    Open(PathBuf, std::io::Error),
    Parse(csv::Error),
    ShortRow { line: u64, fields: usize },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Open(path, e) => {
                write!(f, "Unable to read input file '{}': {}", path.display(), e)
            }
            DatasetError::Parse(e) => write!(f, "Unable to parse dataset as CSV: {}", e),
            DatasetError::ShortRow { line, fields } => write!(
                f,
                "Dataset row on line {} has {} fields, expected at least {}",
                line, fields, MIN_FIELDS
            ),
        }
    }
}

impl std::error::Error for DatasetError {}
