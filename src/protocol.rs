//! JSON query protocol: request decoding and response encoding.
//!
//! After the server sends [`BANNER`], a connection carries a stream of JSON
//! values with no framing other than the value boundaries themselves:
//!
//! ```text
//! Client: {"query": {"region": "sindh"}}
//! Server: {
//!         	"response": [
//!         		{ "positive": "...", ..., "region": "Sindh" }
//!         	]
//!         }
//! ```
//!
//! Requests may arrive split across reads or several in a single read, so
//! decoding works on a growing buffer and reports how many bytes a complete
//! request used.

use crate::storage::Record;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;
use std::fmt;

/// Usage text written to every client as soon as it connects (not JSON)
pub const BANNER: &str = "Connected with the server...\n\
In order to search write query in json format like this:\n\
Usage: {query:{region:sindh}}    !enclose each word in double qoutes!";

/// A client request: `{"query": {...}}`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryRequest {
    pub query: Option<Query>,
}

/// Region and date filters. Missing, `null` and empty all mean "not set".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pub date: Option<String>,
    pub region: Option<String>,
}

/// Object keys are matched ignoring ASCII case, so `"Query"` and `"REGION"`
/// are accepted. When several spellings of one key are present, the exact
/// lowercase spelling wins; otherwise the last one seen wins.
struct FoldedField<T> {
    value: Option<T>,
    exact: bool,
}

impl<T> FoldedField<T> {
    fn new() -> Self {
        FoldedField {
            value: None,
            exact: false,
        }
    }

    fn accept(&mut self, value: Option<T>, exact: bool) {
        if exact || !self.exact {
            self.value = value;
            self.exact = exact;
        }
    }
}

/// `Some(true)` for an exact match, `Some(false)` for a case-folded one
fn match_key(key: &str, name: &str) -> Option<bool> {
    if key == name {
        Some(true)
    } else if key.eq_ignore_ascii_case(name) {
        Some(false)
    } else {
        None
    }
}

impl<'de> Deserialize<'de> for QueryRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RequestVisitor;

        impl<'de> Visitor<'de> for RequestVisitor {
            type Value = QueryRequest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a request object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<QueryRequest, A::Error> {
                let mut query = FoldedField::new();
                while let Some(key) = map.next_key::<String>()? {
                    match match_key(&key, "query") {
                        Some(exact) => query.accept(map.next_value::<Option<Query>>()?, exact),
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(QueryRequest { query: query.value })
            }
        }

        deserializer.deserialize_map(RequestVisitor)
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QueryVisitor;

        impl<'de> Visitor<'de> for QueryVisitor {
            type Value = Query;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a query object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Query, A::Error> {
                let mut date = FoldedField::new();
                let mut region = FoldedField::new();
                while let Some(key) = map.next_key::<String>()? {
                    if let Some(exact) = match_key(&key, "date") {
                        date.accept(map.next_value::<Option<String>>()?, exact);
                    } else if let Some(exact) = match_key(&key, "region") {
                        region.accept(map.next_value::<Option<String>>()?, exact);
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(Query {
                    date: date.value,
                    region: region.value,
                })
            }
        }

        deserializer.deserialize_map(QueryVisitor)
    }
}

impl Query {
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or("")
    }

    pub fn date(&self) -> &str {
        self.date.as_deref().unwrap_or("")
    }
}

impl QueryRequest {
    /// The filters carried by this request, empty if `query` was absent
    pub fn into_query(self) -> Query {
        self.query.unwrap_or_default()
    }
}

/// Response envelope: `{"response": [...]}` or `{"response": null}`
#[derive(Debug, Serialize)]
pub struct QueryResponse<'a> {
    pub response: Option<Vec<&'a Record>>,
}

/// Result of trying to decode one request from the front of a buffer
#[derive(Debug)]
pub enum DecodeResult {
    /// A full request and the number of bytes it consumed
    Complete(QueryRequest, usize),
    /// The buffer holds only whitespace or a partial value
    Incomplete,
    /// The buffer starts with something that can never become a request
    Error(serde_json::Error),
}

/// Decode the first JSON request in `buf`.
///
/// A top-level `null` decodes as an empty request.
pub fn decode_request(buf: &[u8]) -> DecodeResult {
    let mut stream = serde_json::Deserializer::from_slice(buf).into_iter::<Option<QueryRequest>>();

    match stream.next() {
        None => DecodeResult::Incomplete,
        Some(Ok(request)) => {
            DecodeResult::Complete(request.unwrap_or_default(), stream.byte_offset())
        }
        Some(Err(e)) if e.is_eof() => DecodeResult::Incomplete,
        Some(Err(e)) => DecodeResult::Error(e),
    }
}

/// Encode a response as tab-indented JSON followed by a newline.
///
/// `<`, `>`, `&`, U+2028 and U+2029 inside strings are written as-is, not
/// as `\u` escapes.
pub fn encode_response(response: &QueryResponse<'_>) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::with_capacity(256);
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    response.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}
