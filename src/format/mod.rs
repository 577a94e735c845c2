//! Output formatters: a per-record transform plus an end-of-run
//! summary, shared by every worker thread.

pub mod as_graph;
pub mod day;
pub mod prefix;
pub mod prefix_lock;
pub mod text;

pub use as_graph::{AsGraph, AsMapFormatter};
pub use day::DayFormatter;
pub use prefix::{read_series, PrefixEvent, PrefixHistory, UniquePrefixList, UniquePrefixSeries};
pub use prefix_lock::PrefixLockFormatter;
pub use text::TextFormatter;

use crate::error::ParserError;
use crate::models::RecordStack;
use crate::sink::SerialWriter;
use bytes::Bytes;
use std::sync::Arc;

/// Provenance of one record: the file it came from and its one-based
/// index within that file. Cheap to clone per record.
#[derive(Debug, Clone)]
pub struct RecordInfo {
    pub file: Arc<str>,
    pub msg_num: usize,
}

impl RecordInfo {
    pub fn new(file: Arc<str>, msg_num: usize) -> Self {
        RecordInfo { file, msg_num }
    }
}

/// A record formatter. `format` may be called concurrently from any
/// worker; whatever it returns is streamed through the dump sink
/// immediately. `summarize` runs exactly once after all workers have
/// joined and writes aggregate output through the sink captured at
/// construction.
pub trait Formatter: Send + Sync {
    fn format(
        &self,
        record: &RecordStack,
        info: &RecordInfo,
    ) -> Result<Option<Bytes>, ParserError>;

    fn summarize(&self);
}

/// Marshals the record view as one JSON object per line.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, record: &RecordStack, _info: &RecordInfo) -> Result<Option<Bytes>, ParserError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        Ok(Some(Bytes::from(line)))
    }

    fn summarize(&self) {}
}

/// Emits the raw record bytes verbatim, re-framing a filtered subset
/// into a valid MRT stream.
pub struct IdentityFormatter;

impl Formatter for IdentityFormatter {
    fn format(&self, record: &RecordStack, _info: &RecordInfo) -> Result<Option<Bytes>, ParserError> {
        Ok(Some(record.raw.clone()))
    }

    fn summarize(&self) {}
}

/// Select a formatter by its CLI name; unrecognized names fall back to
/// the text formatter.
pub fn make_formatter(name: &str, dump: &Arc<SerialWriter>, debug: bool) -> Box<dyn Formatter> {
    match name {
        "json" => Box::new(JsonFormatter),
        "id" => Box::new(IdentityFormatter),
        "day" => Box::new(DayFormatter::new(dump.clone())),
        "pup" => Box::new(UniquePrefixList::new(dump.clone(), debug)),
        "pts" => Box::new(UniquePrefixSeries::new(dump.clone())),
        "ml" => Box::new(AsMapFormatter::new(dump.clone())),
        "prefixlock" => Box::new(PrefixLockFormatter::new()),
        _ => Box::new(TextFormatter::new()),
    }
}
