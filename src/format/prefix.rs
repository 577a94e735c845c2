//! Unique-prefix formatters: per-prefix event histories keyed by radix
//! key, reduced to top-level prefixes at summary time.

use crate::error::ParserError;
use crate::format::{Formatter, RecordInfo};
use crate::models::{NetworkPrefix, RecordStack};
use crate::radix::{ip_to_radix_key, retain_top_level};
use crate::sink::SerialWriter;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

/// One observed routing event for a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixEvent {
    pub timestamp: i64,
    pub advertised: bool,
    pub as_path: Vec<u32>,
}

/// The history of one prefix: canonical prefix string, where it was
/// first seen, and its events in observation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixHistory {
    pub prefix: String,
    pub file: String,
    pub msg_num: usize,
    pub events: Vec<PrefixEvent>,
}

impl PrefixHistory {
    fn new(prefix: String, info: &RecordInfo, event: PrefixEvent) -> Self {
        PrefixHistory {
            prefix,
            file: info.file.to_string(),
            msg_num: info.msg_num,
            events: vec![event],
        }
    }

    fn add_event(&mut self, event: PrefixEvent) {
        self.events.push(event);
    }

    /// The `prefix unix-timestamp` summary line, with provenance
    /// appended when debug annotations are on.
    fn first_seen_line(&self, debug: bool) -> String {
        let mut line = self.prefix.clone();
        if let Some(first) = self.events.first() {
            line.push_str(&format!(" {}", first.timestamp));
        }
        if debug {
            line.push_str(&format!(" {}[{}]", self.file, self.msg_num));
        }
        line
    }
}

/// Shared accumulation used by both unique-prefix formatters. Prefixes
/// of mask 1 are skipped; they are noise in real archives. A mask-0
/// route keys the tree root and covers everything at reduction time.
fn ingest(
    state: &Mutex<HashMap<String, PrefixHistory>>,
    record: &RecordStack,
    info: &RecordInfo,
    earliest_wins: bool,
) {
    let timestamp = record.unix_timestamp();
    let as_path = record.as_path().unwrap_or_default();

    let mut add = |routes: Vec<NetworkPrefix>, advertised: bool| {
        for route in routes {
            if route.prefix.prefix_len() == 1 {
                continue;
            }
            let key = ip_to_radix_key(&route.prefix);
            let event = PrefixEvent {
                timestamp,
                advertised,
                as_path: as_path.clone(),
            };
            let mut map = state.lock().unwrap();
            match map.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(PrefixHistory::new(route.to_string(), info, event));
                }
                Entry::Occupied(mut slot) => {
                    let history = slot.get_mut();
                    if earliest_wins {
                        if history.events[0].timestamp > timestamp {
                            *history = PrefixHistory::new(route.to_string(), info, event);
                        }
                    } else {
                        history.add_event(event);
                    }
                }
            }
        }
    };

    add(record.advertised_prefixes(), true);
    add(record.withdrawn_prefixes(), false);
}

/// Reduce to top-level prefixes and return the survivors in radix-key
/// order for deterministic output.
fn reduce_sorted(mut map: HashMap<String, PrefixHistory>) -> Vec<PrefixHistory> {
    retain_top_level(&mut map);
    let mut entries: Vec<(String, PrefixHistory)> = map.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().map(|(_, history)| history).collect()
}

/// `pup`: keeps only the earliest-timestamped event per prefix and
/// emits one `prefix unix-timestamp` line per surviving top-level
/// prefix.
pub struct UniquePrefixList {
    state: Mutex<HashMap<String, PrefixHistory>>,
    out: Arc<SerialWriter>,
    debug: bool,
}

impl UniquePrefixList {
    pub fn new(out: Arc<SerialWriter>, debug: bool) -> Self {
        UniquePrefixList {
            state: Mutex::new(HashMap::new()),
            out,
            debug,
        }
    }
}

impl Formatter for UniquePrefixList {
    fn format(&self, record: &RecordStack, info: &RecordInfo) -> Result<Option<Bytes>, ParserError> {
        ingest(&self.state, record, info, true);
        Ok(None)
    }

    fn summarize(&self) {
        let map = std::mem::take(&mut *self.state.lock().unwrap());
        for history in reduce_sorted(map) {
            let line = history.first_seen_line(self.debug) + "\n";
            let _ = self.out.write_str(&line);
        }
    }
}

/// `pts`: appends every event to its prefix's history and serializes
/// the surviving top-level histories as a length-prefixed binary
/// stream, the input of downstream series analysis.
pub struct UniquePrefixSeries {
    state: Mutex<HashMap<String, PrefixHistory>>,
    out: Arc<SerialWriter>,
}

impl UniquePrefixSeries {
    pub fn new(out: Arc<SerialWriter>) -> Self {
        UniquePrefixSeries {
            state: Mutex::new(HashMap::new()),
            out,
        }
    }
}

impl Formatter for UniquePrefixSeries {
    fn format(&self, record: &RecordStack, info: &RecordInfo) -> Result<Option<Bytes>, ParserError> {
        ingest(&self.state, record, info, false);
        Ok(None)
    }

    fn summarize(&self) {
        let map = std::mem::take(&mut *self.state.lock().unwrap());
        for mut history in reduce_sorted(map) {
            // events arrive in cross-worker observation order; the
            // serialized series is sorted by time
            history.events.sort_by_key(|e| e.timestamp);
            match encode_series_record(&history) {
                Ok(bytes) => {
                    let _ = self.out.write(&bytes);
                }
                Err(e) => log::error!("cannot serialize history for {}: {}", history.prefix, e),
            }
        }
    }
}

/// Encode one history as a u32 length prefix followed by its JSON
/// serialization. Self-describing and round-trippable by [read_series].
pub fn encode_series_record(history: &PrefixHistory) -> Result<Bytes, ParserError> {
    let payload = serde_json::to_vec(history)?;
    let mut bytes = BytesMut::with_capacity(4 + payload.len());
    bytes.put_u32(payload.len() as u32);
    bytes.put_slice(&payload);
    Ok(bytes.freeze())
}

/// Companion reader for the series stream: decodes histories until a
/// clean EOF at a record boundary.
pub fn read_series<R: Read>(mut reader: R) -> Result<Vec<PrefixHistory>, ParserError> {
    let mut histories = Vec::new();
    loop {
        let mut len_bytes = [0u8; 4];
        match reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(ParserError::IoError(e)),
        }
        let len = u32::from_be_bytes(len_bytes) as usize;
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                ParserError::TruncatedMsg("series record shorter than its length".to_string())
            } else {
                ParserError::IoError(e)
            }
        })?;
        histories.push(serde_json::from_slice(&payload).map_err(|e| {
            ParserError::ParseError(format!("malformed series record: {}", e))
        })?);
    }
    Ok(histories)
}
