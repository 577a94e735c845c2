//! Prefix ownership tracking: the first origin AS advertising a prefix
//! becomes its owner; later different origins are reported as
//! conflicts.

use crate::error::ParserError;
use crate::format::{Formatter, RecordInfo};
use crate::models::RecordStack;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct AsEvent {
    asn: u32,
    time: DateTime<Utc>,
}

#[derive(Debug)]
struct AsLock {
    owner: AsEvent,
    intruders: Vec<AsEvent>,
}

/// `prefixlock`: one conflict line per newly seen intruder origin.
pub struct PrefixLockFormatter {
    state: Mutex<HashMap<String, AsLock>>,
}

impl PrefixLockFormatter {
    pub fn new() -> Self {
        PrefixLockFormatter {
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Register an advertisement of `prefix` by origin `asn`. Returns a
    /// conflict line when the origin is neither the owner nor an
    /// already known intruder.
    fn register(&self, prefix: String, asn: u32, time: DateTime<Utc>) -> Option<String> {
        let mut map = self.state.lock().unwrap();
        match map.entry(prefix) {
            Entry::Vacant(slot) => {
                slot.insert(AsLock {
                    owner: AsEvent { asn, time },
                    intruders: Vec::new(),
                });
                None
            }
            Entry::Occupied(mut slot) => {
                let lock = slot.get();
                if lock.owner.asn == asn || lock.intruders.iter().any(|i| i.asn == asn) {
                    return None;
                }
                let owner = lock.owner.asn;
                slot.get_mut().intruders.push(AsEvent { asn, time });
                Some(format!(
                    "conflict prefix:{} owner:{} intruder:{} time:{}",
                    slot.key(),
                    owner,
                    asn,
                    time
                ))
            }
        }
    }
}

impl Default for PrefixLockFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for PrefixLockFormatter {
    fn format(&self, record: &RecordStack, _info: &RecordInfo) -> Result<Option<Bytes>, ParserError> {
        let origin = match record.as_path() {
            Some(path) if !path.is_empty() => *path.last().unwrap(),
            // withdrawals and pathless records register nothing
            _ => return Ok(None),
        };
        let advertised = record.advertised_prefixes();
        if advertised.is_empty() {
            return Ok(None);
        }

        let time = record.timestamp();
        let mut conflicts = Vec::new();
        for route in advertised {
            if let Some(line) = self.register(route.to_string(), origin, time) {
                conflicts.push(line);
            }
        }

        if conflicts.is_empty() {
            return Ok(None);
        }
        Ok(Some(Bytes::from(conflicts.join("\n") + "\n")))
    }

    fn summarize(&self) {}
}
