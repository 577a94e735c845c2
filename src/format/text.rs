use crate::error::ParserError;
use crate::format::{Formatter, RecordInfo};
use crate::models::{RecordLayers, RecordStack};
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Human-readable multiline rendering of each record, numbered by a
/// process-wide counter. Message numbers are globally monotone but say
/// nothing about wall-clock order across files.
pub struct TextFormatter {
    msg_num: AtomicUsize,
}

impl TextFormatter {
    pub fn new() -> Self {
        TextFormatter {
            msg_num: AtomicUsize::new(0),
        }
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for TextFormatter {
    fn format(&self, record: &RecordStack, _info: &RecordInfo) -> Result<Option<Bytes>, ParserError> {
        let n = self.msg_num.fetch_add(1, Ordering::Relaxed);
        let mut out = format!("[{}] MRT Header: {}\n", n, record.header);
        match &record.layers {
            RecordLayers::Rib(rib) => {
                out.push_str(&format!("RIB Header: {}\n", rib));
            }
            RecordLayers::Update(update) => {
                out.push_str(&format!("BGP4MP Header: {}\n", update.bgp4mp));
                out.push_str(&format!("BGP Header: {}\n", update.bgp));
                out.push_str(&format!("BGP Update: {}\n\n", update.update));
            }
        }
        Ok(Some(Bytes::from(out)))
    }

    fn summarize(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::tests::{info, sample_record};

    #[test]
    fn test_message_numbers_advance() {
        let fmtr = TextFormatter::new();
        let record = sample_record();
        let first = fmtr.format(&record, &info()).unwrap().unwrap();
        let second = fmtr.format(&record, &info()).unwrap().unwrap();
        let first = std::str::from_utf8(&first).unwrap();
        let second = std::str::from_utf8(&second).unwrap();
        assert!(first.starts_with("[0] MRT Header:"));
        assert!(second.starts_with("[1] MRT Header:"));
        assert!(first.contains("BGP Update:"));
        assert!(first.contains("10.0.0.0/8"));
        assert!(first.contains("65001 65002 65003"));
    }
}
