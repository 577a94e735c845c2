//! Streaming record framer: splits a (possibly bzip2-compressed) byte
//! stream into MRT record frames without interpreting the message body.

use crate::error::ParserError;
use crate::models::{CommonHeader, EntryType};
use bytes::{BufMut, Bytes, BytesMut};
use bzip2::read::BzDecoder;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Default upper bound on a single record's declared length. RIB table
/// dumps can carry very large entries, so the cap is configurable but
/// never drops below this value.
pub const DEFAULT_MAX_RECORD_LEN: u32 = 16 * 1024 * 1024;

/// Open an archive file for record framing. A `.bz2` extension selects
/// transparent bzip2 decompression; anything else is read as-is.
pub fn open_record_reader(path: &Path) -> std::io::Result<Box<dyn Read>> {
    let file = File::open(path)?;
    match path.extension().and_then(OsStr::to_str) {
        Some("bz2") => Ok(Box::new(BzDecoder::new(BufReader::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// One framed MRT record: the parsed fixed header plus the untouched
/// header and message bytes. Keeping the raw bytes allows the identity
/// formatter to re-emit a filtered subset without re-encoding.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub header: CommonHeader,
    pub header_bytes: Bytes,
    pub message_bytes: Bytes,
}

impl RawFrame {
    /// The complete frame exactly as it appeared on the wire.
    pub fn raw_bytes(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(self.header_bytes.len() + self.message_bytes.len());
        bytes.put_slice(&self.header_bytes);
        bytes.put_slice(&self.message_bytes);
        bytes.freeze()
    }

    pub fn total_len(&self) -> usize {
        self.header_bytes.len() + self.message_bytes.len()
    }
}

pub struct RecordFramer<R> {
    reader: R,
    max_record_len: u32,
}

impl<R: Read> RecordFramer<R> {
    pub fn new(reader: R) -> Self {
        RecordFramer {
            reader,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
        }
    }

    pub fn with_max_record_len(mut self, limit: u32) -> Self {
        self.max_record_len = limit.max(DEFAULT_MAX_RECORD_LEN);
        self
    }

    /// Read the next frame. `Ok(None)` marks a clean end of input at a
    /// record boundary; a partial header or short message body is a
    /// truncated-frame error.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>, ParserError> {
        let mut base = [0u8; 12];
        match read_full(&mut self.reader, &mut base)? {
            0 => return Ok(None),
            12 => {}
            n => {
                return Err(ParserError::TruncatedMsg(format!(
                    "incomplete MRT header: {} of 12 bytes",
                    n
                )))
            }
        }

        let timestamp = u32::from_be_bytes(base[0..4].try_into().unwrap());
        let type_code = u16::from_be_bytes(base[4..6].try_into().unwrap());
        let entry_type = EntryType::try_from(type_code).map_err(|_| {
            ParserError::ParseError(format!("bad magic: unknown MRT entry type {}", type_code))
        })?;
        let entry_subtype = u16::from_be_bytes(base[6..8].try_into().unwrap());
        let mut length = u32::from_be_bytes(base[8..12].try_into().unwrap());

        // The extended-timestamp types carry 4 more header bytes which the
        // declared length includes; internally length covers the body only.
        let (microsecond_timestamp, header_bytes) = match entry_type {
            EntryType::BGP4MP_ET | EntryType::ISIS_ET | EntryType::OSPFv3_ET => {
                if length < 4 {
                    return Err(ParserError::ParseError(
                        "extended timestamp record with length < 4".to_string(),
                    ));
                }
                length -= 4;
                let mut extended = [0u8; 16];
                extended[..12].copy_from_slice(&base);
                self.reader
                    .read_exact(&mut extended[12..])
                    .map_err(|e| truncated(e, "extended timestamp"))?;
                let micros = u32::from_be_bytes(extended[12..16].try_into().unwrap());
                (Some(micros), Bytes::copy_from_slice(&extended))
            }
            _ => (None, Bytes::copy_from_slice(&base)),
        };

        if length > self.max_record_len {
            return Err(ParserError::OversizedRecord {
                length,
                limit: self.max_record_len,
            });
        }

        let mut body = BytesMut::zeroed(length as usize);
        self.reader
            .read_exact(&mut body)
            .map_err(|e| truncated(e, "record body"))?;

        Ok(Some(RawFrame {
            header: CommonHeader {
                timestamp,
                microsecond_timestamp,
                entry_type,
                entry_subtype,
                length,
            },
            header_bytes,
            message_bytes: body.freeze(),
        }))
    }
}

fn truncated(err: std::io::Error, what: &str) -> ParserError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            ParserError::TruncatedMsg(format!("short read inside {}", what))
        }
        _ => ParserError::IoError(err),
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize, ParserError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ParserError::IoError(e)),
        }
    }
    Ok(filled)
}
