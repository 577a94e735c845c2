//! The layered MRT record parser: framing (framer), the BGP4MP update
//! branch (bgp4mp, bgp_update) and the RIB branch (table_dump).

pub mod bgp4mp;
pub mod bgp_update;
pub mod framer;
pub mod table_dump;
pub mod utils;

pub use framer::{open_record_reader, RawFrame, RecordFramer, DEFAULT_MAX_RECORD_LEN};

use crate::error::ParserError;
use crate::models::*;

/// Per-file parser state. A TABLE_DUMP_V2 file starts with a peer index
/// table that all subsequent RIB records are resolved against.
#[derive(Debug, Default)]
pub struct FileContext {
    peer_index: Option<PeerIndexTable>,
}

impl FileContext {
    pub fn peer_index(&self) -> Option<&PeerIndexTable> {
        self.peer_index.as_ref()
    }
}

/// Parse one framed record into a [RecordStack].
///
/// Returns `Ok(None)` for records that are consumed as context (the
/// peer index table) and are never forwarded to filters or formatters.
/// `Unsupported` errors mark records without routing payload and are
/// skippable; any other error means the record is malformed and the
/// current file should be abandoned.
pub fn parse_record(
    frame: RawFrame,
    ctx: &mut FileContext,
) -> Result<Option<RecordStack>, ParserError> {
    let layers = match frame.header.entry_type {
        EntryType::BGP4MP | EntryType::BGP4MP_ET => RecordLayers::Update(bgp4mp::parse_bgp4mp(
            frame.header.entry_subtype,
            frame.message_bytes.clone(),
        )?),
        EntryType::TABLE_DUMP => RecordLayers::Rib(table_dump::parse_table_dump(
            frame.header.entry_subtype,
            frame.message_bytes.clone(),
        )?),
        EntryType::TABLE_DUMP_V2 => {
            let v2_type = TableDumpV2Type::try_from(frame.header.entry_subtype).map_err(|_| {
                ParserError::ParseError(format!(
                    "unknown TABLE_DUMP_V2 subtype: {}",
                    frame.header.entry_subtype
                ))
            })?;
            if v2_type == TableDumpV2Type::PeerIndexTable {
                ctx.peer_index = Some(table_dump::parse_peer_index_table(
                    frame.message_bytes.clone(),
                )?);
                return Ok(None);
            }
            RecordLayers::Rib(table_dump::parse_rib_afi_entries(
                v2_type,
                frame.message_bytes.clone(),
                ctx.peer_index(),
            )?)
        }
        t => {
            return Err(ParserError::Unsupported(format!(
                "MRT entry type {:?} is not supported",
                t
            )))
        }
    };

    Ok(Some(RecordStack {
        raw: frame.raw_bytes(),
        header: frame.header,
        layers,
    }))
}
