//! TABLE_DUMP and TABLE_DUMP_V2 parsing (RFC 6396 sections 4.2 and 4.3).

use crate::error::ParserError;
use crate::models::*;
use crate::parser::bgp_update::parse_attributes;
use crate::parser::utils::ReadUtils;
use bytes::Bytes;

/// Parse a legacy TABLE_DUMP (v1) record. The subtype is the address
/// family; each record carries exactly one prefix and one route entry.
pub fn parse_table_dump(sub_type: u16, mut data: Bytes) -> Result<RibStack, ParserError> {
    let afi = Afi::try_from(sub_type).map_err(|_| {
        ParserError::ParseError(format!("unknown TABLE_DUMP address family: {}", sub_type))
    })?;

    let _view = data.read_u16()?;
    let sequence = data.read_u16()? as u32;
    let addr = data.read_address(afi)?;
    let mask = data.read_u8()?;
    let _status = data.read_u8()?;
    let originated_time = data.read_u32()?;
    let peer_ip = data.read_address(afi)?;
    let peer_asn = data.read_asn(AsnLength::Bits16)?;
    let attr_len = data.read_u16()? as usize;
    let attr_bytes = data.split_to_checked(attr_len)?;
    let attributes = parse_attributes(attr_bytes, AsnLength::Bits16, false)?;

    let prefix = NetworkPrefix::new(
        ipnet::IpNet::new(addr, mask).map_err(ParserError::InvalidPrefixLength)?,
        0,
    );

    Ok(RibStack {
        sequence,
        prefix,
        entries: vec![RibEntry {
            peer_index: None,
            peer_asn: Some(peer_asn),
            peer_ip: Some(peer_ip),
            originated_time: Some(originated_time),
            attributes,
        }],
    })
}

/// Parse a TABLE_DUMP_V2 peer index table. The first record of every v2
/// dump file; it is kept as file context and never forwarded.
pub fn parse_peer_index_table(mut data: Bytes) -> Result<PeerIndexTable, ParserError> {
    let collector_id = data.read_ipv4_address()?;
    let view_name_len = data.read_u16()? as usize;
    let view_name_bytes = data.read_n_bytes(view_name_len)?;
    let view_name = String::from_utf8_lossy(&view_name_bytes).into_owned();

    let peer_count = data.read_u16()? as usize;
    let mut peers = Vec::with_capacity(peer_count);
    for _ in 0..peer_count {
        let peer_type = data.read_u8()?;
        let afi = if peer_type & 0b01 != 0 {
            Afi::Ipv6
        } else {
            Afi::Ipv4
        };
        let asn_len = if peer_type & 0b10 != 0 {
            AsnLength::Bits32
        } else {
            AsnLength::Bits16
        };
        let bgp_id = data.read_ipv4_address()?;
        let ip = data.read_address(afi)?;
        let asn = data.read_asn(asn_len)?;
        peers.push(Peer { bgp_id, ip, asn });
    }

    Ok(PeerIndexTable {
        collector_id,
        view_name,
        peers,
    })
}

/// Parse a TABLE_DUMP_V2 RIB record of a concrete address family. Route
/// entries are resolved against the file's peer index table when one
/// has been seen.
pub fn parse_rib_afi_entries(
    v2_type: TableDumpV2Type,
    mut data: Bytes,
    peer_index: Option<&PeerIndexTable>,
) -> Result<RibStack, ParserError> {
    let (afi, add_path) = match v2_type {
        TableDumpV2Type::RibIpv4Unicast | TableDumpV2Type::RibIpv4Multicast => (Afi::Ipv4, false),
        TableDumpV2Type::RibIpv6Unicast | TableDumpV2Type::RibIpv6Multicast => (Afi::Ipv6, false),
        TableDumpV2Type::RibIpv4UnicastAddPath | TableDumpV2Type::RibIpv4MulticastAddPath => {
            (Afi::Ipv4, true)
        }
        TableDumpV2Type::RibIpv6UnicastAddPath | TableDumpV2Type::RibIpv6MulticastAddPath => {
            (Afi::Ipv6, true)
        }
        t => {
            return Err(ParserError::Unsupported(format!(
                "TABLE_DUMP_V2 subtype {:?} is not supported",
                t
            )))
        }
    };

    let sequence = data.read_u32()?;
    // the table prefix itself never carries a path id
    let prefix = data.read_nlri_prefix(afi, false)?;
    let entry_count = data.read_u16()? as usize;

    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        let index = data.read_u16()?;
        if add_path {
            let _path_id = data.read_u32()?;
        }
        let originated_time = data.read_u32()?;
        let attr_len = data.read_u16()? as usize;
        let attr_bytes = data.split_to_checked(attr_len)?;
        let attributes = parse_attributes(attr_bytes, AsnLength::Bits32, add_path)?;

        let peer = peer_index.and_then(|t| t.peers.get(index as usize));
        entries.push(RibEntry {
            peer_index: Some(index),
            peer_asn: peer.map(|p| p.asn),
            peer_ip: peer.map(|p| p.ip),
            originated_time: Some(originated_time),
            attributes,
        });
    }

    Ok(RibStack {
        sequence,
        prefix,
        entries,
    })
}
