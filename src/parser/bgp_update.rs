//! BGP message header and UPDATE payload parsing (RFC 4271), including
//! the path attribute set.

use crate::error::ParserError;
use crate::models::*;
use crate::parser::utils::ReadUtils;
use bytes::Bytes;
use std::net::IpAddr;

/// Minimum length of a BGP message: 16-byte marker, 2-byte length,
/// 1-byte type.
const BGP_HEADER_LEN: usize = 19;

/// Parse the BGP message header and the UPDATE payload behind it. BGP4MP
/// records wrapping OPEN, KEEPALIVE or NOTIFICATION messages carry no
/// routing data and are reported as unsupported so the caller can skip
/// them.
pub fn parse_bgp_message(
    mut data: Bytes,
    add_path: bool,
    asn_len: AsnLength,
) -> Result<(BgpHeader, BgpUpdate), ParserError> {
    data.require(BGP_HEADER_LEN, "BGP message header")?;
    // marker: 16 bytes of all ones, not validated by archive tools
    data.split_to_checked(16)?;
    let length = data.read_u16()?;
    if !(19..=4096).contains(&length) {
        return Err(ParserError::ParseError(format!(
            "invalid BGP message length: {}",
            length
        )));
    }
    let type_code = data.read_u8()?;
    let msg_type = BgpMessageType::try_from(type_code).map_err(|_| {
        ParserError::ParseError(format!("unknown BGP message type: {}", type_code))
    })?;

    let declared = length as usize - BGP_HEADER_LEN;
    if data.remaining() != declared {
        return Err(ParserError::ParseError(format!(
            "BGP message declares {} body bytes, {} remain",
            declared,
            data.remaining()
        )));
    }

    if msg_type != BgpMessageType::Update {
        return Err(ParserError::Unsupported(format!(
            "BGP {:?} message carries no routes",
            msg_type
        )));
    }

    let update = parse_bgp_update(data, add_path, asn_len)?;
    Ok((BgpHeader { length, msg_type }, update))
}

/// Parse a BGP UPDATE body: withdrawn routes, path attributes, announced
/// NLRI. Both route sections are classic IPv4 NLRI; IPv6 reachability
/// arrives through the MP attributes.
pub fn parse_bgp_update(
    mut data: Bytes,
    add_path: bool,
    asn_len: AsnLength,
) -> Result<BgpUpdate, ParserError> {
    let withdrawn_len = data.read_u16()? as usize;
    let mut withdrawn_bytes = data.split_to_checked(withdrawn_len)?;
    let withdrawn = withdrawn_bytes.read_nlri_list(Afi::Ipv4, add_path)?;

    let attr_len = data.read_u16()? as usize;
    let attr_bytes = data.split_to_checked(attr_len)?;
    let attributes = parse_attributes(attr_bytes, asn_len, add_path)?;

    let announced = data.read_nlri_list(Afi::Ipv4, add_path)?;

    Ok(BgpUpdate {
        withdrawn,
        attributes,
        announced,
    })
}

/// Parse the attribute section of an UPDATE. Unknown attribute types are
/// retained as raw bytes rather than rejected; a declared attribute
/// length overflowing the section is an error that aborts the record.
pub fn parse_attributes(
    mut data: Bytes,
    asn_len: AsnLength,
    add_path: bool,
) -> Result<Attributes, ParserError> {
    let mut attributes = Vec::new();

    while data.remaining() >= 3 {
        let flags = data.read_u8()?;
        let attr_type = data.read_u8()?;
        let attr_length = if flags & ATTR_FLAG_EXTENDED != 0 {
            data.read_u16()? as usize
        } else {
            data.read_u8()? as usize
        };
        let mut attr_data = data.split_to_checked(attr_length)?;

        let value = match attr_type {
            ATTR_ORIGIN => {
                let code = attr_data.read_u8()?;
                let origin = Origin::try_from(code).map_err(|_| {
                    ParserError::ParseError(format!("unknown origin code: {}", code))
                })?;
                AttributeValue::Origin(origin)
            }
            ATTR_AS_PATH => AttributeValue::AsPath {
                segments: parse_as_path_segments(attr_data, asn_len)?,
                is_as4: false,
            },
            ATTR_AS4_PATH => AttributeValue::AsPath {
                segments: parse_as_path_segments(attr_data, AsnLength::Bits32)?,
                is_as4: true,
            },
            ATTR_NEXT_HOP => AttributeValue::NextHop(parse_next_hop(&mut attr_data)?),
            ATTR_MED => AttributeValue::MultiExitDisc(attr_data.read_u32()?),
            ATTR_LOCAL_PREF => AttributeValue::LocalPref(attr_data.read_u32()?),
            ATTR_ATOMIC_AGGREGATE => AttributeValue::AtomicAggregate,
            ATTR_AGGREGATOR => {
                let asn = attr_data.read_asn(asn_len)?;
                let id = attr_data.read_ipv4_address()?;
                AttributeValue::Aggregator { asn, id }
            }
            ATTR_COMMUNITIES => {
                let mut communities = Vec::with_capacity(attr_data.remaining() / 4);
                while attr_data.remaining() >= 4 {
                    communities.push(attr_data.read_u32()?);
                }
                AttributeValue::Communities(communities)
            }
            ATTR_MP_REACH_NLRI => parse_mp_reach(attr_data, add_path)?,
            ATTR_MP_UNREACH_NLRI => parse_mp_unreach(attr_data, add_path)?,
            _ => AttributeValue::Unknown {
                attr_type,
                bytes: attr_data.to_vec(),
            },
        };

        attributes.push(Attribute { flags, value });
    }

    Ok(Attributes(attributes))
}

fn parse_as_path_segments(
    mut data: Bytes,
    asn_len: AsnLength,
) -> Result<Vec<AsPathSegment>, ParserError> {
    let mut segments = Vec::new();
    while data.remaining() > 0 {
        let segment_type = data.read_u8()?;
        let count = data.read_u8()? as usize;
        let asns = data.read_asns(asn_len, count)?;
        let segment = match segment_type {
            1 => AsPathSegment::Set(asns),
            2 => AsPathSegment::Sequence(asns),
            3 => AsPathSegment::ConfedSequence(asns),
            4 => AsPathSegment::ConfedSet(asns),
            t => {
                return Err(ParserError::ParseError(format!(
                    "unknown AS path segment type: {}",
                    t
                )))
            }
        };
        segments.push(segment);
    }
    Ok(segments)
}

fn parse_next_hop(data: &mut Bytes) -> Result<IpAddr, ParserError> {
    match data.remaining() {
        4 => data.read_ipv4_address().map(IpAddr::V4),
        16 => data.read_ipv6_address().map(IpAddr::V6),
        n => Err(ParserError::InconsistentFieldLength {
            name: "NEXT_HOP",
            expected: 4,
            found: n,
        }),
    }
}

fn parse_mp_reach(mut data: Bytes, add_path: bool) -> Result<AttributeValue, ParserError> {
    let afi = data.read_afi()?;
    let _safi = data.read_u8()?;
    let next_hop_len = data.read_u8()? as usize;
    let mut next_hop_bytes = data.split_to_checked(next_hop_len)?;
    let next_hop = match next_hop_len {
        4 => Some(IpAddr::V4(next_hop_bytes.read_ipv4_address()?)),
        // a link-local address may follow the global one; keep the global
        16 | 32 => Some(IpAddr::V6(next_hop_bytes.read_ipv6_address()?)),
        _ => None,
    };
    let _reserved = data.read_u8()?;
    let prefixes = data.read_nlri_list(afi, add_path)?;
    Ok(AttributeValue::MpReachNlri {
        afi,
        next_hop,
        prefixes,
    })
}

fn parse_mp_unreach(mut data: Bytes, add_path: bool) -> Result<AttributeValue, ParserError> {
    let afi = data.read_afi()?;
    let _safi = data.read_u8()?;
    let prefixes = data.read_nlri_list(afi, add_path)?;
    Ok(AttributeValue::MpUnreachNlri { afi, prefixes })
}
