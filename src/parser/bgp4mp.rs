//! BGP4MP layer parsing (RFC 6396 section 4.4).

use crate::error::ParserError;
use crate::models::*;
use crate::parser::bgp_update::parse_bgp_message;
use crate::parser::utils::ReadUtils;
use bytes::Bytes;

/*
   0                   1                   2                   3
   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
  |         Peer AS Number        |        Local AS Number        |
  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
  |        Interface Index        |        Address Family         |
  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
  |                      Peer IP Address (variable)               |
  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
  |                      Local IP Address (variable)              |
  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
  |                    BGP Message... (variable)
  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
*/

/// Parse a BGP4MP message body into the update branch of a record.
/// State-change subtypes carry no routing payload and are reported as
/// unsupported so the pipeline skips them without abandoning the file.
pub fn parse_bgp4mp(sub_type: u16, mut data: Bytes) -> Result<UpdateStack, ParserError> {
    let msg_type = Bgp4mpType::try_from(sub_type).map_err(|_| {
        ParserError::ParseError(format!("unknown BGP4MP subtype: {}", sub_type))
    })?;

    let (asn_len, add_path) = match msg_type {
        Bgp4mpType::Message | Bgp4mpType::MessageLocal => (AsnLength::Bits16, false),
        Bgp4mpType::MessageAs4 | Bgp4mpType::MessageAs4Local => (AsnLength::Bits32, false),
        Bgp4mpType::MessageAddpath | Bgp4mpType::MessageLocalAddpath => {
            (AsnLength::Bits16, true)
        }
        Bgp4mpType::MessageAs4Addpath | Bgp4mpType::MessageAs4LocalAddpath => {
            (AsnLength::Bits32, true)
        }
        Bgp4mpType::StateChange | Bgp4mpType::StateChangeAs4 => {
            return Err(ParserError::Unsupported(
                "BGP4MP state change carries no routes".to_string(),
            ))
        }
    };

    let peer_asn = data.read_asn(asn_len)?;
    let local_asn = data.read_asn(asn_len)?;
    let interface_index = data.read_u16()?;
    let afi = data.read_afi()?;
    let peer_ip = data.read_address(afi)?;
    let local_ip = data.read_address(afi)?;

    let (bgp, update) = parse_bgp_message(data, add_path, asn_len)?;

    Ok(UpdateStack {
        bgp4mp: Bgp4mpHeader {
            msg_type,
            peer_asn,
            local_asn,
            interface_index,
            afi,
            peer_ip,
            local_ip,
        },
        bgp,
        update,
    })
}
