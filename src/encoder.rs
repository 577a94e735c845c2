//! Assembly of complete BGP4MP update records as raw MRT frames.
//!
//! This is the write-side counterpart of the framer and parser: it
//! backs the identity formatter's re-framing workflow and synthesizes
//! deterministic test archives without touching the network.

use crate::models::{Bgp4mpType, EntryType};
use bytes::{BufMut, Bytes, BytesMut};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Builder for a single BGP4MP `MessageAs4` update record.
///
/// ```
/// use mrtdump::encoder::UpdateBuilder;
/// use std::net::Ipv4Addr;
///
/// let record = UpdateBuilder::new()
///     .timestamp(1_577_836_800)
///     .peer(Ipv4Addr::new(10, 0, 0, 2), 65001)
///     .as_path(&[65001, 65002, 65003])
///     .announce("10.0.0.0/8".parse().unwrap())
///     .build();
/// assert!(record.len() > 12);
/// ```
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    timestamp: u32,
    peer_ip: Ipv4Addr,
    peer_asn: u32,
    local_ip: Ipv4Addr,
    local_asn: u32,
    as_path: Vec<u32>,
    next_hop: Ipv4Addr,
    announce: Vec<Ipv4Net>,
    withdraw: Vec<Ipv4Net>,
}

impl Default for UpdateBuilder {
    fn default() -> Self {
        UpdateBuilder {
            timestamp: 0,
            peer_ip: Ipv4Addr::new(10, 0, 0, 2),
            peer_asn: 65001,
            local_ip: Ipv4Addr::new(10, 0, 0, 1),
            local_asn: 64512,
            as_path: Vec::new(),
            next_hop: Ipv4Addr::new(10, 0, 0, 2),
            announce: Vec::new(),
            withdraw: Vec::new(),
        }
    }
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn peer(mut self, ip: Ipv4Addr, asn: u32) -> Self {
        self.peer_ip = ip;
        self.peer_asn = asn;
        self
    }

    pub fn local(mut self, ip: Ipv4Addr, asn: u32) -> Self {
        self.local_ip = ip;
        self.local_asn = asn;
        self
    }

    pub fn as_path(mut self, path: &[u32]) -> Self {
        self.as_path = path.to_vec();
        self
    }

    pub fn next_hop(mut self, ip: Ipv4Addr) -> Self {
        self.next_hop = ip;
        self
    }

    pub fn announce(mut self, prefix: Ipv4Net) -> Self {
        self.announce.push(prefix);
        self
    }

    pub fn withdraw(mut self, prefix: Ipv4Net) -> Self {
        self.withdraw.push(prefix);
        self
    }

    /// Encode the complete MRT frame: common header, BGP4MP header, BGP
    /// message header and UPDATE payload.
    pub fn build(&self) -> Bytes {
        let update = self.encode_update_body();

        let mut bgp = BytesMut::new();
        bgp.put_slice(&[0xff; 16]);
        bgp.put_u16((19 + update.len()) as u16);
        bgp.put_u8(2); // UPDATE
        bgp.put_slice(&update);

        let mut message = BytesMut::new();
        message.put_u32(self.peer_asn);
        message.put_u32(self.local_asn);
        message.put_u16(0); // interface index
        message.put_u16(1); // AFI IPv4
        message.put_slice(&self.peer_ip.octets());
        message.put_slice(&self.local_ip.octets());
        message.put_slice(&bgp);

        let mut frame = BytesMut::with_capacity(12 + message.len());
        frame.put_u32(self.timestamp);
        frame.put_u16(EntryType::BGP4MP.into());
        frame.put_u16(Bgp4mpType::MessageAs4.into());
        frame.put_u32(message.len() as u32);
        frame.put_slice(&message);
        frame.freeze()
    }

    fn encode_update_body(&self) -> Bytes {
        let mut withdrawn = BytesMut::new();
        for prefix in &self.withdraw {
            encode_nlri_prefix(&mut withdrawn, prefix);
        }

        let mut attrs = BytesMut::new();
        if !self.announce.is_empty() {
            // ORIGIN: IGP
            attrs.put_slice(&[0x40, 1, 1, 0]);

            // AS_PATH: one AS_SEQUENCE of 4-octet ASNs
            attrs.put_u8(0x40);
            attrs.put_u8(2);
            attrs.put_u8((2 + self.as_path.len() * 4) as u8);
            attrs.put_u8(2); // AS_SEQUENCE
            attrs.put_u8(self.as_path.len() as u8);
            for asn in &self.as_path {
                attrs.put_u32(*asn);
            }

            // NEXT_HOP
            attrs.put_slice(&[0x40, 3, 4]);
            attrs.put_slice(&self.next_hop.octets());
        }

        let mut nlri = BytesMut::new();
        for prefix in &self.announce {
            encode_nlri_prefix(&mut nlri, prefix);
        }

        let mut body = BytesMut::new();
        body.put_u16(withdrawn.len() as u16);
        body.put_slice(&withdrawn);
        body.put_u16(attrs.len() as u16);
        body.put_slice(&attrs);
        body.put_slice(&nlri);
        body.freeze()
    }
}

fn encode_nlri_prefix(out: &mut BytesMut, prefix: &Ipv4Net) {
    let bit_len = prefix.prefix_len();
    let byte_len = (bit_len as usize + 7) / 8;
    out.put_u8(bit_len);
    out.put_slice(&prefix.addr().octets()[..byte_len]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_record, FileContext, RecordFramer};

    #[test]
    fn test_encoded_record_parses_back() {
        let record = UpdateBuilder::new()
            .timestamp(42)
            .as_path(&[65001, 65002])
            .next_hop(Ipv4Addr::new(10, 0, 0, 7))
            .announce("192.0.2.0/24".parse().unwrap())
            .withdraw("198.51.100.0/25".parse().unwrap())
            .build();

        let mut framer = RecordFramer::new(record.as_ref());
        let frame = framer.next_frame().unwrap().unwrap();
        assert_eq!(frame.raw_bytes(), record);

        let mut ctx = FileContext::default();
        let stack = parse_record(frame, &mut ctx).unwrap().unwrap();
        assert_eq!(stack.unix_timestamp(), 42);
        assert_eq!(stack.as_path(), Some(vec![65001, 65002]));
        assert_eq!(stack.advertised_prefixes()[0].to_string(), "192.0.2.0/24");
        assert_eq!(stack.withdrawn_prefixes()[0].to_string(), "198.51.100.0/25");
        match &stack.layers {
            crate::models::RecordLayers::Update(u) => {
                assert_eq!(
                    u.update.attributes.next_hop().unwrap().to_string(),
                    "10.0.0.7"
                );
            }
            _ => panic!("expected update record"),
        }
    }
}
