use super::attributes::Attributes;
use super::network::{Afi, Asn, NetworkPrefix};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};

/// MRT record type as defined by RFC 6396 section 4. Types 0 to 10 are
/// deprecated but still appear in very old archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize)]
#[allow(non_camel_case_types)]
#[repr(u16)]
pub enum EntryType {
    NULL = 0,
    START = 1,
    DIE = 2,
    I_AM_DEAD = 3,
    PEER_DOWN = 4,
    BGP = 5,
    RIP = 6,
    IDRP = 7,
    RIPNG = 8,
    BGP4PLUS = 9,
    BGP4PLUS_01 = 10,
    OSPFv2 = 11,
    TABLE_DUMP = 12,
    TABLE_DUMP_V2 = 13,
    BGP4MP = 16,
    BGP4MP_ET = 17,
    ISIS = 32,
    ISIS_ET = 33,
    OSPFv3 = 48,
    OSPFv3_ET = 49,
}

/// BGP4MP subtype codes (RFC 6396 section 4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize)]
#[repr(u16)]
pub enum Bgp4mpType {
    StateChange = 0,
    Message = 1,
    MessageAs4 = 4,
    StateChangeAs4 = 5,
    MessageLocal = 6,
    MessageAs4Local = 7,
    MessageAddpath = 8,
    MessageAs4Addpath = 9,
    MessageLocalAddpath = 10,
    MessageAs4LocalAddpath = 11,
}

/// BGP message type carried inside a BGP4MP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize)]
#[repr(u8)]
pub enum BgpMessageType {
    Open = 1,
    Update = 2,
    Notification = 3,
    KeepAlive = 4,
}

/// TABLE_DUMP_V2 subtype codes (RFC 6396 section 4.3, RFC 8050).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize)]
#[repr(u16)]
pub enum TableDumpV2Type {
    PeerIndexTable = 1,
    RibIpv4Unicast = 2,
    RibIpv4Multicast = 3,
    RibIpv6Unicast = 4,
    RibIpv6Multicast = 5,
    RibGeneric = 6,
    GeoPeerTable = 7,
    RibIpv4UnicastAddPath = 8,
    RibIpv4MulticastAddPath = 9,
    RibIpv6UnicastAddPath = 10,
    RibIpv6MulticastAddPath = 11,
    RibGenericAddPath = 12,
}

/// The fixed MRT record header. `length` always refers to the message
/// body only; for `_ET` records the 4 bytes of microsecond timestamp
/// have already been subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommonHeader {
    pub timestamp: u32,
    pub microsecond_timestamp: Option<u32>,
    pub entry_type: EntryType,
    pub entry_subtype: u16,
    pub length: u32,
}

impl Display for CommonHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} type:{:?}/{} len:{}",
            DateTime::from_timestamp(self.timestamp as i64, 0).unwrap_or_default(),
            self.entry_type,
            self.entry_subtype,
            self.length
        )
    }
}

/// The BGP4MP layer of an update record: who exchanged the message.
#[derive(Debug, Clone, Serialize)]
pub struct Bgp4mpHeader {
    pub msg_type: Bgp4mpType,
    pub peer_asn: Asn,
    pub local_asn: Asn,
    pub interface_index: u16,
    pub afi: Afi,
    pub peer_ip: IpAddr,
    pub local_ip: IpAddr,
}

impl Display for Bgp4mpHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "peer:{} AS{} local:{} AS{}",
            self.peer_ip, self.peer_asn, self.local_ip, self.local_asn
        )
    }
}

/// The BGP message header inside a BGP4MP layer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BgpHeader {
    pub length: u16,
    pub msg_type: BgpMessageType,
}

impl Display for BgpHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} len:{}", self.msg_type, self.length)
    }
}

/// A BGP UPDATE payload: withdrawn routes, path attributes, announced
/// routes. IPv6 reachability travels in the attribute set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BgpUpdate {
    pub withdrawn: Vec<NetworkPrefix>,
    pub attributes: Attributes,
    pub announced: Vec<NetworkPrefix>,
}

impl Display for BgpUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let path = self
            .attributes
            .as_path()
            .map(|p| p.iter().join(" "))
            .unwrap_or_default();
        write!(
            f,
            "announced:[{}] withdrawn:[{}] path:[{}]",
            self.announced.iter().join(" "),
            self.withdrawn.iter().join(" "),
            path
        )?;
        if let Some(origin) = self.attributes.origin() {
            write!(f, " origin:{}", origin)?;
        }
        if let Some(next_hop) = self.attributes.next_hop() {
            write!(f, " next-hop:{}", next_hop)?;
        }
        Ok(())
    }
}

/// The update branch of a record: BGP4MP header, BGP header, update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateStack {
    pub bgp4mp: Bgp4mpHeader,
    pub bgp: BgpHeader,
    pub update: BgpUpdate,
}

/// One peer of a TABLE_DUMP_V2 peer index table.
#[derive(Debug, Clone, Serialize)]
pub struct Peer {
    pub bgp_id: Ipv4Addr,
    pub ip: IpAddr,
    pub asn: Asn,
}

/// The peer index table heading a TABLE_DUMP_V2 file. It is retained as
/// per-file context and never forwarded to filters or formatters.
#[derive(Debug, Clone, Serialize)]
pub struct PeerIndexTable {
    pub collector_id: Ipv4Addr,
    pub view_name: String,
    pub peers: Vec<Peer>,
}

/// A single route entry of a RIB record, with the peer resolved through
/// the file's peer index table when one is available.
#[derive(Debug, Clone, Serialize)]
pub struct RibEntry {
    pub peer_index: Option<u16>,
    pub peer_asn: Option<Asn>,
    pub peer_ip: Option<IpAddr>,
    pub originated_time: Option<u32>,
    pub attributes: Attributes,
}

/// The RIB branch of a record: one prefix and its route entries.
#[derive(Debug, Clone, Serialize)]
pub struct RibStack {
    pub sequence: u32,
    pub prefix: NetworkPrefix,
    pub entries: Vec<RibEntry>,
}

impl Display for RibStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "seq:{} prefix:{} entries:{}",
            self.sequence,
            self.prefix,
            self.entries.len()
        )
    }
}

/// The layered, fully parsed view of one MRT record. Exactly one of the
/// two branches is populated. Once constructed the stack is immutable
/// and safe to share read-only across worker threads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLayers {
    Update(UpdateStack),
    Rib(RibStack),
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordStack {
    /// The raw frame bytes exactly as read from the archive.
    #[serde(skip)]
    pub raw: Bytes,
    pub header: CommonHeader,
    pub layers: RecordLayers,
}

impl RecordStack {
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.header.timestamp as i64, 0).unwrap_or_default()
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.header.timestamp as i64
    }

    pub fn is_rib(&self) -> bool {
        matches!(self.layers, RecordLayers::Rib(_))
    }

    /// Flattened AS path of the record, origin last. For RIB records the
    /// path of the first route entry is used.
    pub fn as_path(&self) -> Option<Vec<u32>> {
        match &self.layers {
            RecordLayers::Update(u) => u.update.attributes.as_path(),
            RecordLayers::Rib(r) => r.entries.first().and_then(|e| e.attributes.as_path()),
        }
    }

    /// All prefixes advertised by this record, including MP_REACH_NLRI
    /// carried ones. A RIB record advertises its table prefix.
    pub fn advertised_prefixes(&self) -> Vec<NetworkPrefix> {
        match &self.layers {
            RecordLayers::Update(u) => {
                let mut prefixes = u.update.announced.clone();
                prefixes.extend_from_slice(u.update.attributes.mp_reachable());
                prefixes
            }
            RecordLayers::Rib(r) => vec![r.prefix],
        }
    }

    /// All prefixes withdrawn by this record, including MP_UNREACH_NLRI
    /// carried ones. Empty for RIB records.
    pub fn withdrawn_prefixes(&self) -> Vec<NetworkPrefix> {
        match &self.layers {
            RecordLayers::Update(u) => {
                let mut prefixes = u.update.withdrawn.clone();
                prefixes.extend_from_slice(u.update.attributes.mp_unreachable());
                prefixes
            }
            RecordLayers::Rib(_) => Vec::new(),
        }
    }

    pub fn peer_ip(&self) -> Option<IpAddr> {
        match &self.layers {
            RecordLayers::Update(u) => Some(u.bgp4mp.peer_ip),
            RecordLayers::Rib(r) => r.entries.first().and_then(|e| e.peer_ip),
        }
    }

    pub fn local_ip(&self) -> Option<IpAddr> {
        match &self.layers {
            RecordLayers::Update(u) => Some(u.bgp4mp.local_ip),
            RecordLayers::Rib(_) => None,
        }
    }
}
