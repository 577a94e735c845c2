use super::network::{Afi, Asn, NetworkPrefix};
use num_enum::TryFromPrimitive;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};

/// BGP path attribute type codes handled by the update parser. Codes not
/// listed here are retained as [AttributeValue::Unknown].
pub const ATTR_ORIGIN: u8 = 1;
pub const ATTR_AS_PATH: u8 = 2;
pub const ATTR_NEXT_HOP: u8 = 3;
pub const ATTR_MED: u8 = 4;
pub const ATTR_LOCAL_PREF: u8 = 5;
pub const ATTR_ATOMIC_AGGREGATE: u8 = 6;
pub const ATTR_AGGREGATOR: u8 = 7;
pub const ATTR_COMMUNITIES: u8 = 8;
pub const ATTR_MP_REACH_NLRI: u8 = 14;
pub const ATTR_MP_UNREACH_NLRI: u8 = 15;
pub const ATTR_AS4_PATH: u8 = 17;

/// Attribute flag bit marking a two-octet length field.
pub const ATTR_FLAG_EXTENDED: u8 = 0x10;

/// Route origin attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, Serialize)]
#[repr(u8)]
pub enum Origin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

/// One segment of an AS path. Confederation segments are parsed but
/// excluded from the flattened path, matching common dump tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AsPathSegment {
    Sequence(Vec<Asn>),
    Set(Vec<Asn>),
    ConfedSequence(Vec<Asn>),
    ConfedSet(Vec<Asn>),
}

impl AsPathSegment {
    fn flattened(&self) -> Option<&[Asn]> {
        match self {
            AsPathSegment::Sequence(v) | AsPathSegment::Set(v) => Some(v),
            AsPathSegment::ConfedSequence(_) | AsPathSegment::ConfedSet(_) => None,
        }
    }
}

/// A single parsed path attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    Origin(Origin),
    AsPath {
        segments: Vec<AsPathSegment>,
        is_as4: bool,
    },
    NextHop(IpAddr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator {
        asn: Asn,
        id: Ipv4Addr,
    },
    Communities(Vec<u32>),
    MpReachNlri {
        afi: Afi,
        next_hop: Option<IpAddr>,
        prefixes: Vec<NetworkPrefix>,
    },
    MpUnreachNlri {
        afi: Afi,
        prefixes: Vec<NetworkPrefix>,
    },
    Unknown {
        attr_type: u8,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub flags: u8,
    pub value: AttributeValue,
}

/// The attribute set of one BGP update or RIB entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Attributes(pub Vec<Attribute>);

impl Attributes {
    /// Flattened AS path, origin-most element last. AS4_PATH wins over a
    /// plain AS_PATH when both are present.
    pub fn as_path(&self) -> Option<Vec<u32>> {
        let mut plain: Option<&[AsPathSegment]> = None;
        let mut as4: Option<&[AsPathSegment]> = None;
        for attr in &self.0 {
            if let AttributeValue::AsPath { segments, is_as4 } = &attr.value {
                if *is_as4 {
                    as4 = Some(segments);
                } else {
                    plain = Some(segments);
                }
            }
        }
        let segments = as4.or(plain)?;
        let mut path = Vec::new();
        for segment in segments {
            if let Some(asns) = segment.flattened() {
                path.extend(asns.iter().map(|a| a.0));
            }
        }
        Some(path)
    }

    pub fn origin(&self) -> Option<Origin> {
        self.0.iter().find_map(|a| match a.value {
            AttributeValue::Origin(o) => Some(o),
            _ => None,
        })
    }

    pub fn next_hop(&self) -> Option<IpAddr> {
        self.0.iter().find_map(|a| match a.value {
            AttributeValue::NextHop(ip) => Some(ip),
            AttributeValue::MpReachNlri { next_hop, .. } => next_hop,
            _ => None,
        })
    }

    /// Prefixes advertised through an MP_REACH_NLRI attribute.
    pub fn mp_reachable(&self) -> &[NetworkPrefix] {
        self.0
            .iter()
            .find_map(|a| match &a.value {
                AttributeValue::MpReachNlri { prefixes, .. } => Some(prefixes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Prefixes withdrawn through an MP_UNREACH_NLRI attribute.
    pub fn mp_unreachable(&self) -> &[NetworkPrefix] {
        self.0
            .iter()
            .find_map(|a| match &a.value {
                AttributeValue::MpUnreachNlri { prefixes, .. } => Some(prefixes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Origin::Igp => "IGP",
            Origin::Egp => "EGP",
            Origin::Incomplete => "INCOMPLETE",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(asns: &[u32]) -> AsPathSegment {
        AsPathSegment::Sequence(asns.iter().copied().map(Asn).collect())
    }

    #[test]
    fn test_flattened_path_prefers_as4() {
        let attrs = Attributes(vec![
            Attribute {
                flags: 0x40,
                value: AttributeValue::AsPath {
                    segments: vec![seq(&[65001, 23456])],
                    is_as4: false,
                },
            },
            Attribute {
                flags: 0x40,
                value: AttributeValue::AsPath {
                    segments: vec![seq(&[65001, 4200000001])],
                    is_as4: true,
                },
            },
        ]);
        assert_eq!(attrs.as_path(), Some(vec![65001, 4200000001]));
    }

    #[test]
    fn test_flattened_path_includes_sets() {
        let attrs = Attributes(vec![Attribute {
            flags: 0x40,
            value: AttributeValue::AsPath {
                segments: vec![
                    seq(&[65001, 65002]),
                    AsPathSegment::Set(vec![Asn(65010), Asn(65011)]),
                ],
                is_as4: false,
            },
        }]);
        assert_eq!(attrs.as_path(), Some(vec![65001, 65002, 65010, 65011]));
    }

    #[test]
    fn test_no_path_attribute() {
        assert_eq!(Attributes::default().as_path(), None);
    }
}
