//! Record filters: pure predicates over parsed records, evaluated as a
//! short-circuit AND chain.

use crate::error::ConfigError;
use crate::models::{NetworkPrefix, RecordStack};
use crate::radix::{ip_to_radix_key, retain_top_level, RadixTree};
use ipnet::IpNet;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Which end of the AS path an origin-AS filter inspects. `Source` is
/// the origin AS (last path element); `Destination` is the nearest peer
/// (first element).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsDirection {
    Source,
    Destination,
}

/// Which prefix lists of a record the prefix filter inspects, driven by
/// the `--prefloc` flag. Unknown flag values mean `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefixScope {
    #[default]
    Any,
    Advertised,
    Withdrawn,
}

impl PrefixScope {
    pub fn from_flag(value: &str) -> Self {
        match value {
            "advertised" | "advertized" => PrefixScope::Advertised,
            "withdrawn" => PrefixScope::Withdrawn,
            _ => PrefixScope::Any,
        }
    }
}

/// A user-supplied prefix set reduced to its top-level members and
/// organized as a radix tree for ancestor lookups.
pub struct PrefixSet {
    tree: RadixTree<()>,
}

impl PrefixSet {
    /// Parse a comma-separated prefix list. Malformed entries fail
    /// construction of the whole chain.
    pub fn from_csv(raw: &str) -> Result<Self, ConfigError> {
        let mut keys: HashMap<String, ()> = HashMap::new();
        for part in raw.split(',') {
            let part = part.trim();
            let net = IpNet::from_str(part)
                .map_err(|e| ConfigError::BadFilter(format!("prefix {:?}: {}", part, e)))?;
            keys.insert(ip_to_radix_key(&net), ());
        }
        // equivalent or more-specific members are covered by their
        // ancestor, so only top-level representatives are kept
        retain_top_level(&mut keys);
        let mut tree = RadixTree::new();
        for key in keys.into_keys() {
            tree.insert(&key, ());
        }
        Ok(PrefixSet { tree })
    }

    /// True when the probe is an equal-or-more-specific route of some
    /// member of the set.
    pub fn covers(&self, prefix: &NetworkPrefix) -> bool {
        self.tree
            .longest_prefix(&ip_to_radix_key(&prefix.prefix))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

pub enum Filter {
    OriginAs {
        asns: HashSet<u32>,
        direction: AsDirection,
    },
    Prefix {
        set: PrefixSet,
        scope: PrefixScope,
    },
}

impl Filter {
    /// Build an origin-AS filter from a comma-separated AS list.
    pub fn origin_as(csv: &str, direction: AsDirection) -> Result<Self, ConfigError> {
        Ok(Filter::OriginAs {
            asns: parse_as_list(csv)?,
            direction,
        })
    }

    pub fn prefixes(csv: &str, scope: PrefixScope) -> Result<Self, ConfigError> {
        Ok(Filter::Prefix {
            set: PrefixSet::from_csv(csv)?,
            scope,
        })
    }

    pub fn matches(&self, record: &RecordStack) -> bool {
        match self {
            Filter::OriginAs { asns, direction } => {
                let path = match record.as_path() {
                    Some(path) if !path.is_empty() => path,
                    _ => return false,
                };
                let probe = match direction {
                    AsDirection::Source => *path.last().unwrap(),
                    AsDirection::Destination => path[0],
                };
                asns.contains(&probe)
            }
            Filter::Prefix { set, scope } => {
                let advertised = matches!(scope, PrefixScope::Any | PrefixScope::Advertised)
                    && record.advertised_prefixes().iter().any(|p| set.covers(p));
                if advertised {
                    return true;
                }
                matches!(scope, PrefixScope::Any | PrefixScope::Withdrawn)
                    && record.withdrawn_prefixes().iter().any(|p| set.covers(p))
            }
        }
    }
}

/// Evaluate the whole chain: logical AND with short-circuit on the
/// first rejection.
pub fn matches_all(filters: &[Filter], record: &RecordStack) -> bool {
    filters.iter().all(|f| f.matches(record))
}

/// Parse a comma-separated list of unsigned decimal AS numbers.
pub fn parse_as_list(csv: &str) -> Result<HashSet<u32>, ConfigError> {
    csv.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u32>()
                .map_err(|e| ConfigError::BadFilter(format!("AS number {:?}: {}", part, e)))
        })
        .collect()
}
