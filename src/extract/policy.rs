use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid IP range '{range}': {source}")]
    InvalidRange {
        range: String,
        source: ipnet::AddrParseError,
    },
}

/// Which remote addresses the extractor may contact.
///
/// The deny list wins over the allow list. A non-empty allow list admits
/// only its own ranges; with both lists empty every address is permitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpPolicy {
    allow: Vec<IpNet>,
    deny: Vec<IpNet>,
}

impl IpPolicy {
    pub fn new(allow: Vec<IpNet>, deny: Vec<IpNet>) -> Self {
        Self { allow, deny }
    }

    /// Build from space-separated range lists such as `"10.0.0.0/8 ::1/128"`
    pub fn from_ranges(allow: &str, deny: &str) -> Result<Self, PolicyError> {
        Ok(Self::new(parse_ranges(allow)?, parse_ranges(deny)?))
    }

    pub fn permits(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();

        if self.deny.iter().any(|net| net.contains(&ip)) {
            return false;
        }

        self.allow.is_empty() || self.allow.iter().any(|net| net.contains(&ip))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

/// Parse a whitespace-separated list of CIDR ranges. A bare address is
/// taken as a single-host range.
pub fn parse_ranges(ranges: &str) -> Result<Vec<IpNet>, PolicyError> {
    ranges
        .split_whitespace()
        .map(|range| {
            range
                .parse::<IpNet>()
                .or_else(|err| range.parse::<IpAddr>().map(IpNet::from).map_err(|_| err))
                .map_err(|source| PolicyError::InvalidRange {
                    range: range.to_string(),
                    source,
                })
        })
        .collect()
}
