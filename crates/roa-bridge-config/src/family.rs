//! Address families and the optional family filter applied to updates.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;

/// Address family of a validated prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4 prefixes.
    V4,
    /// IPv6 prefixes.
    V6,
}

impl AddressFamily {
    /// Classifies an address.
    #[must_use]
    pub const fn of(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => formatter.write_str("v4"),
            Self::V6 => formatter.write_str("v6"),
        }
    }
}

/// Families the bridge forwards to the routing daemon.
///
/// The textual form accepts anything naming the families by digit, so `4`,
/// `v4`, `ipv4`, `46` and `v4,v6` are all valid. `all` and `both` select
/// every family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressFamilyFilter {
    /// Forward IPv4 and IPv6 updates.
    #[default]
    Both,
    /// Forward IPv4 updates only.
    V4Only,
    /// Forward IPv6 updates only.
    V6Only,
}

impl AddressFamilyFilter {
    /// Returns `true` when updates of `family` should reach the daemon.
    #[must_use]
    pub const fn allows(self, family: AddressFamily) -> bool {
        matches!(
            (self, family),
            (Self::Both, _) | (Self::V4Only, AddressFamily::V4) | (Self::V6Only, AddressFamily::V6)
        )
    }
}

impl fmt::Display for AddressFamilyFilter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Both => formatter.write_str("all"),
            Self::V4Only => formatter.write_str("v4"),
            Self::V6Only => formatter.write_str("v6"),
        }
    }
}

impl FromStr for AddressFamilyFilter {
    type Err = FamilyFilterParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalised = input.trim().to_ascii_lowercase();
        if matches!(normalised.as_str(), "all" | "both") {
            return Ok(Self::Both);
        }
        match (normalised.contains('4'), normalised.contains('6')) {
            (true, true) => Ok(Self::Both),
            (true, false) => Ok(Self::V4Only),
            (false, true) => Ok(Self::V6Only),
            (false, false) => Err(FamilyFilterParseError(input.to_owned())),
        }
    }
}

/// Raised when a family filter names no address family.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("address family filter '{0}' names neither IPv4 nor IPv6")]
pub struct FamilyFilterParseError(pub String);
