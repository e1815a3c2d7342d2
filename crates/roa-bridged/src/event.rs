//! Validation events delivered by the feed.

use std::net::IpAddr;

use roa_bridge_config::AddressFamily;

/// Whether a prefix-origin pair entered or left the validated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// The record became valid.
    Announce,
    /// The record was withdrawn.
    Withdraw,
}

impl Action {
    /// Command verb the routing daemon expects for this action.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Announce => "add",
            Self::Withdraw => "delete",
        }
    }
}

/// One validated route origin: prefix, length bounds and origin AS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteOrigin {
    /// Network address of the prefix.
    pub address: IpAddr,
    /// Prefix length.
    pub min_length: u8,
    /// Longest more-specific covered by the authorisation.
    pub max_length: u8,
    /// Authorised origin AS number.
    pub origin_asn: u32,
}

impl RouteOrigin {
    /// Address family of the prefix.
    #[must_use]
    pub const fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address)
    }
}

/// A single announce or withdraw notification from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidationEvent {
    /// The affected record.
    pub origin: RouteOrigin,
    /// Whether the record was added or removed.
    pub action: Action,
}

impl ValidationEvent {
    /// Builds an announcement.
    #[must_use]
    pub const fn announce(origin: RouteOrigin) -> Self {
        Self {
            origin,
            action: Action::Announce,
        }
    }

    /// Builds a withdrawal.
    #[must_use]
    pub const fn withdraw(origin: RouteOrigin) -> Self {
        Self {
            origin,
            action: Action::Withdraw,
        }
    }

    /// Address family of the affected prefix.
    #[must_use]
    pub const fn family(&self) -> AddressFamily {
        self.origin.family()
    }
}
