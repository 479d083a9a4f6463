//! Endpoints advertised by SRV records, and their ranking.

use std::cmp::Reverse;
use std::hash::{Hash, Hasher};

/// A host and port at which an instance can be reached.
///
/// The priority only influences [rank]; two endpoints naming the same host
/// and port are equal regardless of priority.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    #[cfg_attr(feature = "serde", serde(skip))]
    priority: u16,
}

impl Endpoint {
    pub fn new(host: impl ToString, port: u16, priority: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            priority,
        }
    }

    /// A higher priority makes this endpoint more preferred.
    pub fn priority(&self) -> u16 {
        self.priority
    }

    /// Formats the endpoint as `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

/// Orders endpoints so the highest priority comes first.
///
/// Note this is the reverse of the usual SRV convention, where the lowest
/// priority wins. Endpoints of equal priority keep their relative order.
pub fn rank(endpoints: &mut [Endpoint]) {
    endpoints.sort_by_key(|endpoint| Reverse(endpoint.priority));
}
