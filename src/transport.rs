//! The interface for sending DNS queries.

use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O Error")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(anyhow::Error),
}

/// How many times a failed query is retried before the failure is reported.
///
/// Failures go straight to the caller.
pub const QUERY_RETRIES: usize = 0;

/// The record types consumed during discovery.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    Ptr,
    Srv,
    Txt,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The contents of an SRV record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    /// Presentation-format target host.
    pub target: String,
}

/// An answer record, decoded by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    /// Presentation-format name the pointer refers to.
    Ptr(String),
    Srv(Srv),
    /// The character strings of one TXT record, in order.
    Txt(Vec<String>),
    /// Any other record type appearing in an answer section.
    Other,
}

/// Sends a single question to a DNS server and returns the answers.
///
/// Names are passed and returned in presentation format, dot-terminated and
/// escaped as by [crate::name::encode]. Implementations should report an
/// empty answer section (including NXDOMAIN) as an empty list, reserving
/// errors for queries which could not be sent or answered.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn query(
        &self,
        server: SocketAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<Record>, Error>;
}

pub type SharedTransport = Arc<dyn Transport>;
