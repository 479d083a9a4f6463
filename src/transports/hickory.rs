//! Implementation of [Transport] on top of hickory's resolver

use crate::name;
use crate::transport::{self, Record, RecordType, Srv, Transport, QUERY_RETRIES};

use async_trait::async_trait;
use hickory_resolver::config::NameServerConfig;
use hickory_resolver::config::Protocol;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::config::ResolverOpts;
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::rr::domain::Label;
use hickory_resolver::proto::rr::{self, RData};
use hickory_resolver::{Name, TokioAsyncResolver};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{event, instrument, Level};

// How long may a single query take before hickory gives up on it?
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(2);

/// Sends queries over UDP through a [TokioAsyncResolver].
///
/// One resolver is kept per DNS server, created on first use.
pub struct HickoryTransport {
    timeout: Duration,
    resolvers: Mutex<HashMap<SocketAddr, TokioAsyncResolver>>,
}

impl HickoryTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    fn resolver(&self, address: SocketAddr) -> TokioAsyncResolver {
        let mut resolvers = self.resolvers.lock().unwrap();
        resolvers
            .entry(address)
            .or_insert_with(|| new_resolver(address, self.timeout))
            .clone()
    }
}

impl Default for HickoryTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSPORT_TIMEOUT)
    }
}

fn new_resolver(address: SocketAddr, timeout: Duration) -> TokioAsyncResolver {
    let mut rc = ResolverConfig::new();
    rc.add_name_server(NameServerConfig {
        socket_addr: address,
        protocol: Protocol::Udp,
        tls_dns_name: None,
        trust_negative_responses: false,
        bind_addr: None,
    });
    let mut opts = ResolverOpts::default();
    opts.use_hosts_file = false;
    opts.timeout = timeout;
    opts.attempts = QUERY_RETRIES;
    opts.edns0 = true;
    TokioAsyncResolver::tokio(rc, opts)
}

#[async_trait]
impl Transport for HickoryTransport {
    #[instrument(skip(self), name = "HickoryTransport::query")]
    async fn query(
        &self,
        server: SocketAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<Record>, transport::Error> {
        let name = to_name(name)?;
        let lookup = match self.resolver(server).lookup(name, to_record_type(record_type)).await {
            Ok(lookup) => lookup,
            Err(err) => match err.kind() {
                // An empty answer is still an answer
                ResolveErrorKind::NoRecordsFound { .. } => {
                    event!(Level::DEBUG, "No records found");
                    return Ok(vec![]);
                }
                _ => return Err(transport::Error::Other(err.into())),
            },
        };

        let records: Vec<_> = lookup.iter().map(to_record).collect();
        event!(Level::DEBUG, ?records, "Successfully looked up records");
        Ok(records)
    }
}

fn to_record_type(record_type: RecordType) -> rr::RecordType {
    match record_type {
        RecordType::Ptr => rr::RecordType::PTR,
        RecordType::Srv => rr::RecordType::SRV,
        RecordType::Txt => rr::RecordType::TXT,
    }
}

fn to_record(rdata: &RData) -> Record {
    match rdata {
        RData::PTR(ptr) => Record::Ptr(presentation(&ptr.0)),
        RData::SRV(srv) => Record::Srv(Srv {
            priority: srv.priority(),
            weight: srv.weight(),
            port: srv.port(),
            target: presentation(srv.target()),
        }),
        RData::TXT(txt) => Record::Txt(
            txt.txt_data()
                .iter()
                .map(|data| String::from_utf8_lossy(data).into_owned())
                .collect(),
        ),
        _ => Record::Other,
    }
}

/// Converts a presentation-format name into hickory's form.
///
/// The labels are taken as raw bytes: DNS-SD instance names routinely hold
/// spaces and other characters a hostname may not.
pub(crate) fn to_name(name: &str) -> Result<Name, transport::Error> {
    let labels = name::decode(name, 0).map_err(|err| transport::Error::Other(err.into()))?;
    let labels = labels
        .iter()
        .map(|label| Label::from_raw_bytes(label.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| transport::Error::Other(err.into()))?;
    Name::from_labels(labels).map_err(|err| transport::Error::Other(err.into()))
}

/// Renders a name in presentation format, escaping every label.
fn presentation(name: &Name) -> String {
    let mut out = String::new();
    for label in name.iter() {
        name::escape_into(&mut out, &String::from_utf8_lossy(label));
        out.push('.');
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}
