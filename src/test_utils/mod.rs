//! Utilities to help with testing discovery

use crate::transport::{self, Record, RecordType, Transport};
use crate::transports::hickory::to_name;

use async_trait::async_trait;
use hickory_server::authority::{AuthorityObject, Catalog, ZoneType};
use hickory_server::proto::rr::{rdata, LowerName, Name, RData, RecordSet, RrKey};
use hickory_server::server::ServerFuture;
use hickory_server::store::in_memory::InMemoryAuthority;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{event, Level};

pub fn setup_tracing_subscriber() {
    use tracing_subscriber::fmt::format::FmtSpan;
    // Several tests share a process; only the first one installs it.
    let _ = tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_span_events(FmtSpan::ENTER)
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// How a [ScriptedTransport] answers one record type.
pub enum Reply {
    Answer {
        delay: Duration,
        records: Vec<Record>,
    },
    Fail {
        delay: Duration,
    },
    /// Never answers.
    Hang,
}

impl Reply {
    pub fn answer(records: Vec<Record>) -> Self {
        Reply::Answer {
            delay: Duration::ZERO,
            records,
        }
    }

    pub fn fail(delay: Duration) -> Self {
        Reply::Fail { delay }
    }

    /// Delays the reply by `delay`.
    pub fn after(self, delay: Duration) -> Self {
        match self {
            Reply::Answer { records, .. } => Reply::Answer { delay, records },
            Reply::Fail { .. } => Reply::Fail { delay },
            Reply::Hang => Reply::Hang,
        }
    }
}

/// A test-only transport with canned answers per record type.
///
/// Record types without a reply answer immediately with no records.
pub struct ScriptedTransport {
    replies: HashMap<RecordType, Reply>,
    queries: Mutex<Vec<(SocketAddr, String, RecordType)>>,
    in_flight: AtomicUsize,
}

// Counts a query as in flight for as long as it lives.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            queries: Mutex::new(vec![]),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn reply(mut self, record_type: RecordType, reply: Reply) -> Self {
        self.replies.insert(record_type, reply);
        self
    }

    /// Every query received so far, in order of arrival.
    pub fn queries(&self) -> Vec<(SocketAddr, String, RecordType)> {
        self.queries.lock().unwrap().clone()
    }

    /// How many queries have started but neither finished nor been dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn query(
        &self,
        server: SocketAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<Record>, transport::Error> {
        self.queries
            .lock()
            .unwrap()
            .push((server, name.to_string(), record_type));
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        match self.replies.get(&record_type) {
            None => Ok(vec![]),
            Some(Reply::Answer { delay, records }) => {
                tokio::time::sleep(*delay).await;
                Ok(records.clone())
            }
            Some(Reply::Fail { delay }) => {
                tokio::time::sleep(*delay).await;
                Err(transport::Error::Other(anyhow::anyhow!(
                    "scripted {record_type} failure"
                )))
            }
            Some(Reply::Hang) => futures::future::pending().await,
        }
    }
}

// Configuring a DNS server with hickory is a mess of configuration options.
//
// This builder serves a single DNS-SD service out of one zone.
pub struct DnsServerBuilder {
    domain: String,
    service: String,
    // Presentation-format descriptions, in the order they were added.
    instances: Vec<String>,
    srv: BTreeMap<String, Vec<rdata::SRV>>,
    txt: BTreeMap<String, Vec<rdata::TXT>>,
}

impl DnsServerBuilder {
    pub fn new(domain: impl ToString, service: impl ToString) -> Self {
        Self {
            domain: domain.to_string(),
            service: service.to_string(),
            instances: vec![],
            srv: BTreeMap::new(),
            txt: BTreeMap::new(),
        }
    }

    /// Advertises an instance through a PTR record.
    ///
    /// `description` is escaped as it would be in a zone file.
    pub fn add_instance(mut self, description: impl ToString) -> Self {
        self.instances.push(description.to_string());
        self
    }

    pub fn add_srv(mut self, description: &str, priority: u16, port: u16, target: &str) -> Self {
        let target = name(target);
        self.srv
            .entry(description.to_string())
            .or_default()
            .push(rdata::SRV::new(priority, 0, port, target));
        self
    }

    pub fn add_txt(mut self, description: &str, strings: &[&str]) -> Self {
        let strings = strings.iter().map(|s| s.to_string()).collect();
        self.txt
            .entry(description.to_string())
            .or_default()
            .push(rdata::TXT::new(strings));
        self
    }

    fn instance_name(&self, description: &str) -> Name {
        name(&format!("{description}.{}", self.service))
    }

    fn build_authority(&self) -> Box<dyn AuthorityObject> {
        let origin = name(&self.domain);
        let mut records = BTreeMap::new();

        let soa = rdata::SOA::new(origin.clone(), origin.clone(), 0, 0, 0, 0, 0);
        insert_record_set(&mut records, &origin, [RData::SOA(soa)]);

        insert_record_set(
            &mut records,
            &name(&self.service),
            self.instances
                .iter()
                .map(|description| RData::PTR(rdata::PTR(self.instance_name(description)))),
        );
        for (description, srv) in &self.srv {
            insert_record_set(
                &mut records,
                &self.instance_name(description),
                srv.iter().cloned().map(RData::SRV),
            );
        }
        for (description, txt) in &self.txt {
            insert_record_set(
                &mut records,
                &self.instance_name(description),
                txt.iter().cloned().map(RData::TXT),
            );
        }

        Box::new(Arc::new(
            InMemoryAuthority::new(origin, records, ZoneType::Primary, false).unwrap(),
        ))
    }

    fn build_catalog(&self) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.upsert(LowerName::new(&name(&self.domain)), self.build_authority());
        catalog
    }

    pub async fn run(self) -> SocketAddr {
        let listener = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        event!(Level::DEBUG, ?addr, "New DNS server on address");

        let mut server = ServerFuture::new(self.build_catalog());
        server.register_socket(listener);

        tokio::task::spawn(async move {
            server.block_until_done().await.unwrap();
        });

        addr
    }
}

fn name(presentation: &str) -> Name {
    to_name(presentation).unwrap()
}

// Adds one record set holding all of `rdatas`, unless there are none.
fn insert_record_set(
    records: &mut BTreeMap<RrKey, RecordSet>,
    name: &Name,
    rdatas: impl IntoIterator<Item = RData>,
) {
    let mut rdatas = rdatas.into_iter().peekable();
    let Some(record_type) = rdatas.peek().map(|rdata| rdata.record_type()) else {
        return;
    };

    let mut record_set = RecordSet::new(name, record_type, 0);
    for rdata in rdatas {
        record_set.insert(
            hickory_server::proto::rr::Record::from_rdata(name.clone(), 0, rdata),
            0,
        );
    }
    records.insert(RrKey::new(LowerName::new(name), record_type), record_set);
}
