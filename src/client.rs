//! The DNS-SD client: enumerates instances of a service and resolves them.

use crate::endpoint::{self, Endpoint};
use crate::name;
use crate::properties::{self, VersionedProperties};
use crate::service::{Instance, ResolvedInstance, Service};
use crate::system_conf;
use crate::transport::{self, Record, RecordType, SharedTransport, Transport};

#[cfg(feature = "probes")]
use crate::probes;

use debug_ignore::DebugIgnore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{event, instrument, span, Instrument, Level};

#[derive(Error, Debug)]
pub enum Error {
    #[error("DNS query failed")]
    Transport(#[from] transport::Error),

    #[error("Timed out waiting for DNS responses")]
    Timeout,

    #[error("Could not determine a DNS server address")]
    Config(#[from] system_conf::Error),

    #[error("Malformed name in DNS answer")]
    MalformedName(#[from] name::Error),

    #[error("Query task terminated unexpectedly")]
    QueryTerminated,
}

// How long may resolving an instance take, from sending its queries until
// the last answer arrives?
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration options to tweak client behavior.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// How long to wait for all answers while resolving an instance.
    ///
    /// Default: 1 second
    pub query_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

// Record types queried, concurrently, to resolve one instance.
const RESOLVE_RECORD_TYPES: [RecordType; 2] = [RecordType::Srv, RecordType::Txt];

type Outcome = (RecordType, Result<Vec<Record>, transport::Error>);

// How far along collecting answers for one instance we are.
//
// Failures and timeouts end resolution directly from any non-terminal state,
// so they have no variant here.
#[derive(Debug, PartialEq, Eq)]
enum Progress {
    // No answers yet.
    //
    // - (On answer) Progress becomes CollectedOne
    Pending,

    // One of the two queries has answered.
    //
    // - (On answer) Progress becomes CollectedBoth
    CollectedOne,

    // Final state, when resolution succeeds.
    CollectedBoth,
}

impl Progress {
    fn answered(self) -> Self {
        match self {
            Progress::Pending => Progress::CollectedOne,
            Progress::CollectedOne | Progress::CollectedBoth => Progress::CollectedBoth,
        }
    }
}

// Queries spawned while resolving an instance.
//
// Dropping this aborts any query still in flight; its answer would never be
// read anyway.
struct QueryTasks(Vec<AbortHandle>);

impl Drop for QueryTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Discovers and resolves instances of DNS-SD services.
#[derive(Debug)]
pub struct Client {
    transport: DebugIgnore<SharedTransport>,
    server: SocketAddr,
    config: ClientConfig,
}

impl Client {
    /// Creates a new client.
    ///
    /// - `transport`: Sends queries and decodes their answers.
    /// - `server`: The DNS server to query. If `None`, the first nameserver
    ///   of the system resolver configuration is used.
    /// - `config`: Additional tweakable configuration options.
    pub fn new(
        transport: SharedTransport,
        server: Option<SocketAddr>,
        config: ClientConfig,
    ) -> Result<Self, Error> {
        let server = match server {
            Some(server) => server,
            None => system_conf::server_from_system_conf()?,
        };

        #[cfg(feature = "probes")]
        if let Err(err) = usdt::register_probes() {
            event!(Level::WARN, ?err, "Failed to register USDT probes");
        }

        Ok(Self {
            transport: DebugIgnore(transport),
            server,
            config,
        })
    }

    /// The DNS server this client queries.
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Lists the instances advertised for `service`.
    #[instrument(skip(self), name = "Client::enumerate")]
    pub async fn enumerate(&self, service: &Service) -> Result<Vec<Instance>, Error> {
        let service_name = service.dns_name();
        let records = query(
            &**self.transport,
            self.server,
            &service_name,
            RecordType::Ptr,
        )
        .await?;

        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let Record::Ptr(target) = record else {
                continue;
            };
            // Only the description needs to be split off; the rest of the
            // name is the service we asked about.
            let description = name::decode(&target, 2)?
                .into_iter()
                .next()
                .unwrap_or_default();
            out.push(Instance::from_pointer(service.clone(), description, &target));
        }
        event!(Level::DEBUG, count = out.len(), "Enumerated instances");
        Ok(out)
    }

    /// Looks up the endpoints and properties of an instance.
    ///
    /// The SRV and TXT queries are sent concurrently. This fails as soon as
    /// either query fails, or if both have not answered within
    /// [ClientConfig::query_timeout].
    #[instrument(skip(self), name = "Client::resolve")]
    pub async fn resolve(&self, instance: &Instance) -> Result<ResolvedInstance, Error> {
        let name: Arc<str> = Arc::from(instance.dns_name());

        #[cfg(feature = "probes")]
        probes::resolve__start!(|| &*name);

        let result = self.collect(instance, name.clone()).await;

        match &result {
            Ok(resolved) => {
                event!(
                    Level::DEBUG,
                    endpoints = resolved.endpoints.len(),
                    versions = resolved.properties.len(),
                    "Resolved instance"
                );
                #[cfg(feature = "probes")]
                probes::resolve__done!(|| (&*name, resolved.endpoints.len() as u64));
            }
            Err(err) => {
                event!(Level::ERROR, ?err, "Failed to resolve instance");
                #[cfg(feature = "probes")]
                {
                    let reason = err.to_string();
                    probes::resolve__failed!(|| (&*name, reason.as_str()));
                }
            }
        }
        result
    }

    /// Resolves several instances concurrently, failing on the first error.
    pub async fn resolve_all(
        &self,
        instances: &[Instance],
    ) -> Result<Vec<ResolvedInstance>, Error> {
        futures::future::try_join_all(instances.iter().map(|instance| self.resolve(instance)))
            .await
    }

    /// Enumerates the instances of `service` and resolves all of them.
    pub async fn discover(&self, service: &Service) -> Result<Vec<ResolvedInstance>, Error> {
        let instances = self.enumerate(service).await?;
        self.resolve_all(&instances).await
    }

    fn spawn_queries(&self, name: Arc<str>, tx: mpsc::Sender<Outcome>) -> QueryTasks {
        let handles = RESOLVE_RECORD_TYPES
            .iter()
            .map(|&record_type| {
                let transport = self.transport.0.clone();
                let server = self.server;
                let name = name.clone();
                let tx = tx.clone();
                let span = span!(Level::DEBUG, "query", %record_type);
                tokio::task::spawn(
                    async move {
                        let result = query(&*transport, server, &name, record_type).await;
                        // The channel holds one outcome per query, so this
                        // never waits. It fails only if the collector has
                        // already returned.
                        let _send_result = tx.try_send((record_type, result));
                    }
                    .instrument(span),
                )
                .abort_handle()
            })
            .collect();
        QueryTasks(handles)
    }

    async fn collect(
        &self,
        instance: &Instance,
        name: Arc<str>,
    ) -> Result<ResolvedInstance, Error> {
        let (tx, mut rx) = mpsc::channel(RESOLVE_RECORD_TYPES.len());
        let _tasks = self.spawn_queries(name, tx);

        let deadline = tokio::time::sleep(self.config.query_timeout);
        tokio::pin!(deadline);

        let mut endpoints = Vec::with_capacity(3);
        let mut properties = VersionedProperties::new();
        let mut progress = Progress::Pending;

        while progress != Progress::CollectedBoth {
            tokio::select! {
                outcome = rx.recv() => {
                    let Some((record_type, result)) = outcome else {
                        return Err(Error::QueryTerminated);
                    };
                    let records = result?;
                    event!(Level::DEBUG, %record_type, count = records.len(), "Received answers");
                    absorb(records, &mut endpoints, &mut properties);
                    progress = progress.answered();
                }
                _ = &mut deadline => {
                    event!(Level::WARN, ?progress, "Timed out waiting for answers");
                    return Err(Error::Timeout);
                }
            }
        }

        endpoint::rank(&mut endpoints);
        Ok(ResolvedInstance {
            instance: instance.clone(),
            endpoints,
            properties,
        })
    }
}

// Folds answers into the resolution, by the type of each record rather than
// the query it answered.
fn absorb(records: Vec<Record>, endpoints: &mut Vec<Endpoint>, props: &mut VersionedProperties) {
    for record in records {
        match record {
            // Weight is not used for selection
            Record::Srv(srv) => {
                endpoints.push(Endpoint::new(srv.target, srv.port, srv.priority));
            }
            Record::Txt(strings) => properties::parse_txt(props, &strings),
            Record::Ptr(_) | Record::Other => (),
        }
    }
}

async fn query(
    transport: &dyn Transport,
    server: SocketAddr,
    name: &str,
    record_type: RecordType,
) -> Result<Vec<Record>, transport::Error> {
    #[cfg(feature = "probes")]
    probes::query__start!(|| (name, record_type.as_str()));

    let result = transport.query(server, name, record_type).await;

    match &result {
        Ok(_records) => {
            #[cfg(feature = "probes")]
            probes::query__done!(|| (name, record_type.as_str(), _records.len() as u64));
        }
        Err(err) => {
            event!(Level::ERROR, ?err, %record_type, name, "DNS query failed");
            #[cfg(feature = "probes")]
            {
                let reason = err.to_string();
                probes::query__failed!(|| (name, record_type.as_str(), reason.as_str()));
            }
        }
    }
    result
}
