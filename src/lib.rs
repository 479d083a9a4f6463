//! dnssd discovers services advertised through DNS-SD.
//!
//! It uses the following terminology:
//! * A service is a class of functionality, named like `_ipp._tcp.example.com`
//!   and optionally narrowed by a subtype.
//! * Instances are the specific advertisements of a service, found through
//!   its PTR records and named by a human-readable description.
//! * Resolving an instance looks up its SRV records (where to connect) and
//!   TXT records (properties, partitioned by version).
//!
//! # Usage
//!
//! * The main interface for this crate is [client::Client].
//! * To construct a client, you must supply a [transport::Transport], which
//!   sends DNS queries. [transports::hickory::HickoryTransport] does so over
//!   UDP.
//!
//! ```no_run
//! # async fn example() -> Result<(), dnssd::client::Error> {
//! use dnssd::client::{Client, ClientConfig};
//! use dnssd::service::Service;
//! use dnssd::transports::hickory::HickoryTransport;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(HickoryTransport::default());
//! let client = Client::new(transport, None, ClientConfig::default())?;
//! let service = Service::new("postgresql", "tcp", "example.com");
//! for instance in client.enumerate(&service).await? {
//!     let resolved = client.resolve(&instance).await?;
//!     println!("{}: {:?}", instance.description(), resolved.endpoints);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # DTrace probes
//!
//! dnssd contains a number of DTrace USDT probes, which fire as the client
//! sends queries and resolves instances. The full list of probes is:
//!
//! - `query-start`: Fires before a query is handed to the transport.
//! - `query-done`: Fires after a query is answered, with the answer count.
//! - `query-failed`: Fires after a query fails.
//! - `resolve-start`: Fires before resolving an instance.
//! - `resolve-done`: Fires after resolving an instance, with the number of
//!   endpoints found.
//! - `resolve-failed`: Fires when resolving an instance fails or times out.
//!
//! The existence of the probes is behind the `"probes"` feature, which is
//! enabled by default. Probes are zero-cost unless they are explicitly enabled,
//! by tracing the program with the `dtrace(1)` command-line tool.
//!
//! Probes are registered when a [client::Client] is created. Registration is
//! technically fallible; a failure is logged, and the client works without
//! instrumentation.

// Public API
pub mod client;
pub mod endpoint;
pub mod name;
pub mod properties;
pub mod service;
pub mod system_conf;
pub mod transport;

#[cfg(test)]
mod test_utils;

// Default implementations of generic interfaces
pub mod transports;

/// USDT probes for tracing how dnssd queries DNS.
#[cfg(feature = "probes")]
#[usdt::provider(provider = "dnssd")]
mod probes {
    /// Fires right before sending a query, with the name and record type.
    fn query__start(name: &str, record_type: &str) {}

    /// Fires when a query is answered, with the number of answer records.
    fn query__done(name: &str, record_type: &str, answers: u64) {}

    /// Fires when a query fails, with a string identifying the reason.
    fn query__failed(name: &str, record_type: &str, reason: &str) {}

    /// Fires right before resolving an instance.
    fn resolve__start(name: &str) {}

    /// Fires when an instance is resolved, with the number of endpoints.
    fn resolve__done(name: &str, endpoints: u64) {}

    /// Fires when resolving an instance fails, including on timeout.
    fn resolve__failed(name: &str, reason: &str) {}
}
