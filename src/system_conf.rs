//! Finds a DNS server from the system resolver configuration.

use hickory_resolver::config::ResolverConfig;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read system resolver configuration: {0}")]
    Read(String),

    #[error("No DNS servers found in system resolver configuration")]
    NoServers,
}

/// Returns the first nameserver configured for the system, e.g. in
/// `/etc/resolv.conf`.
pub fn server_from_system_conf() -> Result<SocketAddr, Error> {
    let (config, _opts) = hickory_resolver::system_conf::read_system_conf()
        .map_err(|err| Error::Read(err.to_string()))?;
    first_name_server(&config)
}

pub fn first_name_server(config: &ResolverConfig) -> Result<SocketAddr, Error> {
    config
        .name_servers()
        .first()
        .map(|name_server| name_server.socket_addr)
        .ok_or(Error::NoServers)
}
