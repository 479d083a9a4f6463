//! Services, the instances advertising them, and resolved instances.

use crate::endpoint::Endpoint;
use crate::name;
use crate::properties::VersionedProperties;

use std::sync::Arc;

/// Describes a class of service, such as `_ipp._tcp.example.com`.
///
/// Names are stored without their leading underscores.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Service {
    subtype: Option<Arc<str>>,
    name: Arc<str>,
    protocol: Arc<str>,
    domain: Arc<str>,
}

impl Service {
    pub fn new(name: impl ToString, protocol: impl ToString, domain: impl ToString) -> Self {
        Self {
            subtype: None,
            name: Arc::from(name.to_string()),
            protocol: Arc::from(protocol.to_string()),
            domain: Arc::from(domain.to_string()),
        }
    }

    /// Narrows the service to a subtype, e.g. `_printer._sub._http._tcp`.
    pub fn with_subtype(self, subtype: impl ToString) -> Self {
        Self {
            subtype: Some(Arc::from(subtype.to_string())),
            ..self
        }
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn labels(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(5);
        if let Some(subtype) = &self.subtype {
            out.push(format!("_{subtype}"));
            out.push("_sub".to_string());
        }
        out.push(format!("_{}", self.name));
        out.push(format!("_{}", self.protocol));
        out.push(self.domain.to_string());
        out
    }

    /// The name to query for PTR records enumerating instances.
    pub fn dns_name(&self) -> String {
        name::encode(&self.labels())
    }
}

/// A single advertised instance of a [Service].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Instance {
    service: Service,
    description: Arc<str>,

    /// The instance name exactly as an enumeration answer spelled it.
    ///
    /// Queries about this instance reuse it, rather than re-encoding the
    /// description, so escaping can never diverge from the server's.
    returned_name: Option<Arc<str>>,
}

impl Instance {
    pub fn new(service: Service, description: impl ToString) -> Self {
        Self {
            service,
            description: Arc::from(description.to_string()),
            returned_name: None,
        }
    }

    pub(crate) fn from_pointer(service: Service, description: String, target: &str) -> Self {
        Self {
            service,
            description: Arc::from(description),
            returned_name: Some(Arc::from(target)),
        }
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn returned_name(&self) -> Option<&str> {
        self.returned_name.as_deref()
    }

    pub fn labels(&self) -> Vec<String> {
        let mut out = vec![self.description.to_string()];
        out.extend(self.service.labels());
        out
    }

    pub fn dns_name(&self) -> String {
        match &self.returned_name {
            Some(name) => name.to_string(),
            None => name::encode(&self.labels()),
        }
    }
}

/// An [Instance] together with everything its SRV and TXT records said.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResolvedInstance {
    pub instance: Instance,

    /// Endpoints, most preferred first.
    pub endpoints: Vec<Endpoint>,

    pub properties: VersionedProperties,
}

impl ResolvedInstance {
    /// The endpoint with the highest priority, if any were advertised.
    pub fn primary_endpoint(&self) -> Option<&Endpoint> {
        self.endpoints.first()
    }
}
