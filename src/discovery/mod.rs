//! Service discovery seam for locating the collector.
//!
//! When a [`DiscoveryClient`] is installed, the host portion of the configured
//! collector URL names a logical service rather than a reachable address, and
//! the sender asks the registry for that service's live instances before every
//! send. Absence of a discovery client is not an error; the sender then always
//! uses the configured URL.

use std::fmt::Debug;

use async_trait::async_trait;
use url::Url;

pub(crate) mod consul;

/// Errors produced by a [`DiscoveryClient`] implementation.
pub type DiscoveryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A live, discovered network endpoint for a logical service.
#[derive(Clone, Debug)]
pub struct ServiceInstance {
    service_id: String,
    url: Url,
}

impl ServiceInstance {
    /// Create an instance record from its registry id and address.
    pub fn new<T: Into<String>>(service_id: T, url: Url) -> Self {
        ServiceInstance {
            service_id: service_id.into(),
            url,
        }
    }

    /// Registry identifier of this instance.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Address the instance is reachable at.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Consume the record, returning the instance address.
    pub fn into_url(self) -> Url {
        self.url
    }
}

/// A client for a service registry such as Consul or Eureka.
///
/// Implementations must be safe to call concurrently; a multi-threaded span
/// reporter resolves the collector from every thread that sends.
#[async_trait]
pub trait DiscoveryClient: Debug + Send + Sync {
    /// Return the live instances registered under `service_name`, in registry
    /// order.
    ///
    /// An empty vector means the service is currently unknown to the registry;
    /// callers treat that as a signal to fall back to static configuration,
    /// not as an error.
    async fn get_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<ServiceInstance>, DiscoveryError>;
}
