//! Consul-backed service discovery using the agent's health API.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request};
use serde::Deserialize;
use url::Url;

use crate::client::{HttpClient, ResponseExt};
use crate::discovery::{DiscoveryClient, DiscoveryError, ServiceInstance};

/// A [`DiscoveryClient`] backed by a Consul agent.
///
/// Queries `/v1/health/service/{name}` with `passing=true`, so only instances
/// whose health checks currently pass are returned, in the order the agent
/// lists them.
///
/// ```no_run
/// use zipkin_discovery_sender::{ConsulDiscovery, Sender};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let consul = ConsulDiscovery::new(
///     reqwest::blocking::Client::new(),
///     "http://127.0.0.1:8500".parse()?,
/// );
/// let sender = Sender::builder()
///     .with_base_url("http://zipkin-service/api/v2/spans")
///     .with_discovery_client(consul)
///     .build()?;
/// # let _ = sender;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConsulDiscovery {
    client: Box<dyn HttpClient>,
    agent_url: Url,
}

impl ConsulDiscovery {
    /// Create a client talking to the Consul agent at `agent_url`, e.g.
    /// `http://127.0.0.1:8500`.
    pub fn new<T: HttpClient + 'static>(client: T, agent_url: Url) -> Self {
        ConsulDiscovery {
            client: Box::new(client),
            agent_url,
        }
    }

    fn health_url(&self, service_name: &str) -> Result<Url, DiscoveryError> {
        let mut url = self
            .agent_url
            .join(&format!("v1/health/service/{service_name}"))?;
        url.set_query(Some("passing=true"));
        Ok(url)
    }
}

#[async_trait]
impl DiscoveryClient for ConsulDiscovery {
    async fn get_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<ServiceInstance>, DiscoveryError> {
        let url = self.health_url(service_name)?;
        let request = Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .body(Bytes::new())?;
        let response = self.client.send_bytes(request).await?.error_for_status()?;
        let entries: Vec<HealthEntry> = serde_json::from_slice(response.body())?;

        let mut instances = Vec::with_capacity(entries.len());
        for entry in entries {
            // Agents commonly register services without an address of their
            // own; the node's address applies then.
            let address = if entry.service.address.is_empty() {
                entry
                    .node
                    .map(|node| node.address)
                    .unwrap_or_else(|| "127.0.0.1".to_string())
            } else {
                entry.service.address
            };
            let url = Url::parse(&format!("http://{}:{}", address, entry.service.port))?;
            instances.push(ServiceInstance::new(entry.service.id, url));
        }

        Ok(instances)
    }
}

#[derive(Debug, Deserialize)]
struct HealthEntry {
    #[serde(rename = "Service")]
    service: CatalogService,
    #[serde(rename = "Node")]
    node: Option<CatalogNode>,
}

#[derive(Debug, Deserialize)]
struct CatalogService {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
}

#[derive(Debug, Deserialize)]
struct CatalogNode {
    #[serde(rename = "Address")]
    address: String,
}
