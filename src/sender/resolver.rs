//! Resolution of the collector's current network location.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::CollectorConfig;
use crate::discovery::DiscoveryClient;

/// Resolves at send time where the collector actually is.
///
/// Without a discovery client the configured URL is taken as-is. With one, the
/// configured host is treated as a logical service name and the registry is
/// asked for its current instances. The variant is picked once, when the
/// sender is built.
#[derive(Debug)]
pub(crate) enum EndpointResolver {
    Static,
    Discovery(Arc<dyn DiscoveryClient>),
}

impl EndpointResolver {
    pub(crate) fn new(discovery: Option<Arc<dyn DiscoveryClient>>) -> Self {
        match discovery {
            Some(client) => EndpointResolver::Discovery(client),
            None => EndpointResolver::Static,
        }
    }

    /// Produce the collector location for one outgoing request.
    ///
    /// Resolution runs fresh per request, so a discovery-backed deployment
    /// tolerates instance churn at the cost of a lookup per send. It never
    /// fails: an unreachable registry, a service with no live instances, or a
    /// base URL without a host all fall back to the configured URL.
    pub(crate) async fn resolve(&self, config: &CollectorConfig) -> Url {
        let base_url = config.base_url();
        match self {
            EndpointResolver::Static => base_url.clone(),
            EndpointResolver::Discovery(discovery) => {
                let Some(service_name) = base_url.host_str() else {
                    return base_url.clone();
                };
                match discovery.get_instances(service_name).await {
                    Ok(instances) => instances
                        .into_iter()
                        .next()
                        .map(|instance| instance.into_url())
                        .unwrap_or_else(|| base_url.clone()),
                    Err(error) => {
                        debug!(
                            service = service_name,
                            %error,
                            "discovery lookup failed, using the configured endpoint"
                        );
                        base_url.clone()
                    }
                }
            }
        }
    }
}
