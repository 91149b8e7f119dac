//! HTTP sender for serialized Zipkin span batches.

mod env;
mod resolver;
mod rewrite;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{header::CONTENT_TYPE, Method, Request, Uri};
use url::Url;

use crate::client::{HttpClient, HttpError, ResponseExt};
use crate::discovery::DiscoveryClient;
use resolver::EndpointResolver;
use rewrite::ResolvingClient;

/// Wire encoding of the span batches handed to [`Sender::send`].
///
/// The sender never encodes spans itself; the selector only determines the
/// `Content-Type` the collector is told to expect.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Encoding {
    /// Zipkin's legacy v1 JSON format.
    JsonV1,
    /// Zipkin's v2 JSON format.
    #[default]
    JsonV2,
    /// Zipkin's v2 protobuf format.
    Protobuf,
}

impl Encoding {
    /// The `Content-Type` announced for batches in this encoding.
    pub fn content_type(&self) -> &'static str {
        match self {
            Encoding::JsonV1 | Encoding::JsonV2 => "application/json",
            Encoding::Protobuf => "application/x-protobuf",
        }
    }
}

/// Immutable collector configuration, shared by the resolver and the sender.
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    base_url: Url,
    encoding: Encoding,
}

impl CollectorConfig {
    /// Create a configuration record from a parsed base URL and an encoding.
    pub fn new(base_url: Url, encoding: Encoding) -> Self {
        CollectorConfig { base_url, encoding }
    }

    /// The configured collector base URL.
    ///
    /// With a discovery client installed, the host portion doubles as the
    /// logical service name to look up.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The configured batch encoding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

/// Sends pre-encoded span batches to a Zipkin collector.
///
/// Construct one with [`Sender::builder`]; a span-reporting pipeline then
/// calls [`send`](Sender::send) with each batch it has serialized.
#[derive(Debug)]
pub struct Sender {
    client: ResolvingClient,
    endpoint: Uri,
    encoding: Encoding,
}

impl Sender {
    /// Create a builder with the default endpoint, encoding, and client.
    pub fn builder() -> SenderBuilder {
        SenderBuilder::default()
    }

    /// POST one serialized span batch to the collector.
    ///
    /// The batch must already be encoded as announced by the configured
    /// [`Encoding`]. The collector location is resolved freshly for this call;
    /// transport failures and non-2xx collector responses are returned as
    /// [`Error::Send`].
    pub async fn send(&self, batch: Vec<u8>) -> Result<(), Error> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, self.encoding.content_type())
            .body(Bytes::from(batch))?;
        let response = self
            .client
            .send_bytes(request)
            .await
            .map_err(Error::Send)?;
        response.error_for_status().map_err(Error::Send)?;
        Ok(())
    }
}

type ClientCustomizer = Box<dyn FnOnce(Box<dyn HttpClient>) -> Box<dyn HttpClient> + Send>;

/// Builder for [`Sender`].
pub struct SenderBuilder {
    base_url: String,
    encoding: Encoding,
    client: Option<Box<dyn HttpClient>>,
    discovery: Option<Arc<dyn DiscoveryClient>>,
    customizer: Option<ClientCustomizer>,
}

impl fmt::Debug for SenderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderBuilder")
            .field("base_url", &self.base_url)
            .field("encoding", &self.encoding)
            .field("client", &self.client)
            .field("discovery", &self.discovery)
            .field("customizer", &self.customizer.is_some())
            .finish()
    }
}

impl Default for SenderBuilder {
    fn default() -> Self {
        SenderBuilder {
            #[cfg(feature = "reqwest-blocking-client")]
            client: Some(Box::new(
                reqwest::blocking::Client::builder()
                    .timeout(env::get_timeout())
                    .build()
                    .unwrap_or_else(|_| reqwest::blocking::Client::new()),
            )),
            #[cfg(all(
                not(feature = "reqwest-blocking-client"),
                feature = "reqwest-client"
            ))]
            client: Some(Box::new(
                reqwest::Client::builder()
                    .timeout(env::get_timeout())
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            )),
            #[cfg(all(
                not(feature = "reqwest-client"),
                not(feature = "reqwest-blocking-client")
            ))]
            client: None,

            base_url: env::get_endpoint(),
            encoding: Encoding::default(),
            discovery: None,
            customizer: None,
        }
    }
}

impl SenderBuilder {
    /// Assign the collector base URL.
    ///
    /// Without a discovery client the batches are POSTed here verbatim. With
    /// one, the host portion is treated as a logical service name and the
    /// remaining components are rewritten per send from the first live
    /// instance.
    pub fn with_base_url<T: Into<String>>(mut self, base_url: T) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Assign the encoding of the batches this sender will be handed.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Assign the HTTP client implementation used to reach the collector.
    pub fn with_http_client<T: HttpClient + 'static>(mut self, client: T) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    /// Assign a discovery client used to resolve the collector per send.
    pub fn with_discovery_client<T: DiscoveryClient + 'static>(mut self, discovery: T) -> Self {
        self.discovery = Some(Arc::new(discovery));
        self
    }

    /// Assign a hook that may wrap or replace the HTTP client.
    ///
    /// The hook runs exactly once, while the sender is built, after the client
    /// itself has been chosen.
    pub fn with_client_customizer<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(Box<dyn HttpClient>) -> Box<dyn HttpClient> + Send + 'static,
    {
        self.customizer = Some(Box::new(customizer));
        self
    }

    /// Build the sender.
    pub fn build(self) -> Result<Sender, Error> {
        let client = self.client.ok_or(Error::NoHttpClient)?;
        let client = match self.customizer {
            Some(customize) => customize(client),
            None => client,
        };

        let base_url = Url::parse(&self.base_url)?;
        let endpoint: Uri = base_url.as_str().parse()?;
        let config = CollectorConfig::new(base_url, self.encoding);
        let resolver = EndpointResolver::new(self.discovery);

        Ok(Sender {
            client: ResolvingClient::new(client, resolver, config.clone()),
            endpoint,
            encoding: config.encoding(),
        })
    }
}

/// Errors raised while building a sender or sending a batch.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No http client implementation found. User should provide one or enable features.
    #[error("http client must be set, users can enable a reqwest feature or provide a client with `with_http_client`")]
    NoHttpClient,

    /// The span batch request could not be constructed.
    #[error("http request failed with {0}")]
    RequestFailed(#[from] http::Error),

    /// The configured base URL does not parse.
    #[error("invalid collector base url: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// The configured base URL is not a valid request target.
    #[error("invalid uri")]
    InvalidUri(#[from] http::uri::InvalidUri),

    /// The batch could not be delivered, or the collector refused it.
    #[error("failed to send spans: {0}")]
    Send(#[source] HttpError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{DiscoveryError, ServiceInstance};
    use async_trait::async_trait;
    use http::Response;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct RecordingClient {
        requests: Arc<Mutex<Vec<Request<Bytes>>>>,
        status: u16,
    }

    impl RecordingClient {
        fn accepting() -> Self {
            RecordingClient {
                requests: Arc::new(Mutex::new(Vec::new())),
                status: 202,
            }
        }
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn send_bytes(
            &self,
            request: Request<Bytes>,
        ) -> Result<Response<Bytes>, HttpError> {
            self.requests.lock().unwrap().push(request);
            Ok(Response::builder().status(self.status).body(Bytes::new())?)
        }
    }

    #[derive(Debug)]
    struct FixedDiscovery(Vec<ServiceInstance>);

    #[async_trait]
    impl DiscoveryClient for FixedDiscovery {
        async fn get_instances(
            &self,
            _service_name: &str,
        ) -> Result<Vec<ServiceInstance>, DiscoveryError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn encodings_announce_their_content_type() {
        assert_eq!(Encoding::JsonV1.content_type(), "application/json");
        assert_eq!(Encoding::JsonV2.content_type(), "application/json");
        assert_eq!(Encoding::Protobuf.content_type(), "application/x-protobuf");
        assert_eq!(Encoding::default(), Encoding::JsonV2);
    }

    #[tokio::test]
    async fn batches_are_posted_to_the_configured_endpoint() {
        let client = RecordingClient::accepting();
        let requests = client.requests.clone();
        let sender = Sender::builder()
            .with_base_url("http://127.0.0.1:9411/api/v2/spans")
            .with_http_client(client)
            .build()
            .unwrap();

        sender.send(b"[{}]".to_vec()).await.unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[0].uri().to_string(),
            "http://127.0.0.1:9411/api/v2/spans"
        );
        assert_eq!(requests[0].method(), Method::POST);
        assert_eq!(
            requests[0].headers()[CONTENT_TYPE],
            Encoding::JsonV2.content_type()
        );
        assert_eq!(requests[0].body().as_ref(), b"[{}]");
    }

    #[tokio::test]
    async fn discovered_instances_retarget_the_batch() {
        let client = RecordingClient::accepting();
        let requests = client.requests.clone();
        let instance = ServiceInstance::new(
            "zipkin-1",
            Url::parse("http://10.0.0.5:9411").unwrap(),
        );
        let sender = Sender::builder()
            .with_base_url("http://zipkin-service/api/v2/spans")
            .with_http_client(client)
            .with_discovery_client(FixedDiscovery(vec![instance]))
            .build()
            .unwrap();

        sender.send(b"[]".to_vec()).await.unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[0].uri().to_string(),
            "http://10.0.0.5:9411/api/v2/spans"
        );
    }

    #[tokio::test]
    async fn empty_discovery_posts_to_the_configured_endpoint() {
        let client = RecordingClient::accepting();
        let requests = client.requests.clone();
        let sender = Sender::builder()
            .with_base_url("http://zipkin-service/api/v2/spans")
            .with_http_client(client)
            .with_discovery_client(FixedDiscovery(Vec::new()))
            .build()
            .unwrap();

        sender.send(b"[]".to_vec()).await.unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(
            requests[0].uri().to_string(),
            "http://zipkin-service/api/v2/spans"
        );
    }

    #[tokio::test]
    async fn collector_refusals_become_send_errors() {
        let client = RecordingClient {
            requests: Arc::new(Mutex::new(Vec::new())),
            status: 500,
        };
        let sender = Sender::builder()
            .with_base_url("http://127.0.0.1:9411/api/v2/spans")
            .with_http_client(client)
            .build()
            .unwrap();

        let err = sender.send(b"[]".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::Send(_)));
    }

    #[tokio::test]
    async fn the_customizer_may_replace_the_client() {
        let replacement = RecordingClient::accepting();
        let requests = replacement.requests.clone();
        let replacement = Mutex::new(Some(replacement));
        let sender = Sender::builder()
            .with_base_url("http://127.0.0.1:9411/api/v2/spans")
            .with_client_customizer(move |_client| {
                Box::new(replacement.lock().unwrap().take().unwrap())
            })
            .with_http_client(RecordingClient::accepting())
            .build()
            .unwrap();

        sender.send(b"[]".to_vec()).await.unwrap();
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn a_malformed_base_url_fails_the_build() {
        let err = Sender::builder()
            .with_base_url("not a url")
            .with_http_client(RecordingClient::accepting())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }
}
