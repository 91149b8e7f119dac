//! # Zipkin Discovery Sender
//!
//! Posts serialized span batches to a [Zipkin](https://zipkin.io/) collector
//! whose address is resolved at send time: either taken verbatim from static
//! configuration, or looked up through a service-discovery client. In the
//! latter case the host portion of the configured URL is treated as a logical
//! service name, and every outgoing request is re-targeted at the first live
//! instance currently registered under that name.
//!
//! Only the scheme, user-info, host, and port of a request are ever rewritten;
//! path, query, and fragment always stay what the caller asked for, and a
//! location that cannot be recomposed into a valid URI leaves the request
//! untouched rather than failing the send.
//!
//! ## Quickstart
//!
//! First make sure you have a running version of the zipkin process you want to
//! send data to:
//!
//! ```shell
//! $ docker run -d -p 9411:9411 openzipkin/zipkin
//! ```
//!
//! Then build a sender and hand it batches your reporter has already encoded:
//!
//! ```no_run
//! use zipkin_discovery_sender::Sender;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sender = Sender::builder()
//!         .with_base_url("http://127.0.0.1:9411/api/v2/spans")
//!         .build()?;
//!
//!     let batch = br#"[]"#.to_vec();
//!     sender.send(batch).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The default endpoint can also be supplied through the
//! `ZIPKIN_SENDER_ENDPOINT` environment variable, and the default client's
//! transport timeout through `ZIPKIN_SENDER_TIMEOUT` (milliseconds).
//!
//! ## Resolving the collector through service discovery
//!
//! With a [`DiscoveryClient`] installed, the configured host doubles as the
//! service name to look up. Discovery returning no instances, or being
//! unreachable, is not an error; the sender silently falls back to the
//! configured URL.
//!
//! ```no_run
//! use zipkin_discovery_sender::{ConsulDiscovery, Encoding, Sender};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let consul = ConsulDiscovery::new(
//!         reqwest::blocking::Client::new(),
//!         "http://127.0.0.1:8500".parse()?,
//!     );
//!
//!     // "zipkin-service" is a logical name, not a reachable address.
//!     let sender = Sender::builder()
//!         .with_base_url("http://zipkin-service/api/v2/spans")
//!         .with_encoding(Encoding::JsonV2)
//!         .with_discovery_client(consul)
//!         .build()?;
//!
//!     sender.send(br#"[]"#.to_vec()).await?;
//!
//!     Ok(())
//! }
//! ```
#![deny(missing_docs, unreachable_pub, missing_debug_implementations)]

mod client;
mod discovery;
mod sender;

pub use client::{HttpClient, HttpError, ResponseExt};
pub use discovery::consul::ConsulDiscovery;
pub use discovery::{DiscoveryClient, DiscoveryError, ServiceInstance};
pub use sender::{CollectorConfig, Encoding, Error, Sender, SenderBuilder};
