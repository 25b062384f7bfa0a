// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # ElastiCache cluster discovery
//!
//! Finds the live nodes of an auto-discovery cache cluster by asking its
//! configuration endpoint, then hands the node list to any cache client.
//!
//! ## Use Cases
//!
//! - Memcached clusters where nodes come and go behind one configuration endpoint
//! - Startup-time node list for a client that expects a static server pool
//!
//! ## Example
//!
//! ```no_run
//! use elasticache_discovery::{ClusterDiscoveryClient, DiscoveryConfig};
//! use std::time::Duration;
//!
//! let client = ClusterDiscoveryClient::new(
//!     DiscoveryConfig::default().with_deadline(Duration::from_secs(3)),
//! )?;
//! let nodes = client.discover("my-cluster.cfg.use1.cache.amazonaws.com:11211")?;
//! for node in &nodes {
//!     println!("{}", node);
//! }
//! # Ok::<(), elasticache_discovery::DiscoveryError>(())
//! ```
//!
//! An empty endpoint falls back to the `ELASTICACHE_ENDPOINT` environment
//! variable. Discovery is one-shot: to follow topology changes, run it again
//! and rebuild the cache client.

pub mod cache_client;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod observer;
pub mod protocol;
pub mod transport;

pub use cache_client::{new_client, CacheClientFactory};
pub use client::ClusterDiscoveryClient;
pub use config::{ConfigError, DiscoveryConfig};
pub use endpoint::{resolve_endpoint, EndpointResolver, DEFAULT_ENDPOINT_ENV};
pub use error::{DiscoveryError, ErrorKind, Result, TransportPhase};
pub use observer::{DiscoveryEvent, DiscoveryObserver, LogObserver, NoopObserver};
pub use protocol::{decode_nodes, ClusterConfig, NodeRecord, PAYLOAD_LINE};
pub use transport::{Connection, Connector, Deadline, TcpConnector};

/// Discover node addresses with the default configuration over TCP.
///
/// Shorthand for `ClusterDiscoveryClient::new(DiscoveryConfig::default())?.discover(endpoint)`.
pub fn discover(endpoint: &str) -> Result<Vec<String>> {
    ClusterDiscoveryClient::new(DiscoveryConfig::default())?.discover(endpoint)
}
