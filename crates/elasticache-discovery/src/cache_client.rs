// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handoff of discovered nodes to a cache client.
//!
//! The cache client itself (wire protocol, pooling, key distribution) is not
//! part of this crate. Anything that can be built from a list of `ip:port`
//! strings plugs in through [`CacheClientFactory`].

use crate::client::ClusterDiscoveryClient;
use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::transport::Connector;

/// Builds a cache client from node addresses.
pub trait CacheClientFactory {
    type Client;

    /// Build a client addressing `addresses` (`ip:port`, discovery order).
    fn build(&self, addresses: Vec<String>) -> Self::Client;
}

impl<F, T> CacheClientFactory for F
where
    F: Fn(Vec<String>) -> T,
{
    type Client = T;

    fn build(&self, addresses: Vec<String>) -> T {
        self(addresses)
    }
}

impl<C: Connector> ClusterDiscoveryClient<C> {
    /// Discover the cluster behind `endpoint` and build a cache client for it.
    ///
    /// On failure no client is built. Callers wanting a degraded client can
    /// fall back to `factory.build(Vec::new())` or a static node list.
    pub fn build_client<F>(&self, endpoint: &str, factory: &F) -> Result<F::Client>
    where
        F: CacheClientFactory,
    {
        self.discover(endpoint)
            .map(|addresses| factory.build(addresses))
    }
}

/// Discover with the default configuration and build a cache client.
///
/// `dsn` may be `None` or empty to use `ELASTICACHE_ENDPOINT`.
pub fn new_client<F>(dsn: Option<&str>, factory: &F) -> Result<F::Client>
where
    F: CacheClientFactory,
{
    ClusterDiscoveryClient::new(DiscoveryConfig::default())?
        .build_client(dsn.unwrap_or_default(), factory)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticPool {
        nodes: Vec<String>,
    }

    struct PoolFactory;

    impl CacheClientFactory for PoolFactory {
        type Client = StaticPool;

        fn build(&self, addresses: Vec<String>) -> StaticPool {
            StaticPool { nodes: addresses }
        }
    }

    #[test]
    fn test_factory_trait() {
        let pool = PoolFactory.build(vec!["10.0.0.1:11211".into()]);
        assert_eq!(pool.nodes, vec!["10.0.0.1:11211"]);
    }

    #[test]
    fn test_closure_factory() {
        let factory = |nodes: Vec<String>| nodes.len();
        assert_eq!(factory.build(vec!["a:1".into(), "b:2".into()]), 2);
    }
}
