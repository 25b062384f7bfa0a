// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration endpoint resolution.
//!
//! # Environment Variables
//!
//! - `ELASTICACHE_ENDPOINT`: configuration endpoint (`host:port`), used when
//!   the caller passes no explicit endpoint.

use crate::error::{DiscoveryError, Result};

/// Default environment variable holding the configuration endpoint.
pub const DEFAULT_ENDPOINT_ENV: &str = "ELASTICACHE_ENDPOINT";

/// Resolves the configuration endpoint from an explicit value or the environment.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    env_var: String,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT_ENV)
    }
}

impl EndpointResolver {
    /// Create a resolver falling back to the given environment variable.
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    /// Name of the fallback environment variable.
    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Resolve against the process environment.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<String> {
        self.resolve_with(explicit, |name| std::env::var(name).ok())
    }

    /// Resolve with a custom environment lookup.
    ///
    /// A non-empty `explicit` value is returned unchanged. Otherwise the
    /// fallback variable is looked up; empty values count as unset.
    pub fn resolve_with<F>(&self, explicit: Option<&str>, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if let Some(endpoint) = explicit.filter(|e| !e.is_empty()) {
            return Ok(endpoint.to_string());
        }

        match lookup(&self.env_var) {
            Some(endpoint) if !endpoint.is_empty() => Ok(endpoint),
            _ => Err(DiscoveryError::Configuration(format!(
                "endpoint not set (pass one explicitly or set {})",
                self.env_var
            ))),
        }
    }
}

/// Resolve the endpoint using `ELASTICACHE_ENDPOINT` as the fallback.
pub fn resolve_endpoint(explicit: Option<&str>) -> Result<String> {
    EndpointResolver::default().resolve(explicit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_explicit_endpoint_wins() {
        let resolver = EndpointResolver::default();
        let endpoint = resolver
            .resolve_with(Some("cfg.example:11211"), |_| Some("env:1".into()))
            .unwrap();
        assert_eq!(endpoint, "cfg.example:11211");
    }

    #[test]
    fn test_env_fallback() {
        let resolver = EndpointResolver::new("MY_ENDPOINT");
        let endpoint = resolver
            .resolve_with(Some(""), |name| {
                assert_eq!(name, "MY_ENDPOINT");
                Some("env.example:11211".into())
            })
            .unwrap();
        assert_eq!(endpoint, "env.example:11211");
    }

    #[test]
    fn test_both_empty_is_configuration_error() {
        let resolver = EndpointResolver::default();

        let err = resolver.resolve_with(None, |_| None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("ELASTICACHE_ENDPOINT"));

        let err = resolver
            .resolve_with(Some(""), |_| Some(String::new()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_unset_process_variable() {
        let resolver = EndpointResolver::new("ELASTICACHE_DISCOVERY_TEST_SURELY_UNSET");
        assert!(resolver.resolve(None).is_err());
    }
}
