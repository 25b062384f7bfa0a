// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Diagnostic events emitted during discovery.
//!
//! Events are advisory. Observers return nothing, so a misbehaving sink can
//! never change the outcome of a discovery call.

use crate::error::DiscoveryError;
use crate::protocol::NodeRecord;

/// Log target used by [`LogObserver`].
pub const LOG_TARGET: &str = "elasticache::discovery";

/// Diagnostic event.
#[derive(Debug)]
pub enum DiscoveryEvent<'a> {
    /// Endpoint chosen for this call.
    EndpointResolved { endpoint: &'a str },

    /// Connection to the configuration endpoint established.
    Connected { endpoint: &'a str },

    /// Raw node-list line captured from the reply.
    PayloadReceived { payload: &'a str },

    /// Reply ended before the payload line; `lines` counts lines before `END`.
    MissingPayload { lines: usize },

    /// One node decoded.
    NodeDiscovered { node: &'a NodeRecord },

    /// Discovery finished.
    Discovered {
        endpoint: &'a str,
        version: Option<u64>,
        nodes: usize,
    },

    /// Discovery failed.
    Failed {
        endpoint: &'a str,
        error: &'a DiscoveryError,
    },
}

/// Sink for [`DiscoveryEvent`]s.
pub trait DiscoveryObserver: Send + Sync {
    fn on_event(&self, event: &DiscoveryEvent<'_>);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl DiscoveryObserver for LogObserver {
    fn on_event(&self, event: &DiscoveryEvent<'_>) {
        match event {
            DiscoveryEvent::EndpointResolved { endpoint } => {
                log::debug!(target: LOG_TARGET, "[Discovery] Endpoint: {}", endpoint);
            }
            DiscoveryEvent::Connected { endpoint } => {
                log::debug!(target: LOG_TARGET, "[Discovery] Connected to {}", endpoint);
            }
            DiscoveryEvent::PayloadReceived { payload } => {
                log::info!(target: LOG_TARGET, "[Discovery] Nodes found: {}", payload);
            }
            DiscoveryEvent::MissingPayload { lines } => {
                log::warn!(
                    target: LOG_TARGET,
                    "[Discovery] No node list in reply ({} lines before END); returning no nodes",
                    lines
                );
            }
            DiscoveryEvent::NodeDiscovered { node } => {
                log::debug!(
                    target: LOG_TARGET,
                    "[Discovery] Host: {}, IP: {}, Port: {}, Address: {}",
                    node.host(),
                    node.ip(),
                    node.port(),
                    node.address()
                );
            }
            DiscoveryEvent::Discovered {
                endpoint,
                version,
                nodes,
            } => {
                log::info!(
                    target: LOG_TARGET,
                    "[Discovery] {} -> {} nodes (config version {:?})",
                    endpoint,
                    nodes,
                    version
                );
            }
            DiscoveryEvent::Failed { endpoint, error } => {
                log::error!(target: LOG_TARGET, "[Discovery] {} failed: {}", endpoint, error);
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DiscoveryObserver for NoopObserver {
    fn on_event(&self, _event: &DiscoveryEvent<'_>) {}
}

impl<F> DiscoveryObserver for F
where
    F: Fn(&DiscoveryEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &DiscoveryEvent<'_>) {
        self(event)
    }
}
