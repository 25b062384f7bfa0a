// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cluster discovery client.
//!
//! One call performs one blocking exchange with the configuration endpoint:
//! connect, send `config get cluster`, read until `END`, close, decode.
//! Nothing is retried and nothing is cached between calls.

use crate::config::DiscoveryConfig;
use crate::endpoint::EndpointResolver;
use crate::error::{DiscoveryError, Result, TransportPhase};
use crate::observer::{DiscoveryEvent, DiscoveryObserver, LogObserver};
use crate::protocol::{
    read_line, ClusterConfig, FrameScanner, LineError, ReplyFrame, CONFIG_GET_CLUSTER,
};
use crate::transport::{
    deadline_error, Connection, ConnectionGuard, Connector, Deadline, TcpConnector,
};
use std::io::{self, BufReader, Read, Write};
use std::sync::Arc;
use std::time::Duration;

/// Discovery client for ElastiCache configuration endpoints.
///
/// Holds only immutable configuration, so one client can serve concurrent
/// callers; each call owns its connection exclusively.
pub struct ClusterDiscoveryClient<C: Connector = TcpConnector> {
    config: DiscoveryConfig,
    connector: C,
    resolver: EndpointResolver,
    observer: Arc<dyn DiscoveryObserver>,
}

impl ClusterDiscoveryClient<TcpConnector> {
    /// Create a TCP client with the given configuration.
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        Self::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> ClusterDiscoveryClient<C> {
    /// Create a client over a custom transport.
    pub fn with_connector(config: DiscoveryConfig, connector: C) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            resolver: EndpointResolver::new(config.endpoint_env_var.clone()),
            config,
            connector,
            observer: Arc::new(LogObserver),
        })
    }

    /// Builder: replace the diagnostic observer.
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: DiscoveryObserver + 'static,
    {
        self.observer = Arc::new(observer);
        self
    }

    /// Builder: share an existing observer.
    pub fn with_shared_observer(mut self, observer: Arc<dyn DiscoveryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Resolve `endpoint`, falling back to the configured environment variable.
    pub fn resolve_endpoint(&self, endpoint: &str) -> Result<String> {
        self.resolver.resolve(Some(endpoint))
    }

    /// Discover the cluster and return node addresses (`ip:port`) in reply order.
    ///
    /// An empty `endpoint` falls back to the environment variable.
    pub fn discover(&self, endpoint: &str) -> Result<Vec<String>> {
        self.discover_cluster(endpoint).map(|cluster| cluster.addresses())
    }

    /// Discover the cluster and return the decoded node records.
    pub fn discover_cluster(&self, endpoint: &str) -> Result<ClusterConfig> {
        let resolved = match self.resolve_endpoint(endpoint) {
            Ok(resolved) => resolved,
            Err(error) => {
                self.observer.on_event(&DiscoveryEvent::Failed {
                    endpoint,
                    error: &error,
                });
                return Err(error);
            }
        };
        self.observer.on_event(&DiscoveryEvent::EndpointResolved {
            endpoint: &resolved,
        });

        match self.fetch(&resolved) {
            Ok(cluster) => {
                self.observer.on_event(&DiscoveryEvent::Discovered {
                    endpoint: &resolved,
                    version: cluster.version,
                    nodes: cluster.len(),
                });
                Ok(cluster)
            }
            Err(error) => {
                self.observer.on_event(&DiscoveryEvent::Failed {
                    endpoint: &resolved,
                    error: &error,
                });
                Err(error)
            }
        }
    }

    fn fetch(&self, endpoint: &str) -> Result<ClusterConfig> {
        let deadline = Deadline::after(self.config.deadline());

        let conn = self
            .connector
            .connect(endpoint, self.config.connect_timeout(), &deadline)
            .map_err(|e| DiscoveryError::transport(endpoint, TransportPhase::Connect, e))?;

        let mut guard = ConnectionGuard::new(conn);
        self.observer.on_event(&DiscoveryEvent::Connected { endpoint });

        let frame = self.exchange(endpoint, guard.get_mut(), &deadline);
        // Reply is drained (or the exchange failed); release before decoding.
        guard.close();
        let frame = frame?;

        match &frame.payload {
            Some(payload) => self
                .observer
                .on_event(&DiscoveryEvent::PayloadReceived { payload }),
            None if self.config.require_payload => {
                return Err(DiscoveryError::Protocol(format!(
                    "reply has no node list: {} lines before END",
                    frame.content_lines()
                )));
            }
            None => self.observer.on_event(&DiscoveryEvent::MissingPayload {
                lines: frame.content_lines(),
            }),
        }

        let cluster = frame.decode()?;
        for node in &cluster.nodes {
            self.observer.on_event(&DiscoveryEvent::NodeDiscovered { node });
        }
        Ok(cluster)
    }

    /// Send the command and frame the reply.
    fn exchange(
        &self,
        endpoint: &str,
        conn: &mut C::Conn,
        deadline: &Deadline,
    ) -> Result<ReplyFrame> {
        let write_timeout = deadline
            .bound(self.config.io_timeout())
            .ok_or_else(|| deadline_exceeded(endpoint, TransportPhase::Write))?;
        conn.set_io_timeout(Some(write_timeout))
            .and_then(|()| conn.write_all(CONFIG_GET_CLUSTER))
            .and_then(|()| conn.flush())
            .map_err(|e| DiscoveryError::transport(endpoint, TransportPhase::Write, e))?;

        let mut reader = BufReader::new(DeadlineReader {
            conn,
            deadline,
            io_timeout: self.config.io_timeout(),
        });
        let mut scanner = FrameScanner::new(self.config.max_reply_lines);
        let mut buf = Vec::new();

        loop {
            let line = match read_line(&mut reader, &mut buf, self.config.max_line_length) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(LineError::Io(e)) => {
                    return Err(DiscoveryError::transport(endpoint, TransportPhase::Read, e))
                }
                Err(e) => return Err(DiscoveryError::Protocol(e.to_string())),
            };

            if scanner.feed(line)? {
                break;
            }
        }

        scanner.finish()
    }
}

/// Re-arms the socket timeout before every read so the deadline holds
/// even inside one long line.
struct DeadlineReader<'a, T: Connection> {
    conn: &'a mut T,
    deadline: &'a Deadline,
    io_timeout: Duration,
}

impl<T: Connection> Read for DeadlineReader<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self
            .deadline
            .bound(self.io_timeout)
            .ok_or_else(deadline_error)?;
        self.conn.set_io_timeout(Some(timeout))?;
        self.conn.read(buf)
    }
}

fn deadline_exceeded(endpoint: &str, phase: TransportPhase) -> DiscoveryError {
    DiscoveryError::transport(endpoint, phase, deadline_error())
}
