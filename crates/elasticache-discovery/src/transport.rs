// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport seam between the discovery client and the network.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// An open connection to a configuration endpoint.
pub trait Connection: Read + Write {
    /// Set the read and write timeout. `None` blocks indefinitely.
    fn set_io_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Release the connection.
    fn close(&mut self) -> io::Result<()>;
}

/// Overall time budget of one discovery call.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// Deadline `budget` from now. A budget too large to represent never expires.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }

    /// Clamp `timeout` to the time left. `None` once the deadline passed.
    pub fn bound(&self, timeout: Duration) -> Option<Duration> {
        let Some(at) = self.0 else {
            return Some(timeout);
        };
        let remaining = at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            None
        } else {
            Some(timeout.min(remaining))
        }
    }
}

pub(crate) fn deadline_error() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "discovery deadline exceeded")
}

/// Opens connections to configuration endpoints.
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// Connect to `endpoint` (`host:port`).
    ///
    /// Each attempt is bounded by `timeout` and all attempts together by
    /// `deadline`.
    fn connect(
        &self,
        endpoint: &str,
        timeout: Duration,
        deadline: &Deadline,
    ) -> io::Result<Self::Conn>;
}

/// Plain TCP connector.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Conn = TcpStream;

    fn connect(
        &self,
        endpoint: &str,
        timeout: Duration,
        deadline: &Deadline,
    ) -> io::Result<TcpStream> {
        let addrs = endpoint.to_socket_addrs()?;
        connect_each(endpoint, addrs, timeout, deadline, |addr, budget| {
            let stream = TcpStream::connect_timeout(addr, budget)?;
            stream.set_nodelay(true).ok();
            Ok(stream)
        })
    }
}

/// Try `addrs` in order until one connects. Every attempt gets `timeout`
/// clamped to what is left of `deadline`.
fn connect_each<A, T, F>(
    endpoint: &str,
    addrs: impl IntoIterator<Item = A>,
    timeout: Duration,
    deadline: &Deadline,
    mut attempt: F,
) -> io::Result<T>
where
    A: std::fmt::Display,
    F: FnMut(&A, Duration) -> io::Result<T>,
{
    let mut last_err = None;

    for addr in addrs {
        let Some(budget) = deadline.bound(timeout) else {
            log::trace!("[Discovery] connect {}: deadline passed before {}", endpoint, addr);
            return Err(deadline_error());
        };
        match attempt(&addr, budget) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                log::trace!("[Discovery] connect {} ({}) failed: {}", endpoint, addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{} resolved to no addresses", endpoint),
        )
    }))
}

impl Connection for TcpStream {
    fn set_io_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            // Peer already gone.
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Scoped connection: closed exactly once, on drop at the latest.
pub(crate) struct ConnectionGuard<C: Connection> {
    conn: C,
    closed: bool,
}

impl<C: Connection> ConnectionGuard<C> {
    pub(crate) fn new(conn: C) -> Self {
        Self {
            conn,
            closed: false,
        }
    }

    pub(crate) fn get_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Close now. Later calls and the drop are no-ops.
    pub(crate) fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.conn.close() {
            log::debug!("[Discovery] close failed: {}", e);
        }
    }
}

impl<C: Connection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.close();
    }
}
