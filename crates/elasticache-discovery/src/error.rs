// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery error types.

use std::io;

/// Coarse classification of a [`DiscoveryError`].
///
/// Callers use this to pick an upstream policy (retry discovery, fall back to
/// a static node list, abort startup) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No endpoint could be resolved or the configuration is invalid.
    Configuration,
    /// Dial, write or read failure on the configuration endpoint.
    Transport,
    /// The reply violated the framing rules.
    Protocol,
    /// The node list could not be decoded.
    Decode,
}

/// Phase of the exchange in which a transport error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    Connect,
    Write,
    Read,
}

impl std::fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Write => write!(f, "write"),
            Self::Read => write!(f, "read"),
        }
    }
}

/// Discovery error types.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Endpoint not set, or configuration rejected by validation.
    Configuration(String),

    /// I/O failure talking to the configuration endpoint.
    Transport {
        endpoint: String,
        phase: TransportPhase,
        source: io::Error,
    },

    /// Reply framing violated (missing `END`, bound exceeded, bad UTF-8).
    Protocol(String),

    /// Malformed node token in the payload line.
    Decode { token: String, reason: String },
}

impl DiscoveryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    pub(crate) fn transport(endpoint: &str, phase: TransportPhase, source: io::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            phase,
            source,
        }
    }

    pub(crate) fn decode(token: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(s) => write!(f, "Configuration error: {}", s),
            Self::Transport {
                endpoint,
                phase,
                source,
            } => write!(f, "Transport error ({} {}): {}", phase, endpoint, source),
            Self::Protocol(s) => write!(f, "Protocol error: {}", s),
            Self::Decode { token, reason } => {
                write!(f, "Decode error in token '{}': {}", token, reason)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
