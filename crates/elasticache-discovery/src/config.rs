// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cluster discovery configuration.

use crate::endpoint::DEFAULT_ENDPOINT_ENV;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for one-shot cluster discovery.
///
/// Durations are stored in milliseconds so the JSON form stays readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Timeout for each connect attempt (ms).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Socket read/write timeout (ms).
    #[serde(default = "default_io_timeout")]
    pub io_timeout_ms: u64,

    /// Overall bound on one discovery call (ms).
    #[serde(default = "default_deadline")]
    pub deadline_ms: u64,

    /// Longest accepted reply line in bytes.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Maximum number of reply lines read before giving up.
    #[serde(default = "default_max_reply_lines")]
    pub max_reply_lines: usize,

    /// Fail with a protocol error when the reply has no payload line.
    #[serde(default)]
    pub require_payload: bool,

    /// Environment variable consulted when no endpoint is given.
    #[serde(default = "default_endpoint_env_var")]
    pub endpoint_env_var: String,
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_io_timeout() -> u64 {
    5_000
}

fn default_deadline() -> u64 {
    10_000
}

fn default_max_line_length() -> usize {
    64 * 1024 // line scanner token limit of the reference client
}

fn default_max_reply_lines() -> usize {
    1024
}

fn default_endpoint_env_var() -> String {
    DEFAULT_ENDPOINT_ENV.to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            io_timeout_ms: default_io_timeout(),
            deadline_ms: default_deadline(),
            max_line_length: default_max_line_length(),
            max_reply_lines: default_max_reply_lines(),
            require_payload: false,
            endpoint_env_var: default_endpoint_env_var(),
        }
    }
}

impl DiscoveryConfig {
    /// Builder: set connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(timeout);
        self
    }

    /// Builder: set socket read/write timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout_ms = duration_ms(timeout);
        self
    }

    /// Builder: set the overall deadline for one discovery call.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = duration_ms(deadline);
        self
    }

    /// Builder: set the longest accepted reply line.
    pub fn with_max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = len;
        self
    }

    /// Builder: set the maximum number of reply lines.
    pub fn with_max_reply_lines(mut self, lines: usize) -> Self {
        self.max_reply_lines = lines;
        self
    }

    /// Builder: reject replies that carry no node-list line.
    pub fn require_payload(mut self) -> Self {
        self.require_payload = true;
        self
    }

    /// Builder: set the endpoint environment variable name.
    pub fn with_endpoint_env_var(mut self, name: impl Into<String>) -> Self {
        self.endpoint_env_var = name.into();
        self
    }

    /// Get connect timeout as Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get I/O timeout as Duration.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Get the overall deadline as Duration.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const POSITIVE: &str = "must be greater than zero";

        let checks = [
            ("connect_timeout_ms", self.connect_timeout_ms == 0, POSITIVE),
            ("io_timeout_ms", self.io_timeout_ms == 0, POSITIVE),
            ("deadline_ms", self.deadline_ms == 0, POSITIVE),
            ("max_line_length", self.max_line_length == 0, POSITIVE),
            ("max_reply_lines", self.max_reply_lines == 0, POSITIVE),
            (
                "endpoint_env_var",
                self.endpoint_env_var.is_empty(),
                "must name an environment variable",
            ),
        ];
        match checks.into_iter().find(|(_, failed, _)| *failed) {
            Some((field, _, reason)) => Err(ConfigError::Invalid { field, reason }),
            None => Ok(()),
        }
    }

    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the configuration as pretty JSON, in the form `from_file` reads.
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut content = serde_json::to_vec_pretty(self).map_err(|e| write_err(e.into()))?;
        content.push(b'\n');
        std::fs::write(path, content).map_err(write_err)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Failure loading, saving or validating a [`DiscoveryConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Read { path: PathBuf, source: io::Error },
    /// Config file is not valid discovery JSON.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Config file could not be written.
    Write { path: PathBuf, source: io::Error },
    /// A field holds an unusable value.
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read config {}: {}", path.display(), source)
            }
            Self::Parse { path, source } => {
                write!(f, "malformed config {}: {}", path.display(), source)
            }
            Self::Write { path, source } => {
                write!(f, "cannot write config {}: {}", path.display(), source)
            }
            Self::Invalid { field, reason } => write!(f, "{} {}", field, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<ConfigError> for crate::DiscoveryError {
    fn from(e: ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}
