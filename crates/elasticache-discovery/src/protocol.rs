// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ElastiCache cluster-discovery wire protocol (client side).
//!
//! The client sends a single text command and reads a line-oriented reply:
//!
//! ```text
//! client: config get cluster\r\n
//! server: CONFIG cluster 0 <payload-len>\r\n      line 1, metadata
//!         <config-version>\r\n                    line 2, metadata
//!         host|ip|port host|ip|port ...\r\n       line 3, node list
//!         \r\n                                    (optional padding)
//!         END\r\n                                 sentinel
//! ```
//!
//! The payload always sits on line 3. That is a property of the discovery
//! protocol version served by ElastiCache configuration endpoints, not a
//! generic framing rule, so it lives in [`PAYLOAD_LINE`].

use crate::error::{DiscoveryError, Result};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::io::{self, BufRead, Read};
use std::str::FromStr;

/// Discovery command sent to the configuration endpoint.
pub const CONFIG_GET_CLUSTER: &[u8] = b"config get cluster\r\n";

/// Line terminating every reply.
pub const END_MARKER: &str = "END";

/// 1-based line carrying the configuration version.
pub const VERSION_LINE: usize = 2;

/// 1-based line carrying the node list.
pub const PAYLOAD_LINE: usize = 3;

const TOKEN_SEPARATOR: char = ' ';
const FIELD_SEPARATOR: char = '|';

/// One cluster member as reported by the configuration endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRecord {
    host: String,
    ip: String,
    port: u16,
}

impl NodeRecord {
    /// Create a node record.
    pub fn new(host: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            ip: ip.into(),
            port,
        }
    }

    /// Logical hostname of the node.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Resolved IP address of the node.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// TCP port of the node.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address used to reach the node: `ip:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl std::fmt::Display for NodeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}:{})", self.host, self.ip, self.port)
    }
}

/// Serialized with the derived `address` alongside the raw fields.
impl Serialize for NodeRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_struct("NodeRecord", 4)?;
        node.serialize_field("host", &self.host)?;
        node.serialize_field("ip", &self.ip)?;
        node.serialize_field("port", &self.port)?;
        node.serialize_field("address", &self.address())?;
        node.end()
    }
}

impl FromStr for NodeRecord {
    type Err = DiscoveryError;

    /// Parse one `host|ip|port` token.
    fn from_str(token: &str) -> Result<Self> {
        let mut fields = token.split(FIELD_SEPARATOR);
        let (host, ip, port) = match (fields.next(), fields.next(), fields.next(), fields.next())
        {
            (Some(host), Some(ip), Some(port), None) => (host, ip, port),
            _ => {
                return Err(DiscoveryError::decode(
                    token,
                    "expected exactly three '|'-separated fields (host|ip|port)",
                ))
            }
        };

        if ip.is_empty() {
            return Err(DiscoveryError::decode(token, "empty ip field"));
        }

        // u16::from_str accepts a leading '+'; the grammar is digits only.
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DiscoveryError::decode(
                token,
                format!("port '{}' is not a decimal integer", port),
            ));
        }
        let port = port.parse::<u16>().map_err(|e| {
            DiscoveryError::decode(token, format!("port '{}' out of range: {}", port, e))
        })?;

        Ok(Self::new(host, ip, port))
    }
}

/// Decoded reply: node list plus configuration version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterConfig {
    /// Configuration version from line 2, if it parsed as an integer.
    pub version: Option<u64>,
    /// Nodes in the order the endpoint listed them.
    pub nodes: Vec<NodeRecord>,
}

impl ClusterConfig {
    /// Project the node list to `ip:port` strings, preserving order.
    pub fn addresses(&self) -> Vec<String> {
        self.nodes.iter().map(NodeRecord::address).collect()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the endpoint reported no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Decode the node-list payload line.
///
/// All-or-nothing: the first malformed token aborts the decode and nothing
/// decoded before it is returned. Empty tokens are skipped.
pub fn decode_nodes(payload: &str) -> Result<Vec<NodeRecord>> {
    payload
        .split(TOKEN_SEPARATOR)
        .filter(|token| !token.is_empty())
        .map(NodeRecord::from_str)
        .collect()
}

/// Framed reply, before the payload is decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyFrame {
    /// Number of lines read, including the `END` sentinel.
    pub lines: usize,
    /// Raw version line, if the reply had one.
    pub version: Option<String>,
    /// Raw payload line, if the reply had one.
    pub payload: Option<String>,
}

impl ReplyFrame {
    /// Lines before the `END` sentinel.
    pub fn content_lines(&self) -> usize {
        self.lines.saturating_sub(1)
    }

    /// Parsed configuration version. Metadata only, so garbage yields `None`.
    pub fn version(&self) -> Option<u64> {
        self.version.as_deref().and_then(|v| v.trim().parse().ok())
    }

    /// Decode into a [`ClusterConfig`]. A missing payload decodes to no nodes.
    pub fn decode(&self) -> Result<ClusterConfig> {
        let nodes = match &self.payload {
            Some(payload) => decode_nodes(payload)?,
            None => Vec::new(),
        };
        Ok(ClusterConfig {
            version: self.version(),
            nodes,
        })
    }
}

/// Line-by-line reply framer.
///
/// Counts lines from 1, captures the version and payload lines and stops at
/// the `END` sentinel. The sentinel is never captured as payload.
#[derive(Debug)]
pub struct FrameScanner {
    max_reply_lines: usize,
    frame: ReplyFrame,
    terminated: bool,
}

impl FrameScanner {
    /// Create a scanner accepting at most `max_reply_lines` lines.
    pub fn new(max_reply_lines: usize) -> Self {
        Self {
            max_reply_lines,
            frame: ReplyFrame::default(),
            terminated: false,
        }
    }

    /// Feed one raw line (without terminator). Returns `true` once `END` is seen.
    ///
    /// Only the payload line must be UTF-8; every other line is opaque.
    pub fn feed(&mut self, line: &[u8]) -> Result<bool> {
        if self.terminated {
            return Ok(true);
        }
        if self.frame.lines >= self.max_reply_lines {
            return Err(DiscoveryError::Protocol(format!(
                "reply exceeds {} lines without {}",
                self.max_reply_lines, END_MARKER
            )));
        }

        self.frame.lines += 1;
        if line == END_MARKER.as_bytes() {
            self.terminated = true;
            return Ok(true);
        }

        match self.frame.lines {
            // Metadata: an undecodable version is simply absent.
            VERSION_LINE => {
                self.frame.version = std::str::from_utf8(line).ok().map(str::to_string)
            }
            PAYLOAD_LINE => {
                let payload = std::str::from_utf8(line).map_err(|e| {
                    DiscoveryError::Protocol(format!("node list is not valid UTF-8: {}", e))
                })?;
                self.frame.payload = Some(payload.to_string());
            }
            _ => {}
        }
        Ok(false)
    }

    /// Finish framing. Fails if the sentinel never arrived.
    pub fn finish(self) -> Result<ReplyFrame> {
        if !self.terminated {
            return Err(DiscoveryError::Protocol(format!(
                "reply not terminated: no {} line after {} lines",
                END_MARKER, self.frame.lines
            )));
        }
        Ok(self.frame)
    }
}

/// Failure while reading a single reply line.
#[derive(Debug)]
pub enum LineError {
    /// Underlying read failed.
    Io(io::Error),
    /// Line longer than the configured bound.
    TooLong { limit: usize },
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::TooLong { limit } => write!(f, "reply line longer than {} bytes", limit),
        }
    }
}

impl std::error::Error for LineError {}

impl From<io::Error> for LineError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Read one line of at most `max_len` bytes, stripping `\n` or `\r\n`.
///
/// The line is returned as raw bytes borrowed from `buf`. Returns `Ok(None)`
/// at end of stream. A final line without terminator is still returned.
pub fn read_line<'b, R: BufRead>(
    reader: &mut R,
    buf: &'b mut Vec<u8>,
    max_len: usize,
) -> std::result::Result<Option<&'b [u8]>, LineError> {
    buf.clear();
    // Room for the content plus "\r\n".
    let limit = max_len.saturating_add(2) as u64;
    let n = reader.take(limit).read_until(b'\n', buf)?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    if buf.len() > max_len {
        return Err(LineError::TooLong { limit: max_len });
    }
    Ok(Some(buf.as_slice()))
}

/// Frame and decode a complete in-memory reply with the given bounds.
pub fn decode_reply(
    reply: &[u8],
    max_line_length: usize,
    max_reply_lines: usize,
) -> Result<ClusterConfig> {
    let mut reader = io::BufReader::new(reply);
    let mut scanner = FrameScanner::new(max_reply_lines);
    let mut buf = Vec::new();

    loop {
        let line = read_line(&mut reader, &mut buf, max_line_length)
            .map_err(|e| DiscoveryError::Protocol(e.to_string()))?;
        match line {
            Some(line) if scanner.feed(line)? => break,
            Some(_) => {}
            None => break,
        }
    }

    scanner.finish()?.decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const MAX_LINE: usize = 64 * 1024;
    const MAX_LINES: usize = 1024;

    fn addresses(reply: &str) -> Result<Vec<String>> {
        decode_reply(reply.as_bytes(), MAX_LINE, MAX_LINES).map(|c| c.addresses())
    }

    #[test]
    fn test_decode_two_nodes() {
        let nodes = decode_nodes("h1|1.2.3.4|11211 h2|5.6.7.8|11212").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], NodeRecord::new("h1", "1.2.3.4", 11211));
        assert_eq!(nodes[1].address(), "5.6.7.8:11212");
    }

    #[test]
    fn test_decode_non_numeric_port_is_atomic() {
        let err = decode_nodes("h0|9.9.9.9|1 h1|1.2.3.4|abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("h1|1.2.3.4|abc"));
    }

    #[test]
    fn test_decode_rejects_bad_tokens() {
        for token in [
            "h1|1.2.3.4",
            "h1",
            "h1|1.2.3.4|11211|extra",
            "h1||11211",
            "h1|1.2.3.4|",
            "h1|1.2.3.4|+11211",
            "h1|1.2.3.4|-1",
            "h1|1.2.3.4|65536",
        ] {
            let err = decode_nodes(token).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decode, "token {:?}", token);
        }
    }

    #[test]
    fn test_decode_skips_empty_tokens() {
        let nodes = decode_nodes("h1|1.1.1.1|1  h2|2.2.2.2|2 ").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(decode_nodes("").unwrap().is_empty());
    }

    #[test]
    fn test_host_may_be_empty() {
        let node: NodeRecord = "|10.0.0.1|11211".parse().unwrap();
        assert_eq!(node.host(), "");
        assert_eq!(node.address(), "10.0.0.1:11211");
    }

    #[test]
    fn test_node_display() {
        let node = NodeRecord::new("node-a", "10.0.0.1", 11211);
        assert_eq!(node.to_string(), "node-a (10.0.0.1:11211)");
    }

    #[test]
    fn test_reply_with_lf() {
        let result = addresses("meta1\nmeta2\nh1|1.1.1.1|1\nEND\n").unwrap();
        assert_eq!(result, vec!["1.1.1.1:1"]);
    }

    #[test]
    fn test_reply_with_crlf_and_version() {
        let reply = "CONFIG cluster 0 45\r\n1\r\nnode-a|10.0.0.1|11211 node-b|10.0.0.2|11211\r\n\r\nEND\r\n";
        let config = decode_reply(reply.as_bytes(), MAX_LINE, MAX_LINES).unwrap();
        assert_eq!(config.version, Some(1));
        assert_eq!(config.addresses(), vec!["10.0.0.1:11211", "10.0.0.2:11211"]);
    }

    #[test]
    fn test_reply_without_end() {
        let err = addresses("meta1\nmeta2\nh1|1.1.1.1|1\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("not terminated"));

        let err = addresses("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_end_without_trailing_newline() {
        let result = addresses("m\n1\nh|1.1.1.1|1\nEND").unwrap();
        assert_eq!(result, vec!["1.1.1.1:1"]);
    }

    #[test]
    fn test_short_reply_yields_no_nodes() {
        let config = decode_reply(b"CONFIG cluster 0 0\r\n1\r\nEND\r\n", MAX_LINE, MAX_LINES).unwrap();
        assert!(config.is_empty());
        assert_eq!(config.version, Some(1));

        assert!(addresses("END\n").unwrap().is_empty());
    }

    #[test]
    fn test_end_on_payload_line_is_not_payload() {
        let mut scanner = FrameScanner::new(MAX_LINES);
        assert!(!scanner.feed(b"CONFIG cluster 0 0").unwrap());
        assert!(!scanner.feed(b"1").unwrap());
        assert!(scanner.feed(b"END").unwrap());
        let frame = scanner.finish().unwrap();
        assert_eq!(frame.lines, 3);
        assert_eq!(frame.content_lines(), 2);
        assert_eq!(frame.payload, None);
    }

    #[test]
    fn test_lines_after_payload_are_discarded() {
        let result = addresses("m\n1\nh|1.1.1.1|1\nh|9.9.9.9|9\njunk\nEND\ntrailing\n").unwrap();
        assert_eq!(result, vec!["1.1.1.1:1"]);
    }

    #[test]
    fn test_non_numeric_version_is_ignored() {
        let config = decode_reply(b"m\nv?\nh|1.1.1.1|1\nEND\n", MAX_LINE, MAX_LINES).unwrap();
        assert_eq!(config.version, None);
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_line_too_long() {
        let reply = format!("m\n1\n{}\nEND\n", "x".repeat(40));
        let err = decode_reply(reply.as_bytes(), 32, MAX_LINES).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("longer than 32"));
    }

    #[test]
    fn test_line_at_limit_with_crlf() {
        let payload = "h|1.1.1.1|1";
        let reply = format!("m\r\n1\r\n{}\r\nEND\r\n", payload);
        let config = decode_reply(reply.as_bytes(), payload.len(), MAX_LINES).unwrap();
        assert_eq!(config.addresses(), vec!["1.1.1.1:1"]);
    }

    #[test]
    fn test_too_many_lines() {
        let reply = "a\nb\nc\nd\ne\nEND\n";
        let err = decode_reply(reply.as_bytes(), MAX_LINE, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_invalid_utf8_payload() {
        let reply = b"m\n1\n\xff\xfe|1.1.1.1|1\nEND\n";
        let err = decode_reply(reply, MAX_LINE, MAX_LINES).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("node list is not valid UTF-8"));
    }

    #[test]
    fn test_binary_bytes_outside_payload_are_ignored() {
        let metadata = decode_reply(
            b"CONFIG \xff cluster\n1\nh|1.1.1.1|1\nEND\n",
            MAX_LINE,
            MAX_LINES,
        )
        .unwrap();
        assert_eq!(metadata.addresses(), vec!["1.1.1.1:1"]);
        assert_eq!(metadata.version, Some(1));

        let padding =
            decode_reply(b"m\n1\nh|1.1.1.1|1\n\xfe\nEND\n", MAX_LINE, MAX_LINES).unwrap();
        assert_eq!(padding.addresses(), vec!["1.1.1.1:1"]);

        let version =
            decode_reply(b"m\n\xc3\nh|1.1.1.1|1\nEND\n", MAX_LINE, MAX_LINES).unwrap();
        assert_eq!(version.version, None);
        assert_eq!(version.len(), 1);
    }

    #[test]
    fn test_read_line_returns_raw_bytes() {
        let mut reader = io::BufReader::new(&b"a\xff\r\nEND"[..]);
        let mut buf = Vec::new();
        assert_eq!(
            read_line(&mut reader, &mut buf, 16).unwrap(),
            Some(&b"a\xff"[..])
        );
        assert_eq!(read_line(&mut reader, &mut buf, 16).unwrap(), Some(&b"END"[..]));
        assert_eq!(read_line(&mut reader, &mut buf, 16).unwrap(), None);
    }

    #[test]
    fn test_cluster_config_serializes() {
        let config = ClusterConfig {
            version: Some(7),
            nodes: vec![NodeRecord::new("a", "10.0.0.1", 11211)],
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"version":7,"nodes":[{"host":"a","ip":"10.0.0.1","port":11211,"address":"10.0.0.1:11211"}]}"#
        );
    }
}
