// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for the cluster-config reply framer and node decoder
//!
//! Neither may panic on arbitrary endpoint output.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Full reply path with small bounds so the limits get exercised too
    let _ = elasticache_discovery::protocol::decode_reply(data, 256, 16);

    // Payload line on its own
    if let Ok(payload) = std::str::from_utf8(data) {
        if let Ok(nodes) = elasticache_discovery::decode_nodes(payload) {
            for node in &nodes {
                let _ = node.address();
            }
        }
    }
});
