//! JSON-lines packet traces for offline replay.
//!
//! Each non-blank line not starting with `#` describes one packet, either
//! by source address (a minimal frame is synthesized):
//!
//! ```text
//! {"at_ns": 0, "src": "10.0.0.1", "protocol": 6}
//! ```
//!
//! or as raw hex-encoded frame bytes:
//!
//! ```text
//! {"at_ns": 500000000, "frame": "ffffffffffff..."}
//! ```

use std::net::Ipv4Addr;
use std::path::Path;

use serde::Deserialize;

use crate::error::{FilterError, FilterResult};
use crate::packet::{IPPROTO_TCP, build_frame};

/// One packet of a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePacket {
    /// 1-based line number in the source.
    pub line: usize,
    /// Arrival timestamp in nanoseconds.
    pub at_ns: u64,
    /// Raw frame bytes.
    pub frame: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TraceLine {
    at_ns: u64,
    #[serde(default)]
    src: Option<Ipv4Addr>,
    #[serde(default)]
    protocol: Option<u8>,
    #[serde(default)]
    frame: Option<String>,
}

/// Parse a whole trace.
///
/// Timestamps must be non-decreasing, as they would be from a monotonic
/// clock.
pub fn parse_trace(content: &str) -> FilterResult<Vec<TracePacket>> {
    let mut packets = Vec::new();
    let mut previous_ns = 0_u64;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let packet = parse_line(line_no, line)?;
        if packet.at_ns < previous_ns {
            return Err(FilterError::Parse(format!(
                "line {line_no}: timestamp {} is earlier than {previous_ns}",
                packet.at_ns
            )));
        }
        previous_ns = packet.at_ns;
        packets.push(packet);
    }

    Ok(packets)
}

/// Read and parse a trace file.
pub fn load_trace(path: impl AsRef<Path>) -> FilterResult<Vec<TracePacket>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| FilterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(&content)
}

fn parse_line(line_no: usize, line: &str) -> FilterResult<TracePacket> {
    let parsed: TraceLine = serde_json::from_str(line)
        .map_err(|e| FilterError::Parse(format!("line {line_no}: {e}")))?;

    let frame = match (parsed.src, parsed.frame) {
        (Some(src), None) => build_frame(src, parsed.protocol.unwrap_or(IPPROTO_TCP)),
        (None, Some(encoded)) => hex::decode(encoded.trim())
            .map_err(|e| FilterError::Parse(format!("line {line_no}: bad frame hex: {e}")))?,
        (Some(_), Some(_)) => {
            return Err(FilterError::Parse(format!(
                "line {line_no}: give either \"src\" or \"frame\", not both"
            )));
        }
        (None, None) => {
            return Err(FilterError::Parse(format!(
                "line {line_no}: missing \"src\" or \"frame\""
            )));
        }
    };

    Ok(TracePacket {
        line: line_no,
        at_ns: parsed.at_ns,
        frame,
    })
}
