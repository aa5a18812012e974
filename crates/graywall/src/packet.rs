//! Bounds-checked extraction of the fields the filter keys on.
//!
//! Every header access goes through [`header_at`], which checks
//! `offset + len` for overflow and against the buffer length before
//! slicing. Nothing past the supplied frame length is ever read.

use std::net::Ipv4Addr;

use thiserror::Error;

/// Length of an Ethernet II header.
pub const ETH_HDR_LEN: usize = 14;
/// Minimum IPv4 header length (IHL = 5).
pub const IPV4_HDR_LEN: usize = 20;
/// EtherType for IPv4.
pub const ETHER_TYPE_IPV4: u16 = 0x0800;
/// IP protocol number for TCP.
pub const IPPROTO_TCP: u8 = 6;
/// IP protocol number for UDP.
pub const IPPROTO_UDP: u8 = 17;

const ETHER_TYPE_OFFSET: usize = 12;
const IPV4_PROTO_OFFSET: usize = 9;
const IPV4_SRC_OFFSET: usize = 12;

/// Why a frame could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Header offset arithmetic overflowed.
    #[error("header offset overflow")]
    Overflow,
    /// Frame ends before a required header does.
    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to read the header.
        needed: usize,
        /// Bytes actually present.
        available: usize,
    },
    /// IPv4 header has an impossible version or length.
    #[error("invalid IPv4 header (version {version}, ihl {ihl})")]
    BadHeader {
        /// Version nibble found.
        version: u8,
        /// Header length in 32-bit words.
        ihl: u8,
    },
}

/// What the filter needs to know about a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Complete Ethernet + IPv4 header carrying TCP.
    Ipv4Tcp {
        /// Source address from the IPv4 header.
        source: Ipv4Addr,
    },
    /// Well-formed but not IPv4/TCP; passed through untouched.
    Other,
    /// Truncated or unparseable headers.
    Malformed(FrameError),
}

/// Borrow `N` bytes of `frame` starting at `offset`.
#[inline]
fn header_at<const N: usize>(frame: &[u8], offset: usize) -> Result<&[u8; N], FrameError> {
    let end = offset.checked_add(N).ok_or(FrameError::Overflow)?;
    let truncated = FrameError::Truncated {
        needed: end,
        available: frame.len(),
    };

    frame
        .get(offset..end)
        .ok_or(truncated)?
        .try_into()
        .map_err(|_| truncated)
}

/// Classify the headers of a raw link-layer frame.
#[must_use]
pub fn parse_frame(frame: &[u8]) -> Frame {
    match try_parse_frame(frame) {
        Ok(parsed) => parsed,
        Err(err) => Frame::Malformed(err),
    }
}

fn try_parse_frame(frame: &[u8]) -> Result<Frame, FrameError> {
    // Both headers must be present before anything is dispatched on, so a
    // short frame is malformed whatever its EtherType says.
    let eth: &[u8; ETH_HDR_LEN] = header_at(frame, 0)?;
    let ip: &[u8; IPV4_HDR_LEN] = header_at(frame, ETH_HDR_LEN)?;

    let ether_type = u16::from_be_bytes([eth[ETHER_TYPE_OFFSET], eth[ETHER_TYPE_OFFSET + 1]]);
    if ether_type != ETHER_TYPE_IPV4 {
        return Ok(Frame::Other);
    }

    let version = ip[0] >> 4;
    let ihl = ip[0] & 0x0f;
    if version != 4 || ihl < 5 {
        return Err(FrameError::BadHeader { version, ihl });
    }

    if ip[IPV4_PROTO_OFFSET] != IPPROTO_TCP {
        return Ok(Frame::Other);
    }

    let src = &ip[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4];
    Ok(Frame::Ipv4Tcp {
        source: Ipv4Addr::new(src[0], src[1], src[2], src[3]),
    })
}

/// Build a minimal Ethernet + IPv4 frame from `source` carrying `protocol`.
///
/// Used for trace replay and tests; the payload is empty.
#[must_use]
pub fn build_frame(source: Ipv4Addr, protocol: u8) -> Vec<u8> {
    let mut frame = vec![0_u8; ETH_HDR_LEN + IPV4_HDR_LEN];
    frame[ETHER_TYPE_OFFSET..ETH_HDR_LEN].copy_from_slice(&ETHER_TYPE_IPV4.to_be_bytes());

    let ip = &mut frame[ETH_HDR_LEN..];
    ip[0] = 0x45;
    ip[2..4].copy_from_slice(&(IPV4_HDR_LEN as u16).to_be_bytes());
    ip[8] = 64;
    ip[IPV4_PROTO_OFFSET] = protocol;
    ip[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4].copy_from_slice(&source.octets());
    frame
}
