//! DSU header codec
//!
//! Inbound validation and outbound framing share one CRC domain: the
//! CRC32 of the whole datagram with the four CRC bytes zeroed. Outbound
//! packets are built header-first with the CRC left at zero, then patched
//! by [`finish_packet`] once the body is in place, the same
//! build-then-finalize pattern the emitter relies on to re-patch a frame
//! per client.

use super::constants::{CRC_RANGE, FULL_HEADER_SIZE, HEADER_SIZE, MAGIC_SERVER, PROTOCOL_VERSION};
use thiserror::Error;

/// Validated fields of an inbound header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Sender-chosen id (the client id for inbound packets)
    pub source_id: u32,
    pub message_type: u32,
}

/// Why an inbound datagram was rejected
///
/// None of these surface as [`crate::Error`]: a UDP port collects stray
/// and mis-addressed traffic, so rejects are dropped with a debug log.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("datagram too short: {0} bytes")]
    TooShort(usize),

    #[error("bad magic")]
    BadMagic,

    #[error("unsupported protocol version {0}")]
    BadVersion(u16),

    #[error("length field {field} does not match payload length {actual}")]
    LengthMismatch { field: u16, actual: usize },

    #[error("CRC mismatch: datagram {datagram:#010x}, computed {computed:#010x}")]
    CrcMismatch { datagram: u32, computed: u32 },
}

/// CRC32 over the datagram with the CRC field zeroed
fn datagram_crc(buf: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&buf[..CRC_RANGE.start]);
    hasher.update(&[0u8; 4]);
    hasher.update(&buf[CRC_RANGE.end..]);
    hasher.finalize()
}

/// Validate an inbound datagram and extract source id and message type
///
/// Checks, in order: the four-byte magic, the protocol version, the
/// length field against the actual payload length, and the CRC32.
pub fn parse_header(magic: &[u8; 4], buf: &[u8]) -> Result<Header, ParseError> {
    if buf.len() < FULL_HEADER_SIZE {
        return Err(ParseError::TooShort(buf.len()));
    }

    if &buf[0..4] != magic {
        return Err(ParseError::BadMagic);
    }

    let version = u16::from_le_bytes([buf[4], buf[5]]);
    if version != PROTOCOL_VERSION {
        return Err(ParseError::BadVersion(version));
    }

    let length = u16::from_le_bytes([buf[6], buf[7]]);
    let actual = buf.len() - HEADER_SIZE;
    if length as usize != actual {
        return Err(ParseError::LengthMismatch {
            field: length,
            actual,
        });
    }

    let datagram = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    let computed = datagram_crc(buf);
    if datagram != computed {
        return Err(ParseError::CrcMismatch { datagram, computed });
    }

    Ok(Header {
        source_id: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        message_type: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
    })
}

/// Write the full outbound header into the front of `buf`
///
/// The length field is derived from `buf.len()`; the CRC field is left at
/// zero for [`finish_packet`] to patch once the body is written.
pub fn begin_packet(buf: &mut [u8], server_id: u32, message_type: u32) {
    debug_assert!(buf.len() >= FULL_HEADER_SIZE);

    buf[0..4].copy_from_slice(MAGIC_SERVER);
    buf[4..6].copy_from_slice(&PROTOCOL_VERSION.to_le_bytes());
    let payload_len = (buf.len() - HEADER_SIZE) as u16;
    buf[6..8].copy_from_slice(&payload_len.to_le_bytes());
    buf[CRC_RANGE].fill(0);
    buf[12..16].copy_from_slice(&server_id.to_le_bytes());
    buf[16..20].copy_from_slice(&message_type.to_le_bytes());
}

/// Compute the CRC32 and patch it into the header
///
/// Safe to call again after the body changed; the previous CRC value does
/// not participate in the computation.
pub fn finish_packet(buf: &mut [u8]) {
    let crc = datagram_crc(buf);
    buf[CRC_RANGE].copy_from_slice(&crc.to_le_bytes());
}
