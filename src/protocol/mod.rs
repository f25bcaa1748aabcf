//! DSU wire protocol
//!
//! Packet format: `[magic 4] [version u16] [length u16] [crc32 u32]
//! [source id u32] [message type u32] [body]`
//!
//! All integers are little-endian; the MAC travels as six big-endian
//! bytes. The `length` field counts everything after the first 16 bytes,
//! message type included. The CRC32 covers the whole datagram with the
//! CRC field itself zeroed.

pub mod constants;
pub mod header;
pub mod messages;

pub use header::{parse_header, Header, ParseError};

#[cfg(test)]
pub(crate) mod testutil {
    //! Client-side framing, used only to fabricate inbound datagrams

    use super::constants::{FULL_HEADER_SIZE, MAGIC_CLIENT};
    use super::header::{begin_packet, finish_packet};

    pub(crate) fn client_packet(client_id: u32, message_type: u32, body: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; FULL_HEADER_SIZE + body.len()];
        begin_packet(&mut buf, client_id, message_type);
        buf[0..4].copy_from_slice(MAGIC_CLIENT);
        buf[FULL_HEADER_SIZE..].copy_from_slice(body);
        finish_packet(&mut buf);
        buf
    }
}
