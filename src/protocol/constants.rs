//! DSU protocol constants
//!
//! Shared by the codec, the request dispatch and the emitter. The wire
//! format is fixed by existing DSU clients (Cemu, Citra, Dolphin); none of
//! these values can change without breaking them.

/// Magic prefix of client-originated datagrams
pub const MAGIC_CLIENT: &[u8; 4] = b"DSUC";
/// Magic prefix of server-originated datagrams
pub const MAGIC_SERVER: &[u8; 4] = b"DSUS";

/// The single protocol version this implementation speaks
pub const PROTOCOL_VERSION: u16 = 1001;

/// Message type: protocol version exchange
pub const MSG_VERSION: u32 = 0x100000;
/// Message type: slot descriptor query
pub const MSG_PORTS: u32 = 0x100001;
/// Message type: data subscription (inbound) / data frame (outbound)
pub const MSG_DATA: u32 = 0x100002;

/// Slots exposed by one server; fixed by the protocol
pub const SLOTS_PER_SERVER: usize = 4;

/// Common header: magic, version, length, CRC, source id
pub const HEADER_SIZE: usize = 16;
/// Common header plus the message type discriminator
pub const FULL_HEADER_SIZE: usize = 20;

/// Byte range of the CRC32 field inside the header
pub const CRC_RANGE: std::ops::Range<usize> = 8..12;

/// Total size of a VERSION reply
pub const VERSION_PACKET_SIZE: usize = FULL_HEADER_SIZE + 2;
/// Size of the slot descriptor block
pub const SLOT_DESCRIPTOR_SIZE: usize = 11;
/// Total size of a PORTS reply (descriptor plus one zero pad byte)
pub const PORTS_PACKET_SIZE: usize = FULL_HEADER_SIZE + SLOT_DESCRIPTOR_SIZE + 1;
/// Total size of a DATA frame
pub const DATA_PACKET_SIZE: usize = FULL_HEADER_SIZE + 80;

/// Offset of the per-client packet number inside a DATA frame: header,
/// slot descriptor, connected flag
pub const PACKET_NUMBER_OFFSET: usize = FULL_HEADER_SIZE + SLOT_DESCRIPTOR_SIZE + 1;

// The emitter patches the packet number at a fixed offset; keep the
// layout honest if the descriptor ever changes.
const _: () = assert!(PACKET_NUMBER_OFFSET == 32);

/// Body size of a DATA subscription request: flags, slot, MAC
pub const DATA_REQUEST_BODY_SIZE: usize = 8;

/// Upper bound applied to the sender-controlled PORTS slot count
pub const MAX_PORTS_PER_REQUEST: usize = 5;

/// Slot descriptor state byte for an occupied slot
pub const SLOT_STATE_CONNECTED: u8 = 2;

/// Receive buffer size; larger datagrams are truncated by the kernel
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Subscriptions not renewed for this long are expired
pub const REQUEST_TIMEOUT_US: u64 = 5_000_000;

/// How often the expiry sweep runs
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);
