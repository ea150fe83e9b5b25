//! # MPEG Transport Stream (TS) Plumbing
//!
//! Low-level MPEG-TS handling for the packager:
//!
//! - Packet framing from an arbitrarily chunked byte stream
//! - PSI section reassembly and re-packetization
//! - PES payload reassembly and timestamp extraction
//! - Core TS header types and constants
//!
//! ## Example: Framing a Byte Stream
//!
//! ```rust
//! use tshls::format::ts::{PacketFramer, TS_PACKET_SIZE};
//!
//! let mut framer = PacketFramer::new();
//! let mut packet = vec![0xFFu8; TS_PACKET_SIZE];
//! packet[0] = 0x47;
//!
//! framer.push(&packet[..100]);
//! assert!(framer.pop().is_none());
//! framer.push(&packet[100..]);
//! assert!(framer.pop().is_some());
//! ```

/// Packet framing from raw byte chunks
pub mod framer;

/// PES packet reassembly and header parsing
pub mod pes;

/// PSI section reassembly and packetization
pub mod section;

/// Core TS types and constants
pub mod types;

pub use framer::PacketFramer;
pub use pes::{elementary_payload, parse_pts, PesAssembler};
pub use section::{packetize_section, SectionAssembler};
pub use types::{
    TsHeader, PID_NIT, PID_PAT, STREAM_TYPE_H264, SYNC_BYTE, TABLE_ID_PAT, TABLE_ID_PMT,
    TS_PACKET_SIZE,
};
