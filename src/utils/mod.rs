//! # Utility Functions and Types
//!
//! Common utilities shared across the packager:
//!
//! - MPEG-2 CRC32 calculation and PSI section validation
//! - 33-bit presentation timestamp arithmetic
//!
//! ## CRC Calculation
//!
//! ```rust
//! use tshls::utils::Crc32Mpeg2;
//!
//! let crc = Crc32Mpeg2::new();
//! let checksum = crc.calculate(&[0x01, 0x02, 0x03]);
//! ```

/// CRC calculation implementations
pub mod crc;

/// 33-bit PTS arithmetic helpers
pub mod pts;

pub use crc::Crc32Mpeg2;
pub use pts::{pts_delta, pts_delta_seconds};
