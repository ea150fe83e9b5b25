//! Codec-level bitstream analysis.
//!
//! The packager only needs enough codec awareness to find access-unit
//! boundaries it can cut on, so this module is limited to H.264 byte-stream
//! (Annex-B) NAL unit inspection.

/// H.264/AVC NAL unit types and Annex-B scanning
pub mod h264;
