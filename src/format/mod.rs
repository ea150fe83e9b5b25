//! # Container Format Support
//!
//! Container-level plumbing for the packager:
//!
//! - [`ts`]: MPEG transport stream framing, PSI sections and PES payloads
//! - [`hls`]: LL-HLS segmentation, playlists and the packager facade

/// Low-Latency HLS packaging
pub mod hls;

/// MPEG transport stream handling
pub mod ts;
