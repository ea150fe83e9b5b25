#![doc(html_root_url = "https://docs.rs/tshls/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # tshls - MPEG-TS to Low-Latency HLS Packager
//!
//! `tshls` ingests a live MPEG-2 Transport Stream byte stream and
//! incrementally produces a Low-Latency HLS presentation: a continuously
//! updated media playlist plus byte-exact segment and partial-segment
//! payloads, ready to serve over HTTP with blocking-reload semantics.
//!
//! ## Features
//!
//! ### Transport Stream Ingestion
//! - Packet framing from arbitrarily chunked input with resynchronization
//! - PAT/PMT section reassembly, CRC validation and program selection
//! - H.264 PES reassembly with PTS extraction and IDR detection
//!
//! ### LL-HLS Output
//! - Segment rotation on IDR frames, partial-segment cuts near the
//!   configured part target
//! - Sliding window with monotonic media sequence numbers
//! - Playlist rendering with `EXT-X-PART`, preload hints and
//!   `EXT-X-PROGRAM-DATE-TIME`
//! - Seal callbacks and an async wait primitive for blocking reloads
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tshls = "0.1.0"
//! ```
//!
//! ### Packaging a Live Stream
//!
//! ```rust,no_run
//! use tshls::config::PackagerConfig;
//! use tshls::format::hls::Packager;
//!
//! #[tokio::main]
//! async fn main() -> tshls::Result<()> {
//!     let packager = Packager::new(
//!         PackagerConfig::new()
//!             .with_window_size(4)
//!             .with_part_target(0.5),
//!     );
//!
//!     // Feed TS chunks as they arrive from the source.
//!     let chunk: Vec<u8> = Vec::new();
//!     packager.push(&chunk)?;
//!
//!     // Serve the playlist and media from request handlers.
//!     let playlist = packager.playlist();
//!     if packager.wait_until_sealed(0, Some(0)).await {
//!         let part = packager.part_bytes(0, 0);
//!         let _ = (playlist, part);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `format`: container-level plumbing
//!   - `ts`: TS packet framing, PSI sections, PES payloads
//!   - `hls`: segments, playlists, the segmenter and packager
//!
//! - `codec`: elementary-stream inspection
//!   - H.264 Annex-B scanning for IDR frames
//!
//! - `config`: packager tuning knobs
//!
//! - `error`: error types and the crate `Result` alias
//!
//! - `utils`: MPEG-2 CRC32 and 33-bit PTS arithmetic

/// Elementary-stream codec helpers
pub mod codec;

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Media format implementations (TS demux, LL-HLS output)
pub mod format;

/// Common utilities and helper functions
pub mod utils;

pub use error::{Result, TsHlsError};

// Re-export the packager facade for convenience
pub use format::hls::Packager;
