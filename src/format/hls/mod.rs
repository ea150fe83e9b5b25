//! # Low-Latency HLS Packaging
//!
//! Turns a demuxed MPEG-TS program into an LL-HLS media playlist plus
//! fetchable segment and partial-segment payloads:
//!
//! - Segment and partial-segment state with seal notifications
//! - Sliding window of recent segments with monotonic sequence numbers
//! - Media playlist rendering with `EXT-X-PART` and preload hints
//! - The [`Segmenter`] ingestion state machine
//! - The thread-safe [`Packager`] facade with blocking-reload waits
//!
//! ## Example: Waiting for a Partial Segment
//!
//! ```rust,no_run
//! use tshls::config::PackagerConfig;
//! use tshls::format::hls::Packager;
//!
//! # async fn serve(ts_chunk: &[u8]) -> tshls::Result<()> {
//! let packager = Packager::new(PackagerConfig::new());
//! packager.push(ts_chunk)?;
//!
//! // Block a playlist delivery until msn 4 part 1 is sealed or evicted.
//! if packager.wait_until_sealed(4, Some(1)).await {
//!     let body = packager.part_bytes(4, 1);
//!     let _ = body;
//! }
//! # Ok(())
//! # }
//! ```

/// Thread-safe packager facade
pub mod packager;

/// Media playlist rendering
pub mod playlist;

/// Segments, partial segments and the sliding window
pub mod segment;

/// The TS-to-HLS ingestion state machine
pub mod segmenter;

pub use packager::Packager;
pub use playlist::render_playlist;
pub use segment::{MediaChunk, MediaSegment, PartialSegment, SealListener, SlidingWindow};
pub use segmenter::{Readiness, Segmenter};
