use super::segmenter::{Readiness, Segmenter};
use crate::config::PackagerConfig;
use crate::error::Result;
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Thread-safe facade over the [`Segmenter`].
///
/// Ingestion and delivery usually live on different tasks: one task feeds
/// TS chunks from the network while request handlers render playlists and
/// serve segment payloads. `Packager` wraps the segmenter in an
/// `Arc<RwLock<..>>` so it can be cloned into each of them.
///
/// [`wait_until_sealed`](Packager::wait_until_sealed) implements the
/// LL-HLS blocking-reload contract: it resolves once the requested
/// segment or partial seals, immediately if it already has, and with
/// `false` if the window slides past it first.
#[derive(Clone)]
pub struct Packager {
    inner: Arc<RwLock<Segmenter>>,
}

impl Packager {
    pub fn new(config: PackagerConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Segmenter::new(config))),
        }
    }

    /// Feeds a chunk of the transport stream, of any size and alignment.
    pub fn push(&self, chunk: &[u8]) -> Result<()> {
        self.inner.write().push(chunk)
    }

    pub fn readiness(&self) -> Readiness {
        self.inner.read().readiness()
    }

    /// Renders the current media playlist.
    pub fn playlist(&self) -> String {
        self.inner.read().playlist()
    }

    /// Whether `msn` is still inside the sliding window.
    pub fn in_range(&self, msn: u64) -> bool {
        self.inner.read().in_range(msn)
    }

    /// Concatenated TS payload of a sealed segment, empty if the segment
    /// is unknown or still open.
    pub fn segment_bytes(&self, msn: u64) -> Bytes {
        self.inner.read().segment_bytes(msn)
    }

    /// TS payload of a sealed partial segment, empty if unknown or open.
    pub fn part_bytes(&self, msn: u64, part: usize) -> Bytes {
        self.inner.read().part_bytes(msn, part)
    }

    /// Resolves once the segment (or, with `part`, the partial segment)
    /// is sealed.
    ///
    /// Returns `true` when the content sealed and can be fetched, `false`
    /// when it never will be: the part index does not exist in an
    /// in-range segment, or the window evicted the segment before it
    /// sealed. An out-of-range msn resolves `true` immediately so
    /// stale-but-valid playlist references do not hang.
    pub async fn wait_until_sealed(&self, msn: u64, part: Option<usize>) -> bool {
        let rx = {
            let mut segmenter = self.inner.write();
            if segmenter.fulfilled(msn, part) {
                return true;
            }
            let (tx, rx) = oneshot::channel();
            let registered = segmenter.register(
                msn,
                part,
                Box::new(move || {
                    // The waiter may have gone away; nothing to do then.
                    let _ = tx.send(());
                }),
            );
            if !registered {
                return false;
            }
            rx
        };

        // The lock is released here; a dropped sender (listener discarded
        // on eviction) resolves the wait with false.
        rx.await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packager() -> Packager {
        Packager::new(PackagerConfig::new())
    }

    #[tokio::test]
    async fn test_wait_on_out_of_range_msn_resolves_immediately() {
        let packager = packager();
        // Nothing ingested, msn 0 is below the (empty) window.
        assert!(packager.wait_until_sealed(0, None).await);
    }

    #[tokio::test]
    async fn test_wait_on_out_of_range_part_resolves_immediately() {
        let packager = packager();
        assert!(packager.wait_until_sealed(7, Some(3)).await);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let a = packager();
        let b = a.clone();
        assert_eq!(a.playlist(), b.playlist());
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[tokio::test]
    async fn test_fetch_before_live_is_empty() {
        let packager = packager();
        assert!(packager.segment_bytes(0).is_empty());
        assert!(packager.part_bytes(0, 0).is_empty());
    }
}
