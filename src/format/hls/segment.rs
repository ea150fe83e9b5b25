use crate::utils::pts::pts_delta_seconds;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Callback fired exactly once when a partial or segment seals.
pub type SealListener = Box<dyn FnOnce() + Send + Sync>;

/// Shared capability of segments and partial segments: both can be asked
/// whether they are finished, how long they run, and for their media bytes.
///
/// Implemented independently by [`PartialSegment`] and [`MediaSegment`];
/// the segment derives its view from its partial sequence rather than
/// being a partial itself.
pub trait MediaChunk {
    /// Whether the chunk has been sealed (no further bytes will arrive).
    fn is_sealed(&self) -> bool;

    /// Duration in seconds, available once sealed.
    fn duration(&self) -> Option<f64>;

    /// The sealed media payload; empty until sealed.
    fn bytes(&self) -> Bytes;
}

/// The smallest addressable media unit of the LL-HLS presentation.
///
/// A partial is open while bytes accumulate and sealed exactly once, at
/// which point the pending bytes freeze into the final buffer and every
/// registered listener fires in registration order.
pub struct PartialSegment {
    begin_pts: u64,
    end_pts: Option<u64>,
    independent: bool,
    sealed: Option<Bytes>,
    pending: BytesMut,
    listeners: Vec<SealListener>,
}

impl PartialSegment {
    pub fn new(begin_pts: u64, independent: bool) -> Self {
        Self {
            begin_pts,
            end_pts: None,
            independent,
            sealed: None,
            pending: BytesMut::new(),
            listeners: Vec::new(),
        }
    }

    /// Begin PTS on the 33-bit 90 kHz clock.
    pub fn begin_pts(&self) -> u64 {
        self.begin_pts
    }

    /// Whether this partial starts with an independently decodable frame.
    pub fn independent(&self) -> bool {
        self.independent
    }

    /// Appends media bytes. Only an open partial accepts input; appends
    /// after sealing are discarded.
    pub fn append(&mut self, data: &[u8]) {
        if self.sealed.is_some() {
            log::warn!("append to sealed partial ignored ({} bytes)", data.len());
            return;
        }
        self.pending.extend_from_slice(data);
    }

    /// One-time transition from open to sealed: freezes the pending bytes
    /// and fires every listener once, in registration order.
    pub fn seal(&mut self, end_pts: u64) {
        if self.sealed.is_some() {
            return;
        }
        self.end_pts = Some(end_pts);
        self.sealed = Some(self.pending.split().freeze());
        for listener in self.listeners.drain(..) {
            listener();
        }
    }

    /// Registers a seal listener. A listener attached to an already sealed
    /// partial fires immediately, preserving the fire-exactly-once contract.
    pub fn on_sealed(&mut self, listener: SealListener) {
        if self.sealed.is_some() {
            listener();
        } else {
            self.listeners.push(listener);
        }
    }
}

impl MediaChunk for PartialSegment {
    fn is_sealed(&self) -> bool {
        self.sealed.is_some()
    }

    fn duration(&self) -> Option<f64> {
        self.end_pts
            .map(|end| pts_delta_seconds(self.begin_pts, end))
    }

    fn bytes(&self) -> Bytes {
        self.sealed.clone().unwrap_or_else(Bytes::new)
    }
}

/// An ordered, non-empty run of partials sharing a lifecycle, stamped with
/// its creation wall-clock time for `EXT-X-PROGRAM-DATE-TIME`.
pub struct MediaSegment {
    partials: Vec<PartialSegment>,
    created_at: DateTime<Utc>,
    listeners: Vec<SealListener>,
    sealed: bool,
}

impl MediaSegment {
    /// Creates a segment with one open partial starting at `begin_pts`.
    pub fn new(begin_pts: u64, independent: bool) -> Self {
        Self {
            partials: vec![PartialSegment::new(begin_pts, independent)],
            created_at: Utc::now(),
            listeners: Vec::new(),
            sealed: false,
        }
    }

    pub fn begin_pts(&self) -> u64 {
        self.partials[0].begin_pts()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn partials(&self) -> &[PartialSegment] {
        &self.partials
    }

    pub fn partial_mut(&mut self, index: usize) -> Option<&mut PartialSegment> {
        self.partials.get_mut(index)
    }

    /// Appends bytes to the segment, which lands them in the current (last)
    /// partial.
    pub fn append(&mut self, data: &[u8]) {
        if self.sealed {
            log::warn!("append to sealed segment ignored ({} bytes)", data.len());
            return;
        }
        if let Some(open) = self.partials.last_mut() {
            open.append(data);
        }
    }

    /// The low-latency part cut: seals the open partial at `pts` and opens
    /// a fresh one at the same timestamp within this segment.
    pub fn cut_partial(&mut self, pts: u64) {
        if self.sealed {
            return;
        }
        if let Some(open) = self.partials.last_mut() {
            open.seal(pts);
        }
        self.partials.push(PartialSegment::new(pts, false));
    }

    /// Seals the whole segment: the still-open last partial seals with the
    /// same end PTS, then segment-level listeners fire in order.
    pub fn seal(&mut self, end_pts: u64) {
        if self.sealed {
            return;
        }
        if let Some(open) = self.partials.last_mut() {
            open.seal(end_pts);
        }
        self.sealed = true;
        for listener in self.listeners.drain(..) {
            listener();
        }
    }

    /// Registers a segment-level seal listener; fires immediately when the
    /// segment is already sealed.
    pub fn on_sealed(&mut self, listener: SealListener) {
        if self.sealed {
            listener();
        } else {
            self.listeners.push(listener);
        }
    }

    /// Sum of the sealed partials' durations, the value rendered on the
    /// segment's `EXTINF` line.
    pub fn extinf_duration(&self) -> f64 {
        self.partials
            .iter()
            .filter_map(|p| p.duration())
            .sum()
    }
}

impl MediaChunk for MediaSegment {
    fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn duration(&self) -> Option<f64> {
        if !self.sealed {
            return None;
        }
        Some(self.extinf_duration())
    }

    fn bytes(&self) -> Bytes {
        if !self.sealed {
            return Bytes::new();
        }
        let total: usize = self.partials.iter().map(|p| p.bytes().len()).sum();
        let mut out = BytesMut::with_capacity(total);
        for partial in &self.partials {
            out.extend_from_slice(&partial.bytes());
        }
        out.freeze()
    }
}

/// Bounded sliding window of segments with stable media sequence numbers.
///
/// MSNs increase monotonically and are never reused; evicting the oldest
/// segment advances the begin MSN, which permanently retires that number.
pub struct SlidingWindow {
    segments: VecDeque<MediaSegment>,
    begin_msn: u64,
    end_msn: u64,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            segments: VecDeque::new(),
            begin_msn: 0,
            end_msn: 0,
            capacity,
        }
    }

    /// First MSN still inside the window.
    pub fn begin_msn(&self) -> u64 {
        self.begin_msn
    }

    /// One past the newest MSN.
    pub fn end_msn(&self) -> u64 {
        self.end_msn
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `msn` addresses a segment currently in the window.
    pub fn in_range(&self, msn: u64) -> bool {
        self.begin_msn <= msn && msn < self.end_msn
    }

    pub fn segment(&self, msn: u64) -> Option<&MediaSegment> {
        if !self.in_range(msn) {
            return None;
        }
        self.segments.get((msn - self.begin_msn) as usize)
    }

    pub fn segment_mut(&mut self, msn: u64) -> Option<&mut MediaSegment> {
        if !self.in_range(msn) {
            return None;
        }
        self.segments.get_mut((msn - self.begin_msn) as usize)
    }

    /// The newest (open) segment.
    pub fn current_mut(&mut self) -> Option<&mut MediaSegment> {
        self.segments.back_mut()
    }

    /// Appends a new segment, evicting the oldest when the cap is exceeded.
    /// Evicted segments drop their buffers and any unfired listeners.
    pub fn push(&mut self, segment: MediaSegment) {
        self.segments.push_back(segment);
        self.end_msn += 1;
        if self.segments.len() > self.capacity {
            self.segments.pop_front();
            self.begin_msn += 1;
            log::debug!("window: evicted msn {}", self.begin_msn - 1);
        }
    }

    /// Iterates `(msn, segment)` oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &MediaSegment)> {
        let begin = self.begin_msn;
        self.segments
            .iter()
            .enumerate()
            .map(move |(i, s)| (begin + i as u64, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_partial_buffer_empty_until_sealed() {
        let mut partial = PartialSegment::new(0, true);
        partial.append(b"hello ");
        partial.append(b"world");
        assert!(partial.bytes().is_empty());

        partial.seal(90_000);
        assert_eq!(&partial.bytes()[..], b"hello world");
        assert!(partial.is_sealed());
    }

    #[test]
    fn test_partial_duration_wraparound() {
        let mut partial = PartialSegment::new((1u64 << 33) - 10, true);
        partial.seal(5);
        let expected = 15.0 / 90_000.0;
        assert!((partial.duration().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_partial_seal_is_one_time() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut partial = PartialSegment::new(0, false);
        let counter = fired.clone();
        partial.on_sealed(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        partial.seal(100);
        partial.seal(200); // second seal must be a no-op
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(partial.duration().unwrap(), 100.0 / 90_000.0);
    }

    #[test]
    fn test_partial_listener_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut partial = PartialSegment::new(0, false);
        for tag in 0..3 {
            let order = order.clone();
            partial.on_sealed(Box::new(move || order.lock().push(tag)));
        }
        partial.seal(1);
        assert_eq!(&*order.lock(), &[0, 1, 2]);
    }

    #[test]
    fn test_listener_on_sealed_partial_fires_immediately() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut partial = PartialSegment::new(0, false);
        partial.seal(1);

        let counter = fired.clone();
        partial.on_sealed(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_append_after_seal_ignored() {
        let mut partial = PartialSegment::new(0, false);
        partial.append(b"kept");
        partial.seal(1);
        partial.append(b"dropped");
        assert_eq!(&partial.bytes()[..], b"kept");
    }

    #[test]
    fn test_segment_aggregate_bytes_and_durations() {
        let mut segment = MediaSegment::new(0, true);
        segment.append(b"aaa");
        segment.cut_partial(90_000);
        segment.append(b"bbb");
        segment.seal(180_000);

        assert!(segment.is_sealed());
        assert_eq!(&segment.bytes()[..], b"aaabbb");
        assert_eq!(segment.partials().len(), 2);

        // aggregate equals the sum of the parts
        let sum: f64 = segment
            .partials()
            .iter()
            .map(|p| p.duration().unwrap())
            .sum();
        assert!((segment.extinf_duration() - sum).abs() < 1e-12);
        assert!((segment.extinf_duration() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_seal_cascades_to_open_partial() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut segment = MediaSegment::new(0, true);

        let counter = fired.clone();
        segment
            .partial_mut(0)
            .unwrap()
            .on_sealed(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        let counter = fired.clone();
        segment.on_sealed(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        segment.seal(90_000);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(segment.partials()[0].is_sealed());
    }

    #[test]
    fn test_segment_unsealed_bytes_empty() {
        let mut segment = MediaSegment::new(0, true);
        segment.append(b"data");
        assert!(segment.bytes().is_empty());
        assert!(segment.duration().is_none());
    }

    #[test]
    fn test_window_eviction_and_msn() {
        let mut window = SlidingWindow::new(3);
        for i in 0..7u64 {
            window.push(MediaSegment::new(i * 90_000, true));
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.begin_msn(), 4);
        assert_eq!(window.end_msn(), 7);

        // evicted MSNs never come back in range
        for evicted in 0..4 {
            assert!(!window.in_range(evicted));
            assert!(window.segment(evicted).is_none());
        }
        for live in 4..7 {
            assert!(window.in_range(live));
            assert!(window.segment(live).is_some());
        }
        assert!(!window.in_range(7));
    }

    #[test]
    fn test_window_evicted_listeners_never_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut window = SlidingWindow::new(1);

        let mut segment = MediaSegment::new(0, true);
        let counter = fired.clone();
        segment.on_sealed(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        window.push(segment);

        // pushing another segment evicts the first, unsealed
        window.push(MediaSegment::new(90_000, true));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_window_iter_order() {
        let mut window = SlidingWindow::new(2);
        window.push(MediaSegment::new(100, true));
        window.push(MediaSegment::new(200, true));
        window.push(MediaSegment::new(300, true));

        let msns: Vec<u64> = window.iter().map(|(msn, _)| msn).collect();
        assert_eq!(msns, vec![1, 2]);
        let begins: Vec<u64> = window.iter().map(|(_, s)| s.begin_pts()).collect();
        assert_eq!(begins, vec![200, 300]);
    }
}
