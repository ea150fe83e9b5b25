use super::playlist::render_playlist;
use super::segment::{MediaChunk, MediaSegment, SealListener, SlidingWindow};
use crate::codec::h264::contains_idr;
use crate::config::PackagerConfig;
use crate::error::Result;
use crate::format::ts::{
    elementary_payload, packetize_section, parse_pts, PacketFramer, PesAssembler,
    SectionAssembler, TsHeader, PID_NIT, PID_PAT, STREAM_TYPE_H264,
};
use crate::utils::crc::Crc32Mpeg2;
use crate::utils::pts::pts_delta_seconds;
use bytes::Bytes;

/// Offset of the first program entry in a PAT section, past the 8-byte
/// table header.
const PAT_ENTRIES_OFFSET: usize = 8;

/// Minimum elapsed share of the part target before a part cut is taken, to
/// avoid truncated trailing parts.
const PART_CUT_MIN_RATIO: f64 = 0.85;

/// Demux readiness. Transitions run strictly forward; the enumeration makes
/// illegal orderings unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Readiness {
    AwaitingPat,
    AwaitingPmt,
    AwaitingIdr,
    Live,
}

/// The core packager state machine.
///
/// Owns the sliding window and all demux state: consumes raw MPEG-TS bytes,
/// locates the active program, extracts video timestamps and key-frame
/// markers, decides segment and part boundaries, re-emits program metadata
/// into each new segment, and answers availability queries.
///
/// Ingestion is strictly ordered: one chunk at a time, packets in arrival
/// order, and any sealing (including listener dispatch) completes before
/// the next packet is examined.
pub struct Segmenter {
    config: PackagerConfig,
    readiness: Readiness,
    framer: PacketFramer,
    crc: Crc32Mpeg2,

    pat_assembler: SectionAssembler,
    pmt_assembler: Option<SectionAssembler>,
    video_assembler: Option<PesAssembler>,

    cached_pat: Option<Bytes>,
    cached_pmt: Option<Bytes>,
    pmt_pid: Option<u16>,
    video_pid: Option<u16>,
    pcr_pid: Option<u16>,
    pat_cc: u8,
    pmt_cc: u8,

    /// TS packets of the access unit currently being assembled, in arrival
    /// order. One PES routinely spans several packets.
    au_packets: Vec<Bytes>,

    window: SlidingWindow,
}

impl Segmenter {
    pub fn new(config: PackagerConfig) -> Self {
        let window = SlidingWindow::new(config.window_size);
        Self {
            config,
            readiness: Readiness::AwaitingPat,
            framer: PacketFramer::new(),
            crc: Crc32Mpeg2::new(),
            pat_assembler: SectionAssembler::new(PID_PAT),
            pmt_assembler: None,
            video_assembler: None,
            cached_pat: None,
            cached_pmt: None,
            pmt_pid: None,
            video_pid: None,
            pcr_pid: None,
            pat_cc: 0,
            pmt_cc: 0,
            au_packets: Vec::new(),
            window,
        }
    }

    /// Current readiness state.
    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// The sliding window, for snapshot-style reads.
    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    /// PCR PID bound from the PMT. Parsed for completeness; clock recovery
    /// never drives a segmentation decision.
    pub fn pcr_pid(&self) -> Option<u16> {
        self.pcr_pid
    }

    /// Ingests one chunk of the source byte stream, processing every
    /// complete TS packet it yields in order.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        self.framer.push(chunk);
        while let Some(packet) = self.framer.pop() {
            self.process_packet(packet)?;
        }
        Ok(())
    }

    fn process_packet(&mut self, packet: Bytes) -> Result<()> {
        let header = TsHeader::parse(&packet)?;
        if header.transport_error {
            return Ok(());
        }

        if header.pid == PID_PAT {
            self.pat_assembler.push(&packet)?;
            while let Some(section) = self.pat_assembler.pop() {
                self.handle_pat(section)?;
            }
        } else if self.pmt_pid == Some(header.pid) {
            if let Some(assembler) = self.pmt_assembler.as_mut() {
                assembler.push(&packet)?;
            }
            while let Some(section) = self.pmt_assembler.as_mut().and_then(|a| a.pop()) {
                self.handle_pmt(section)?;
            }
        } else if self.video_pid == Some(header.pid) {
            self.handle_video_packet(&header, packet)?;
        } else if self.readiness == Readiness::Live {
            // PCR-only and unclassified PIDs pass through verbatim.
            if let Some(current) = self.window.current_mut() {
                current.append(&packet);
            }
        }

        Ok(())
    }

    /// Program demux: binds the PMT PID from a checksum-valid PAT.
    fn handle_pat(&mut self, section: Bytes) -> Result<()> {
        if !self.crc.verify_section(&section) {
            log::debug!("pat: dropping section with bad checksum");
            return Ok(());
        }

        let mut bound: Option<u16> = None;
        let entries_end = section.len().saturating_sub(4);
        let mut pos = PAT_ENTRIES_OFFSET;
        while pos + 4 <= entries_end {
            let program_number = ((section[pos] as u16) << 8) | section[pos + 1] as u16;
            let pid = (((section[pos + 2] & 0x1F) as u16) << 8) | section[pos + 3] as u16;
            pos += 4;

            // The network-information entry is not a program.
            if pid == PID_NIT {
                continue;
            }
            match self.config.service_id {
                Some(target) if program_number == target => {
                    bound = Some(pid);
                }
                None if bound.is_none() => {
                    bound = Some(pid);
                }
                _ => {}
            }
        }

        if let Some(pid) = bound {
            if self.pmt_pid != Some(pid) {
                log::info!("pat: binding pmt pid {:#06x}", pid);
                self.pmt_pid = Some(pid);
                self.pmt_assembler = Some(SectionAssembler::new(pid));
            }
        }

        self.cached_pat = Some(section.clone());
        if self.readiness == Readiness::AwaitingPat {
            self.readiness = Readiness::AwaitingPmt;
            log::debug!("readiness: awaiting pmt");
        }

        if self.readiness == Readiness::Live {
            let packets =
                packetize_section(&section, false, false, PID_PAT, 0, self.pat_cc)?;
            self.pat_cc = (self.pat_cc + packets.len() as u8) & 0x0F;
            if let Some(current) = self.window.current_mut() {
                for packet in &packets {
                    current.append(packet);
                }
            }
        }

        Ok(())
    }

    /// Stream-map demux: binds the video and PCR PIDs from a checksum-valid
    /// PMT arriving on the bound PMT PID.
    fn handle_pmt(&mut self, section: Bytes) -> Result<()> {
        if !self.crc.verify_section(&section) {
            log::debug!("pmt: dropping section with bad checksum");
            return Ok(());
        }
        if section.len() < 16 {
            return Ok(());
        }

        let pcr_pid = (((section[8] & 0x1F) as u16) << 8) | section[9] as u16;
        self.pcr_pid = Some(pcr_pid);

        let program_info_length =
            (((section[10] & 0x0F) as usize) << 8) | section[11] as usize;
        let mut pos = 12 + program_info_length;
        let entries_end = section.len().saturating_sub(4);

        while pos + 5 <= entries_end {
            let stream_type = section[pos];
            let pid = (((section[pos + 1] & 0x1F) as u16) << 8) | section[pos + 2] as u16;
            let es_info_length =
                (((section[pos + 3] & 0x0F) as usize) << 8) | section[pos + 4] as usize;
            pos += 5 + es_info_length;

            if stream_type == STREAM_TYPE_H264 {
                if self.video_pid != Some(pid) {
                    log::info!("pmt: binding video pid {:#06x}", pid);
                    self.video_pid = Some(pid);
                    self.video_assembler = Some(PesAssembler::new(pid));
                    self.au_packets.clear();
                }
                break;
            }
        }

        self.cached_pmt = Some(section.clone());
        if self.readiness == Readiness::AwaitingPmt {
            self.readiness = Readiness::AwaitingIdr;
            log::debug!("readiness: awaiting idr");
        }

        if self.readiness == Readiness::Live {
            if let Some(pmt_pid) = self.pmt_pid {
                let packets =
                    packetize_section(&section, false, false, pmt_pid, 0, self.pmt_cc)?;
                self.pmt_cc = (self.pmt_cc + packets.len() as u8) & 0x0F;
                if let Some(current) = self.window.current_mut() {
                    for packet in &packets {
                        current.append(packet);
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_video_packet(&mut self, header: &TsHeader, packet: Bytes) -> Result<()> {
        if self.video_assembler.is_none() {
            return Ok(());
        }

        // An unbounded video PES only completes when the next one starts;
        // flush before feeding the packet that starts it so the finished
        // access unit pairs with the packets buffered for it.
        if header.payload_unit_start {
            if let Some(assembler) = self.video_assembler.as_mut() {
                assembler.flush();
            }
            while let Some(pes) = self.video_assembler.as_mut().and_then(|a| a.pop()) {
                let packets = std::mem::take(&mut self.au_packets);
                self.handle_access_unit(&pes, packets)?;
            }
        }

        self.au_packets.push(packet.clone());
        if let Some(assembler) = &mut self.video_assembler {
            assembler.push(&packet)?;
        }
        while let Some(pes) = self.video_assembler.as_mut().and_then(|a| a.pop()) {
            let packets = std::mem::take(&mut self.au_packets);
            self.handle_access_unit(&pes, packets)?;
        }

        Ok(())
    }

    /// One complete video access unit: timestamp analysis, boundary
    /// decisions, then the buffered packets land in the window.
    fn handle_access_unit(&mut self, pes: &[u8], packets: Vec<Bytes>) -> Result<()> {
        let Some(pts) = parse_pts(pes) else {
            log::debug!("video: access unit without pts, skipping");
            return Ok(());
        };
        let is_idr = elementary_payload(pes).map(contains_idr).unwrap_or(false);

        if is_idr {
            if self.readiness == Readiness::AwaitingIdr {
                self.readiness = Readiness::Live;
                log::info!("readiness: live at pts {}", pts);
            }
            self.start_new_segment(pts)?;
        } else if self.readiness == Readiness::Live {
            self.maybe_cut_partial(pts);
        }

        if self.readiness == Readiness::Live {
            if let Some(current) = self.window.current_mut() {
                for packet in &packets {
                    current.append(packet);
                }
            }
        }

        Ok(())
    }

    /// Part cut on a non-IDR access-unit boundary, only inside the
    /// 85%..100% band of the part target; an irregular frame interval that
    /// jumps past the target in one step skips the cut entirely.
    fn maybe_cut_partial(&mut self, pts: u64) {
        let target = self.config.part_target;
        if let Some(segment) = self.window.current_mut() {
            let open_begin = match segment.partials().last() {
                Some(open) if !open.is_sealed() => open.begin_pts(),
                _ => return,
            };
            let elapsed = pts_delta_seconds(open_begin, pts);
            if elapsed > PART_CUT_MIN_RATIO * target && elapsed <= target {
                log::debug!("part cut at pts {} ({:.3}s elapsed)", pts, elapsed);
                segment.cut_partial(pts);
            }
        }
    }

    /// Rotation at an IDR: seal the window's last segment, open the next
    /// one, evict past the cap, and lead the new segment with re-serialized
    /// PAT and PMT so every segment is independently fetchable.
    fn start_new_segment(&mut self, pts: u64) -> Result<()> {
        let (Some(pat), Some(pmt)) = (self.cached_pat.clone(), self.cached_pmt.clone())
        else {
            log::debug!("rotation skipped: program metadata not yet cached");
            return Ok(());
        };

        if let Some(current) = self.window.current_mut() {
            current.seal(pts);
        }

        log::debug!("new segment msn {} at pts {}", self.window.end_msn(), pts);
        self.window.push(MediaSegment::new(pts, true));

        let pat_packets = packetize_section(&pat, false, false, PID_PAT, 0, self.pat_cc)?;
        self.pat_cc = (self.pat_cc + pat_packets.len() as u8) & 0x0F;

        let pmt_pid = self.pmt_pid.unwrap_or(0);
        let pmt_packets = packetize_section(&pmt, false, false, pmt_pid, 0, self.pmt_cc)?;
        self.pmt_cc = (self.pmt_cc + pmt_packets.len() as u8) & 0x0F;

        if let Some(current) = self.window.current_mut() {
            for packet in pat_packets.iter().chain(pmt_packets.iter()) {
                current.append(packet);
            }
        }

        Ok(())
    }

    // --- consumer-facing query surface -----------------------------------

    /// Renders the playlist for the current window.
    pub fn playlist(&self) -> String {
        render_playlist(&self.window, self.config.part_target)
    }

    /// Whether `msn` addresses a segment currently in the window.
    pub fn in_range(&self, msn: u64) -> bool {
        self.window.in_range(msn)
    }

    /// Whether the addressed segment or partial is complete. Out-of-range
    /// targets are vacuously fulfilled; a partial index that does not exist
    /// yet in an in-range segment is not.
    pub fn fulfilled(&self, msn: u64, part: Option<usize>) -> bool {
        match self.window.segment(msn) {
            None => true,
            Some(segment) => match part {
                None => segment.is_sealed(),
                Some(index) => segment
                    .partials()
                    .get(index)
                    .map(|p| p.is_sealed())
                    .unwrap_or(false),
            },
        }
    }

    /// Bytes of a sealed segment; empty for unsealed or out-of-range
    /// targets, never an error.
    pub fn segment_bytes(&self, msn: u64) -> Bytes {
        self.window
            .segment(msn)
            .map(|s| s.bytes())
            .unwrap_or_else(Bytes::new)
    }

    /// Bytes of a sealed partial; empty for unsealed or out-of-range
    /// targets, never an error.
    pub fn part_bytes(&self, msn: u64, part: usize) -> Bytes {
        self.window
            .segment(msn)
            .and_then(|s| s.partials().get(part))
            .map(|p| p.bytes())
            .unwrap_or_else(Bytes::new)
    }

    /// Attaches a seal listener to a segment (`part` = `None`) or partial.
    /// Returns `false` without registering when the target is out of range
    /// or the partial does not exist — the caller must treat that as
    /// "will never resolve". A listener attached to an already sealed
    /// target fires immediately.
    pub fn register(&mut self, msn: u64, part: Option<usize>, listener: SealListener) -> bool {
        let Some(segment) = self.window.segment_mut(msn) else {
            return false;
        };
        match part {
            None => {
                segment.on_sealed(listener);
                true
            }
            Some(index) => match segment.partial_mut(index) {
                Some(partial) => {
                    partial.on_sealed(listener);
                    true
                }
                None => false,
            },
        }
    }
}
