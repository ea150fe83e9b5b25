use super::types::{TsHeader, TS_PACKET_SIZE};
use crate::error::Result;
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::VecDeque;

/// Reassembles PSI sections from the TS packets of a single PID.
///
/// Handles the pointer field on payload-unit-start packets and sections
/// spanning multiple packets. CRC validation is the caller's concern; this
/// type only restores section framing.
#[derive(Debug)]
pub struct SectionAssembler {
    pid: u16,
    acc: BytesMut,
    ready: VecDeque<Bytes>,
}

impl SectionAssembler {
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            acc: BytesMut::new(),
            ready: VecDeque::new(),
        }
    }

    /// The PID this assembler is bound to.
    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// Feeds one TS packet. Packets for other PIDs or without payload are
    /// ignored.
    pub fn push(&mut self, packet: &[u8]) -> Result<()> {
        let header = TsHeader::parse(packet)?;
        if header.pid != self.pid || !header.contains_payload {
            return Ok(());
        }

        let offset = header.payload_offset(packet);
        if offset >= packet.len() {
            return Ok(());
        }
        let payload = &packet[offset..];

        if header.payload_unit_start {
            let pointer = payload[0] as usize;
            if 1 + pointer > payload.len() {
                log::warn!("section: pointer field past payload end on pid {:#06x}", self.pid);
                self.acc.clear();
                return Ok(());
            }
            // Bytes before the pointer target finish the previous section.
            if !self.acc.is_empty() {
                self.acc.extend_from_slice(&payload[1..1 + pointer]);
                self.complete_if_ready();
                self.acc.clear();
            }
            self.acc.extend_from_slice(&payload[1 + pointer..]);
        } else {
            if self.acc.is_empty() {
                // Mid-section continuation with no start seen; nothing to join.
                return Ok(());
            }
            self.acc.extend_from_slice(payload);
        }

        self.complete_if_ready();
        Ok(())
    }

    /// Yields the next fully assembled section payload (table header through
    /// CRC), or `None`.
    pub fn pop(&mut self) -> Option<Bytes> {
        self.ready.pop_front()
    }

    fn complete_if_ready(&mut self) {
        if self.acc.len() < 3 {
            return;
        }
        let section_length = (((self.acc[1] & 0x0F) as usize) << 8) | self.acc[2] as usize;
        let total = 3 + section_length;
        if self.acc.len() >= total {
            let section = Bytes::copy_from_slice(&self.acc[..total]);
            self.ready.push_back(section);
            self.acc.clear();
        }
    }
}

/// Re-serializes a PSI section payload into TS packets.
///
/// The first packet carries the payload-unit-start flag and a zero pointer
/// field; remaining bytes spill into continuation packets. All packets are
/// stuffed to 188 bytes with 0xFF. The continuity counter starts at
/// `start_cc` and increments mod 16 per packet; the caller advances its own
/// counter by the number of packets returned.
pub fn packetize_section(
    section: &[u8],
    error_indicator: bool,
    priority: bool,
    pid: u16,
    scrambling_control: u8,
    start_cc: u8,
) -> Result<Vec<Bytes>> {
    let mut packets = Vec::new();
    let mut remaining = section;
    let mut cc = start_cc & 0x0F;
    let mut first = true;

    while first || !remaining.is_empty() {
        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        let header = TsHeader {
            transport_error: error_indicator,
            payload_unit_start: first,
            transport_priority: priority,
            pid,
            scrambling_control,
            continuity_counter: cc,
            ..Default::default()
        };
        header.write_to(&mut buf)?;

        if first {
            buf.put_u8(0); // pointer field
        }

        let room = TS_PACKET_SIZE - buf.len();
        let take = room.min(remaining.len());
        buf.extend_from_slice(&remaining[..take]);
        remaining = &remaining[take..];

        while buf.len() < TS_PACKET_SIZE {
            buf.put_u8(0xFF);
        }

        packets.push(buf.freeze());
        cc = (cc + 1) & 0x0F;
        first = false;
    }

    Ok(packets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::types::SYNC_BYTE;

    fn short_section() -> Vec<u8> {
        // 3-byte header + 13 bytes of body; section_length = 13
        let mut section = vec![0x00, 0xB0, 0x0D];
        section.extend_from_slice(&[0u8; 13]);
        section
    }

    #[test]
    fn test_packetize_single_packet_section() {
        let section = short_section();
        let packets = packetize_section(&section, false, false, 0x0000, 0, 5).unwrap();
        assert_eq!(packets.len(), 1);

        let packet = &packets[0];
        assert_eq!(packet.len(), TS_PACKET_SIZE);
        assert_eq!(packet[0], SYNC_BYTE);
        assert_eq!(packet[1] & 0x40, 0x40); // payload unit start
        assert_eq!(packet[3] & 0x0F, 5); // continuity counter
        assert_eq!(packet[4], 0); // pointer field
        assert_eq!(&packet[5..5 + section.len()], &section[..]);
        assert!(packet[5 + section.len()..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_packetize_long_section_spans_packets() {
        // section_length = 300 forces a continuation packet
        let mut section = vec![0x02, 0xB1, 0x2C];
        section.extend_from_slice(&vec![0xABu8; 300]);

        let packets = packetize_section(&section, false, false, 0x0100, 0, 0).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0][1] & 0x40, 0x40);
        assert_eq!(packets[1][1] & 0x40, 0x00);
        assert_eq!(packets[0][3] & 0x0F, 0);
        assert_eq!(packets[1][3] & 0x0F, 1);
    }

    #[test]
    fn test_assembler_roundtrip() {
        let section = short_section();
        let packets = packetize_section(&section, false, false, 0x0000, 0, 0).unwrap();

        let mut assembler = SectionAssembler::new(0x0000);
        for packet in &packets {
            assembler.push(packet).unwrap();
        }

        let assembled = assembler.pop().unwrap();
        assert_eq!(&assembled[..], &section[..]);
        assert!(assembler.pop().is_none());
    }

    #[test]
    fn test_assembler_roundtrip_multi_packet() {
        let mut section = vec![0x02, 0xB1, 0x2C];
        section.extend_from_slice(&vec![0xCDu8; 300]);

        let packets = packetize_section(&section, false, false, 0x0100, 0, 3).unwrap();
        let mut assembler = SectionAssembler::new(0x0100);
        for packet in &packets {
            assembler.push(packet).unwrap();
        }

        let assembled = assembler.pop().unwrap();
        assert_eq!(&assembled[..], &section[..]);
    }

    #[test]
    fn test_assembler_ignores_other_pids() {
        let section = short_section();
        let packets = packetize_section(&section, false, false, 0x0123, 0, 0).unwrap();

        let mut assembler = SectionAssembler::new(0x0000);
        for packet in &packets {
            assembler.push(packet).unwrap();
        }
        assert!(assembler.pop().is_none());
    }

    #[test]
    fn test_assembler_drops_unanchored_continuation() {
        let mut section = vec![0x02, 0xB1, 0x2C];
        section.extend_from_slice(&vec![0xEFu8; 300]);
        let packets = packetize_section(&section, false, false, 0x0100, 0, 0).unwrap();

        // Feed only the continuation packet; without the start it must not
        // produce a section.
        let mut assembler = SectionAssembler::new(0x0100);
        assembler.push(&packets[1]).unwrap();
        assert!(assembler.pop().is_none());
    }
}
