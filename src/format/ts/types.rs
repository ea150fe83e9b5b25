use crate::error::{Result, TsHlsError};
use bytes::{BufMut, BytesMut};

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_NIT: u16 = 0x0010;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;

// Elementary stream types
pub const STREAM_TYPE_H264: u8 = 0x1b;

// Constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const SYNC_BYTE: u8 = 0x47;

/// Fixed four-byte MPEG-TS packet header.
#[derive(Debug, Clone)]
pub struct TsHeader {
    pub sync_byte: u8, // Always 0x47
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

impl Default for TsHeader {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

impl TsHeader {
    /// Parses the fixed header from the front of a TS packet.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < TS_HEADER_SIZE {
            return Err(TsHlsError::InvalidData("TS packet too short".into()));
        }
        if data[0] != SYNC_BYTE {
            return Err(TsHlsError::InvalidData("Invalid sync byte".into()));
        }

        Ok(Self {
            sync_byte: data[0],
            transport_error: (data[1] & 0x80) != 0,
            payload_unit_start: (data[1] & 0x40) != 0,
            transport_priority: (data[1] & 0x20) != 0,
            pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_exists: (data[3] & 0x20) != 0,
            contains_payload: (data[3] & 0x10) != 0,
            continuity_counter: data[3] & 0x0F,
        })
    }

    /// Serializes the fixed header into `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(self.sync_byte);

        let mut b1 = 0u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }
        b1 |= ((self.pid >> 8) & 0x1f) as u8;
        buf.put_u8(b1);

        buf.put_u8((self.pid & 0xff) as u8);

        let mut b3 = self.scrambling_control << 6;
        if self.adaptation_field_exists {
            b3 |= 0x20;
        }
        if self.contains_payload {
            b3 |= 0x10;
        }
        b3 |= self.continuity_counter & 0x0f;
        buf.put_u8(b3);

        Ok(())
    }

    /// Byte offset of the payload inside the packet, accounting for an
    /// adaptation field when present.
    pub fn payload_offset(&self, packet: &[u8]) -> usize {
        let mut offset = TS_HEADER_SIZE;
        if self.adaptation_field_exists && packet.len() > TS_HEADER_SIZE {
            offset += packet[TS_HEADER_SIZE] as usize + 1;
        }
        offset
    }
}
