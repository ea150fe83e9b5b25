//! # H.264/AVC Byte-Stream Analysis
//!
//! Minimal H.264 support for segmentation decisions:
//!
//! - NAL unit type identification
//! - Annex-B start-code scanning
//! - IDR (key frame) detection inside an elementary stream payload
//!
//! ## Example: IDR Detection
//!
//! ```rust
//! use tshls::codec::h264::contains_idr;
//!
//! // start code + NAL header with type 5 (IDR coded slice)
//! let es = [0x00, 0x00, 0x01, 0x65, 0x88, 0x80];
//! assert!(contains_idr(&es));
//! ```

/// H.264 NAL unit types, per ITU-T H.264 Table 7-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    Unspecified = 0,
    CodedSliceNonIdr = 1,
    CodedSliceDataPartitionA = 2,
    CodedSliceDataPartitionB = 3,
    CodedSliceDataPartitionC = 4,
    CodedSliceIdr = 5,
    Sei = 6,
    Sps = 7,
    Pps = 8,
    AccessUnitDelimiter = 9,
    EndOfSequence = 10,
    EndOfStream = 11,
    FillerData = 12,
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value {
            1 => NalUnitType::CodedSliceNonIdr,
            2 => NalUnitType::CodedSliceDataPartitionA,
            3 => NalUnitType::CodedSliceDataPartitionB,
            4 => NalUnitType::CodedSliceDataPartitionC,
            5 => NalUnitType::CodedSliceIdr,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::AccessUnitDelimiter,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::FillerData,
            _ => NalUnitType::Unspecified,
        }
    }
}

/// Scans an Annex-B elementary stream payload for an IDR coded slice.
///
/// Looks for 3-byte start-code prefixes (`00 00 01`); the low 5 bits of the
/// byte that follows carry the NAL unit type. The scan stops at the first
/// IDR found or at the end of the buffer, whichever comes first — callers
/// only need a yes/no, not an exhaustive NAL inventory.
pub fn contains_idr(payload: &[u8]) -> bool {
    if payload.len() < 4 {
        return false;
    }
    let mut i = 0;
    while i + 3 < payload.len() {
        if payload[i] == 0x00 && payload[i + 1] == 0x00 && payload[i + 2] == 0x01 {
            let nal_type = NalUnitType::from(payload[i + 3] & 0x1F);
            if nal_type == NalUnitType::CodedSliceIdr {
                return true;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    false
}
