/// CRC32 implementation specifically for MPEG-2 TS PSI tables
/// Based on ITU-T H.222.0 / ISO/IEC 13818-1
/// Polynomial: x32 + x26 + x23 + x22 + x16 + x12 + x11 + x10 + x8 + x7 + x5 + x4 + x2 + x + 1
/// Initial value: 0xFFFFFFFF

const CRC32_MPEG2: u32 = 0x04C11DB7;

/// MPEG-2 CRC32 calculator used for Transport Stream PSI table validation
///
/// Implements the CRC32 algorithm specified in ITU-T H.222.0 / ISO/IEC 13818-1
/// for validating Program Specific Information (PSI) tables in MPEG-2 Transport Streams.
pub struct Crc32Mpeg2 {
    /// Lookup table for fast CRC calculation
    table: [u32; 256],
}

impl Crc32Mpeg2 {
    /// Creates a new CRC32 calculator with pre-computed lookup table
    pub fn new() -> Self {
        let mut table = [0u32; 256];
        for i in 0..256 {
            let mut crc = (i as u32) << 24;
            for _ in 0..8 {
                crc = if (crc & 0x80000000) != 0 {
                    (crc << 1) ^ CRC32_MPEG2
                } else {
                    crc << 1
                };
            }
            table[i] = crc;
        }
        Self { table }
    }

    /// Calculates the CRC32 checksum for the given data using the MPEG-2 algorithm
    pub fn calculate(&self, data: &[u8]) -> u32 {
        let mut crc = 0xFFFFFFFF;
        for &byte in data {
            let index = ((crc >> 24) ^ (byte as u32)) & 0xFF;
            crc = (crc << 8) ^ self.table[index as usize];
        }
        crc
    }

    /// Validates a complete PSI section whose last four bytes carry the CRC
    /// over everything that precedes them.
    ///
    /// Returns `false` for sections too short to carry a CRC at all.
    pub fn verify_section(&self, section: &[u8]) -> bool {
        if section.len() < 4 {
            return false;
        }
        let body = &section[..section.len() - 4];
        let stored = u32::from_be_bytes([
            section[section.len() - 4],
            section[section.len() - 3],
            section[section.len() - 2],
            section[section.len() - 1],
        ]);
        self.calculate(body) == stored
    }

    /// Appends the MPEG-2 CRC of `body` to it, returning the full section.
    pub fn seal_section(&self, body: &[u8]) -> Vec<u8> {
        let mut out = body.to_vec();
        out.extend_from_slice(&self.calculate(body).to_be_bytes());
        out
    }
}

impl Default for Crc32Mpeg2 {
    fn default() -> Self {
        Self::new()
    }
}
