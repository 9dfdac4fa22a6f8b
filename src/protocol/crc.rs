//! CRC-64 checksum used by OpenIGTLink
//!
//! OpenIGTLink protects every message body with CRC-64/ECMA-182
//! (polynomial 0x42F0E1EBA9EA3693, zero init, no reflection, no final xor).

const POLY: u64 = 0x42F0_E1EB_A9EA_3693;

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u64) << 56;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & (1 << 63) != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u64; 256] = build_table();

/// Calculate the CRC-64 of a message body
pub fn calculate_crc(data: &[u8]) -> u64 {
    data.iter().fold(0u64, |crc, &byte| {
        CRC_TABLE[((crc >> 56) as u8 ^ byte) as usize] ^ (crc << 8)
    })
}

/// Check a body against the CRC declared in its header
pub fn verify_crc(data: &[u8], expected: u64) -> bool {
    calculate_crc(data) == expected
}
