//! CRC32 for snapshot block validation
//!
//! Detects torn or corrupted snapshot blocks in a key-value partition. The
//! checksum covers the block header and the entry payload, computed in
//! pieces so neither has to be copied into a contiguous buffer.

use crc::{Crc, CRC_32_ISO_HDLC};

/// CRC-32/ISO-HDLC (the Ethernet/ZIP polynomial)
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Checksum of a single slice
///
/// ```
/// use flash_prefs_core::crc::checksum;
///
/// assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
/// ```
pub fn checksum(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Checksum of several slices, as if concatenated
pub fn checksum_parts(parts: &[&[u8]]) -> u32 {
    let mut digest = CRC32.digest();
    for part in parts {
        digest.update(part);
    }
    digest.finalize()
}
