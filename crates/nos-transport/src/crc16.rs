//! CRC-16 as the chip computes it: polynomial 0x1021, initial value 0, no
//! reflection, no final xor (the XMODEM parameterisation).

use crc::{CRC_16_XMODEM, Crc};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC-16 of a single region.
pub fn crc16(buf: &[u8]) -> u16 {
    crc16_update(buf, 0)
}

/// Continue a CRC-16 across another region without materialising the
/// concatenation. With no reflection and no final xor, seeding with the
/// previous value is exactly the CRC of the joined regions.
pub fn crc16_update(buf: &[u8], crc: u16) -> u16 {
    let mut digest = CRC16.digest_with_initial(crc);
    digest.update(buf);
    digest.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(crc16(b"123456789"), 0x31c3);
    }

    #[test]
    fn empty_is_the_seed() {
        assert_eq!(crc16(&[]), 0);
        assert_eq!(crc16_update(&[], 0x1234), 0x1234);
    }

    #[test]
    fn chaining_matches_one_pass() {
        let whole = crc16(b"one region, two region");
        let mut crc = crc16(b"one region");
        crc = crc16_update(b", two", crc);
        crc = crc16_update(b" region", crc);
        assert_eq!(crc, whole);
    }
}
