//! Payload integrity checksum.

/// Compute the 16-bit payload checksum.
///
/// Bytes are summed into a 32-bit accumulator, the carries above bit 15 are
/// folded back into the low half until none remain, and the one's
/// complement of the result is returned. Both peers must agree bit for bit.
pub fn calculate_checksum(data: &[u8]) -> u16 {
    // 1024-byte payloads cannot overflow: 1024 * 255 < 2^32.
    let mut sum: u32 = data.iter().map(|&b| u32::from(b)).sum();

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload() {
        assert_eq!(calculate_checksum(&[]), 0xFFFF);
    }

    #[test]
    fn small_sum_is_complemented() {
        // 1 + 2 + 3 = 6
        assert_eq!(calculate_checksum(&[1, 2, 3]), !6u16);
    }

    #[test]
    fn carries_are_folded() {
        // 300 * 255 = 76500 = 0x12AD4 -> 0x2AD4 + 0x1 = 0x2AD5
        let data = vec![0xFFu8; 300];
        assert_eq!(calculate_checksum(&data), !0x2AD5u16);
    }

    #[test]
    fn order_independent_sum() {
        assert_eq!(calculate_checksum(&[9, 1, 200]), calculate_checksum(&[200, 9, 1]));
    }
}
