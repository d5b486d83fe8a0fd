//! Burst-level bit constants, TS 45.002 clause 5.2.

use crate::Ubit;

/// Bits per burst period (3 + 58 + 26 + 58 + 3).
pub const GSM_BURST_LEN: usize = 148;

/// Payload bits carried by one normal burst (2 x 57).
pub const BURST_PAYLOAD_LEN: usize = 114;

/// Dummy burst (TS 45.002 5.2.6), sent on C0 when a slot has nothing to say.
pub const DUMMY_BURST: [Ubit; GSM_BURST_LEN] = [
    0, 0, 0,
    1, 1, 1, 1, 1, 0, 1, 1, 0, 1, 1, 1, 0, 1, 1, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 1, 1, 0,
    0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 1, 1, 1, 0, 0,
    0, 1, 0, 1, 1, 1, 0, 0, 0, 1, 0, 1, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1, 1, 1, 0, 1, 0, 0, 1, 0, 1, 0,
    0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 1, 1, 1, 1, 0, 1, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 1,
    0, 0, 1, 0, 1, 1, 1, 1, 1, 0, 1, 0, 1, 0,
    0, 0, 0,
];

/// Frequency correction burst (TS 45.002 5.2.4): all zero, which after GMSK
/// modulation is a pure tone.
pub const FCCH_BURST: [Ubit; GSM_BURST_LEN] = [0; GSM_BURST_LEN];

/// Normal burst training sequences (TS 45.002 5.2.3), indexed by TSC.
pub const TSC: [[Ubit; 26]; 8] = [
    [0, 0, 1, 0, 0, 1, 0, 1, 1, 1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 0, 1, 1, 1],
    [0, 0, 1, 0, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 1, 1, 0, 1, 1, 1],
    [0, 1, 0, 0, 0, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 0, 0, 1, 0, 0, 0, 0, 1, 1, 1, 0],
    [0, 1, 0, 0, 0, 1, 1, 1, 1, 0, 1, 1, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 1, 0],
    [0, 0, 0, 1, 1, 0, 1, 0, 1, 1, 1, 0, 0, 1, 0, 0, 0, 0, 0, 1, 1, 0, 1, 0, 1, 1],
    [0, 1, 0, 0, 1, 1, 1, 0, 1, 0, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 1, 0, 1, 0],
    [1, 0, 1, 0, 0, 1, 1, 1, 1, 1, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 0, 1, 1, 1, 1, 1],
    [1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0],
];

/// SCH extended training sequence (TS 45.002 5.2.5).
pub const SCH_TRAIN: [Ubit; 64] = [
    1, 0, 1, 1, 1, 0, 0, 1, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1,
    0, 0, 1, 0, 1, 1, 0, 1, 0, 1, 0, 0, 0, 1, 0, 1, 0, 1, 1, 1, 0, 1, 1, 0, 0, 0, 0, 1, 1, 0, 1, 1,
];

/// Assemble a normal burst from two 57-bit payload halves, the stealing
/// flags and a training sequence code.
pub fn normal_burst(left: &[Ubit], right: &[Ubit], hl: Ubit, hu: Ubit, tsc: usize) -> [Ubit; GSM_BURST_LEN] {
    let mut bits = [0u8; GSM_BURST_LEN];
    bits[3..60].copy_from_slice(&left[..57]);
    bits[60] = hl;
    bits[61..87].copy_from_slice(&TSC[tsc & 7]);
    bits[87] = hu;
    bits[88..145].copy_from_slice(&right[..57]);
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_burst_guard_bits() {
        assert_eq!(&DUMMY_BURST[0..3], &[0, 0, 0]);
        assert_eq!(&DUMMY_BURST[145..148], &[0, 0, 0]);
    }

    #[test]
    fn test_normal_burst_layout() {
        let left = [1u8; 57];
        let right = [0u8; 57];
        let b = normal_burst(&left, &right, 1, 0, 2);
        assert_eq!(&b[0..3], &[0, 0, 0]);
        assert_eq!(&b[3..60], &left[..]);
        assert_eq!(b[60], 1);
        assert_eq!(&b[61..87], &TSC[2][..]);
        assert_eq!(b[87], 0);
        assert_eq!(&b[88..145], &right[..]);
        assert_eq!(&b[145..148], &[0, 0, 0]);
    }
}
