//! RSL channel number (TS 48.058 9.3.1) packing and unpacking.
//!
//! The channel number octet carries the "C-bits" in bits 7..3 and the
//! timeslot number in bits 2..0. Subchannel numbers, where applicable,
//! live in the low C-bits.

/// Link identifier for the main/dedicated channel (FACCH/SDCCH).
pub const LID_DEDIC: u8 = 0x00;
/// Link identifier for the slow associated control channel.
pub const LID_SACCH: u8 = 0x40;

pub const CBITS_TCHF: u8 = 0x08;
pub const CBITS_TCHH: u8 = 0x10;
pub const CBITS_SDCCH4: u8 = 0x20;
pub const CBITS_SDCCH8: u8 = 0x40;
pub const CBITS_BCCH: u8 = 0x80;
pub const CBITS_RACH: u8 = 0x88;
pub const CBITS_CCCH: u8 = 0x90;
pub const CBITS_PDTCH: u8 = 0xc0;
pub const CBITS_CBCH4: u8 = 0xc8;

pub fn tchf(tn: u8) -> u8 {
    CBITS_TCHF | (tn & 7)
}

pub fn tchh(ss: u8, tn: u8) -> u8 {
    CBITS_TCHH | ((ss & 1) << 3) | (tn & 7)
}

pub fn sdcch4(ss: u8, tn: u8) -> u8 {
    CBITS_SDCCH4 | ((ss & 3) << 3) | (tn & 7)
}

pub fn sdcch8(ss: u8, tn: u8) -> u8 {
    CBITS_SDCCH8 | ((ss & 7) << 3) | (tn & 7)
}

pub fn bcch(tn: u8) -> u8 {
    CBITS_BCCH | (tn & 7)
}

pub fn rach(tn: u8) -> u8 {
    CBITS_RACH | (tn & 7)
}

pub fn ccch(tn: u8) -> u8 {
    CBITS_CCCH | (tn & 7)
}

pub fn pdtch(tn: u8) -> u8 {
    CBITS_PDTCH | (tn & 7)
}

pub fn cbch4(tn: u8) -> u8 {
    CBITS_CBCH4 | (tn & 7)
}

/// C-bits with the subchannel masked in, as used for descriptor matching.
pub fn cbits(chan_nr: u8) -> u8 {
    chan_nr & 0xf8
}

/// Timeslot number
pub fn tn(chan_nr: u8) -> u8 {
    chan_nr & 0x07
}

/// Subchannel number for channel types that carry one, else 0.
pub fn ss(chan_nr: u8) -> u8 {
    let c = cbits(chan_nr);
    if (0x10..=0x18).contains(&c) {
        (chan_nr >> 3) & 0x01
    } else if (0x20..=0x38).contains(&c) {
        (chan_nr >> 3) & 0x03
    } else if (0x40..=0x78).contains(&c) {
        (chan_nr >> 3) & 0x07
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        assert_eq!(tchf(3), 0x0b);
        assert_eq!(tchh(1, 2), 0x1a);
        assert_eq!(sdcch4(3, 0), 0x38);
        assert_eq!(sdcch8(7, 5), 0x7d);
        assert_eq!(bcch(0), 0x80);
        assert_eq!(rach(0), 0x88);

        assert_eq!(tn(tchh(1, 2)), 2);
        assert_eq!(cbits(sdcch8(7, 5)), 0x78);
    }

    #[test]
    fn test_subchannel_extraction() {
        assert_eq!(ss(tchf(4)), 0);
        assert_eq!(ss(tchh(0, 1)), 0);
        assert_eq!(ss(tchh(1, 1)), 1);
        for sub in 0..4 {
            assert_eq!(ss(sdcch4(sub, 0)), sub);
        }
        for sub in 0..8 {
            assert_eq!(ss(sdcch8(sub, 6)), sub);
        }
        assert_eq!(ss(bcch(0)), 0);
        assert_eq!(ss(pdtch(3)), 0);
    }
}
