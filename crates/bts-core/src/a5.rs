//! A5/1 keystream generation (TS 55.216 style LFSR cipher).
//!
//! Produces the 228-bit keystream for one frame: the first 114 bits
//! cipher the downlink burst payload, the last 114 the uplink.

use crate::Ubit;
use crate::frame::GsmTime;

const R1_MASK: u32 = (1 << 19) - 1;
const R2_MASK: u32 = (1 << 22) - 1;
const R3_MASK: u32 = (1 << 23) - 1;

// Feedback taps: R1 x^19+x^18+x^17+x^14+1, R2 x^22+x^21+1,
// R3 x^23+x^22+x^21+x^8+1
const R1_TAPS: u32 = 0x072000;
const R2_TAPS: u32 = 0x300000;
const R3_TAPS: u32 = 0x700080;

/// Keystream for one frame: (downlink 114, uplink 114).
pub type Keystream = ([Ubit; 114], [Ubit; 114]);

/// 22-bit COUNT input derived from the frame number.
pub fn fn_count(time: GsmTime) -> u32 {
    (time.t1() << 11) | (time.t3() << 6) | time.t2()
}

/// Keystream for the given algorithm. Algorithm 0 means no ciphering
/// (no keystream); only A5/1 is implemented.
pub fn keystream(algo: u8, key: &[u8; 8], time: GsmTime) -> Option<Keystream> {
    match algo {
        0 => None,
        1 => Some(a5_1(key, fn_count(time))),
        _ => None,
    }
}

fn parity(x: u32) -> u32 {
    (x.count_ones() & 1) as u32
}

struct A51 {
    r1: u32,
    r2: u32,
    r3: u32,
}

impl A51 {
    fn clock_all(&mut self) {
        self.r1 = ((self.r1 << 1) & R1_MASK) | parity(self.r1 & R1_TAPS);
        self.r2 = ((self.r2 << 1) & R2_MASK) | parity(self.r2 & R2_TAPS);
        self.r3 = ((self.r3 << 1) & R3_MASK) | parity(self.r3 & R3_TAPS);
    }

    /// Majority-rule clocking over bits R1[8], R2[10], R3[10].
    fn clock(&mut self) {
        let c1 = (self.r1 >> 8) & 1;
        let c2 = (self.r2 >> 10) & 1;
        let c3 = (self.r3 >> 10) & 1;
        let maj = (c1 + c2 + c3 >= 2) as u32;
        if c1 == maj {
            self.r1 = ((self.r1 << 1) & R1_MASK) | parity(self.r1 & R1_TAPS);
        }
        if c2 == maj {
            self.r2 = ((self.r2 << 1) & R2_MASK) | parity(self.r2 & R2_TAPS);
        }
        if c3 == maj {
            self.r3 = ((self.r3 << 1) & R3_MASK) | parity(self.r3 & R3_TAPS);
        }
    }

    fn output(&self) -> Ubit {
        ((self.r1 >> 18) ^ (self.r2 >> 21) ^ (self.r3 >> 22)) as Ubit & 1
    }
}

fn a5_1(key: &[u8; 8], count: u32) -> Keystream {
    let mut regs = A51 { r1: 0, r2: 0, r3: 0 };

    // Key load, LSB of key[0] first
    for i in 0..64 {
        regs.clock_all();
        let kb = ((key[i >> 3] >> (i & 7)) & 1) as u32;
        regs.r1 ^= kb;
        regs.r2 ^= kb;
        regs.r3 ^= kb;
    }

    // COUNT load
    for i in 0..22 {
        regs.clock_all();
        let fb = (count >> i) & 1;
        regs.r1 ^= fb;
        regs.r2 ^= fb;
        regs.r3 ^= fb;
    }

    // Mix
    for _ in 0..100 {
        regs.clock();
    }

    let mut dl = [0u8; 114];
    let mut ul = [0u8; 114];
    for b in dl.iter_mut() {
        regs.clock();
        *b = regs.output();
    }
    for b in ul.iter_mut() {
        regs.clock();
        *b = regs.output();
    }
    (dl, ul)
}
