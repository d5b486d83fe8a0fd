use core::fmt;

/// Number of frames in the GSM hyperframe (26 * 51 * 2048, TS 45.002 4.3.3).
pub const GSM_HYPERFRAME: u32 = 26 * 51 * 2048;

/// Duration of one TDMA frame in microseconds (8 bursts of ~577 us).
pub const FRAME_DURATION_US: u64 = 4615;

/// A point in GSM TDMA time, held as a frame number modulo the hyperframe.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GsmTime {
    /// Frame number, 0 .. GSM_HYPERFRAME
    pub fnr: u32,
}

impl GsmTime {
    pub fn new(fnr: u32) -> GsmTime {
        GsmTime { fnr: fnr % GSM_HYPERFRAME }
    }

    /// Superframe counter, 0 .. 2047
    pub fn t1(self) -> u32 {
        self.fnr / (26 * 51)
    }

    /// Position in the 26-multiframe
    pub fn t2(self) -> u32 {
        self.fnr % 26
    }

    /// Position in the 51-multiframe
    pub fn t3(self) -> u32 {
        self.fnr % 51
    }

    pub fn fn104(self) -> u32 {
        self.fnr % 104
    }

    pub fn fn102(self) -> u32 {
        self.fnr % 102
    }

    pub fn add_frames(self, frames: u32) -> GsmTime {
        GsmTime::new(self.fnr.wrapping_add(frames) % GSM_HYPERFRAME)
    }

    /// Number of frames from `earlier` to self, 0 .. GSM_HYPERFRAME-1.
    pub fn diff(self, earlier: GsmTime) -> u32 {
        (self.fnr + GSM_HYPERFRAME - earlier.fnr) % GSM_HYPERFRAME
    }
}

/// Forward distance from frame number `b` to frame number `a`.
pub fn fn_diff(a: u32, b: u32) -> u32 {
    (a + GSM_HYPERFRAME - b) % GSM_HYPERFRAME
}

/// `a + b` modulo the hyperframe.
pub fn fn_add(a: u32, b: u32) -> u32 {
    (a + b) % GSM_HYPERFRAME
}

impl fmt::Display for GsmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:7}/{:04}/{:02}/{:02}", self.fnr, self.t1(), self.t2(), self.t3())
    }
}

impl fmt::Debug for GsmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:7}/{:04}/{:02}/{:02}", self.fnr, self.t1(), self.t2(), self.t3())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraparound_diff() {
        let a = GsmTime::new(GSM_HYPERFRAME - 2);
        let b = a.add_frames(5);
        assert_eq!(b.fnr, 3);
        assert_eq!(b.diff(a), 5);
        assert_eq!(a.diff(b), GSM_HYPERFRAME - 5);
    }

    #[test]
    fn test_t123() {
        // fn = 1000: t1 = 1000/1326 = 0, t2 = 1000%26 = 12, t3 = 1000%51 = 31
        let t = GsmTime::new(1000);
        assert_eq!(t.t1(), 0);
        assert_eq!(t.t2(), 12);
        assert_eq!(t.t3(), 31);

        let t = GsmTime::new(26 * 51 * 3 + 7);
        assert_eq!(t.t1(), 3);
        assert_eq!(t.t2(), (26 * 51 * 3 + 7) % 26);
        assert_eq!(t.t3(), 7 % 51);
    }

    #[test]
    fn test_new_reduces_modulo() {
        assert_eq!(GsmTime::new(GSM_HYPERFRAME).fnr, 0);
        assert_eq!(GsmTime::new(GSM_HYPERFRAME + 41).fnr, 41);
    }
}
