//! TDMA multiframe mapping tables (TS 45.002 clause 7 table 3).
//!
//! Each physical channel type maps frame offsets within its multiframe
//! period to a (logical channel, burst id) pair per direction. The tables
//! are generated at compile time from the clause 7 mapping rules.

use crate::chan::TrxChanType;

/// Physical channel configuration of one timeslot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pchan {
    Ccch,
    CcchSdcch4,
    Sdcch8,
    TchF,
    TchH,
    Pdch,
}

/// One direction of one frame: which channel owns it and which burst of
/// the channel's block this frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MfEntry {
    pub chan: TrxChanType,
    pub bid: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct MfFrame {
    pub dl: MfEntry,
    pub ul: MfEntry,
}

const fn ent(chan: TrxChanType, bid: u8) -> MfEntry {
    MfEntry { chan, bid }
}

const IDLE: MfEntry = ent(TrxChanType::Idle, 0);
const MF_IDLE: MfFrame = MfFrame { dl: IDLE, ul: IDLE };

/// Downlink frame layout of the 51-multiframe BCCH+CCCH timeslot.
/// FCCH/SCH every 10 frames, BCCH block at 2..5, CCCH blocks in the
/// remaining 4-frame groups, frame 50 idle.
const fn ccch_dl(f: u32) -> MfEntry {
    if f == 50 {
        return IDLE;
    }
    let g = f % 10;
    if g == 0 {
        return ent(TrxChanType::Fcch, 0);
    }
    if g == 1 {
        return ent(TrxChanType::Sch, 0);
    }
    let (start, off) = if g >= 6 { (f - (g - 6), g - 6) } else { (f - (g - 2), g - 2) };
    if start == 2 {
        ent(TrxChanType::Bcch, off as u8)
    } else {
        ent(TrxChanType::Ccch, off as u8)
    }
}

/// Downlink layout of the combined BCCH+CCCH+SDCCH/4 timeslot over its
/// 102-frame period. Four CCCH block positions become SDCCH/4 0..3, the
/// last two carry SACCH/4 0/1 in the first half and 2/3 in the second.
const fn ccch_sdcch4_dl(fn102: u32) -> MfEntry {
    let h = fn102 / 51;
    let f = fn102 % 51;
    if f == 50 {
        return IDLE;
    }
    let g = f % 10;
    if g == 0 {
        return ent(TrxChanType::Fcch, 0);
    }
    if g == 1 {
        return ent(TrxChanType::Sch, 0);
    }
    let (start, off) = if g >= 6 { (f - (g - 6), g - 6) } else { (f - (g - 2), g - 2) };
    let bid = off as u8;
    match start {
        2 => ent(TrxChanType::Bcch, bid),
        22 => ent(TrxChanType::Sdcch4_0, bid),
        26 => ent(TrxChanType::Sdcch4_1, bid),
        32 => ent(TrxChanType::Sdcch4_2, bid),
        36 => ent(TrxChanType::Sdcch4_3, bid),
        42 => ent(if h == 0 { TrxChanType::Sacch4_0 } else { TrxChanType::Sacch4_2 }, bid),
        46 => ent(if h == 0 { TrxChanType::Sacch4_1 } else { TrxChanType::Sacch4_3 }, bid),
        _ => ent(TrxChanType::Ccch, bid),
    }
}

/// Uplink of the combined timeslot: dedicated blocks appear 15 frames
/// after their downlink position, everything else is RACH.
const fn ccch_sdcch4_ul(fn102: u32) -> MfEntry {
    let src = ccch_sdcch4_dl((fn102 + 102 - 15) % 102);
    match src.chan {
        TrxChanType::Sdcch4_0
        | TrxChanType::Sdcch4_1
        | TrxChanType::Sdcch4_2
        | TrxChanType::Sdcch4_3
        | TrxChanType::Sacch4_0
        | TrxChanType::Sacch4_1
        | TrxChanType::Sacch4_2
        | TrxChanType::Sacch4_3 => src,
        _ => ent(TrxChanType::Rach, 0),
    }
}

const fn sdcch8_sub(i: u32) -> TrxChanType {
    match i {
        0 => TrxChanType::Sdcch8_0,
        1 => TrxChanType::Sdcch8_1,
        2 => TrxChanType::Sdcch8_2,
        3 => TrxChanType::Sdcch8_3,
        4 => TrxChanType::Sdcch8_4,
        5 => TrxChanType::Sdcch8_5,
        6 => TrxChanType::Sdcch8_6,
        _ => TrxChanType::Sdcch8_7,
    }
}

const fn sacch8_sub(i: u32) -> TrxChanType {
    match i {
        0 => TrxChanType::Sacch8_0,
        1 => TrxChanType::Sacch8_1,
        2 => TrxChanType::Sacch8_2,
        3 => TrxChanType::Sacch8_3,
        4 => TrxChanType::Sacch8_4,
        5 => TrxChanType::Sacch8_5,
        6 => TrxChanType::Sacch8_6,
        _ => TrxChanType::Sacch8_7,
    }
}

/// SDCCH/8 downlink: 8 subchannels in 4-frame groups, then SACCH/8 0..3
/// (first half) or 4..7 (second half), 3 idle frames at the end.
const fn sdcch8_dl(fn102: u32) -> MfEntry {
    let h = fn102 / 51;
    let f = fn102 % 51;
    if f < 32 {
        ent(sdcch8_sub(f / 4), (f % 4) as u8)
    } else if f < 48 {
        ent(sacch8_sub((f - 32) / 4 + h * 4), ((f - 32) % 4) as u8)
    } else {
        IDLE
    }
}

/// SDCCH/8 uplink: shifted 15 frames behind downlink.
const fn sdcch8_ul(fn102: u32) -> MfEntry {
    sdcch8_dl((fn102 + 102 - 15) % 102)
}

/// TCH/F frame layout: SACCH every 26 frames (on t=12 for even, t=25 for
/// odd timeslots, the opposite frame idle), TCH bursts elsewhere. The
/// SACCH block spans the whole 104-multiframe, one burst per quarter.
const fn tchf_frame(tn: u32, fn104: u32) -> MfFrame {
    let t = fn104 % 26;
    let sacch_start = 12 + 13 * tn;
    let sacch_t = sacch_start % 26;
    let idle_t = if sacch_t == 12 { 25 } else { 12 };
    let e = if t == sacch_t {
        ent(TrxChanType::SacchTF, (((fn104 + 104 - sacch_start) % 104) / 26) as u8)
    } else if t == idle_t {
        IDLE
    } else {
        ent(TrxChanType::TchF, ((t % 13) % 4) as u8)
    };
    MfFrame { dl: e, ul: e }
}

/// TCH/H frame layout per timeslot pair: subchannels alternate by frame
/// parity (flipping after the t=12 frame), SACCH(0) on t=12, SACCH(1) on
/// t=25. A new half-rate frame starts every second burst of a
/// subchannel, so traffic burst ids alternate 0/1 along the subchannel's
/// own burst sequence.
const fn tchh_frame(pair: u32, fn104: u32) -> MfFrame {
    let t = fn104 % 26;
    let e = if t == 12 || t == 25 {
        let (chan, start) = if t == 12 {
            (TrxChanType::SacchTH0, 12 + 26 * pair)
        } else {
            (TrxChanType::SacchTH1, 25 + 26 * pair)
        };
        ent(chan, (((fn104 + 104 - start) % 104) / 26) as u8)
    } else {
        let tt = if t < 12 { t } else { t - 13 };
        let idx = if t < 12 { tt / 2 } else { 6 + tt / 2 };
        let chan = if tt % 2 == 0 { TrxChanType::TchH0 } else { TrxChanType::TchH1 };
        ent(chan, (idx % 2) as u8)
    };
    MfFrame { dl: e, ul: e }
}

/// PDCH: PTCCH on frames 12/38 of each 52-multiframe, idle on 25/51,
/// PDTCH blocks of 4 consecutive frames elsewhere.
const fn pdch_frame(fn104: u32) -> MfFrame {
    let t52 = fn104 % 52;
    let e = if t52 == 12 || t52 == 38 {
        ent(TrxChanType::Ptcch, (fn104 / 26) as u8)
    } else if t52 == 25 || t52 == 51 {
        IDLE
    } else {
        ent(TrxChanType::Pdtch, ((fn104 % 13) % 4) as u8)
    };
    MfFrame { dl: e, ul: e }
}

const fn build_ccch() -> [MfFrame; 51] {
    let mut fr = [MF_IDLE; 51];
    let mut f = 0;
    while f < 51 {
        fr[f] = MfFrame { dl: ccch_dl(f as u32), ul: ent(TrxChanType::Rach, 0) };
        f += 1;
    }
    fr
}

const fn build_ccch_sdcch4() -> [MfFrame; 102] {
    let mut fr = [MF_IDLE; 102];
    let mut f = 0;
    while f < 102 {
        fr[f] = MfFrame { dl: ccch_sdcch4_dl(f as u32), ul: ccch_sdcch4_ul(f as u32) };
        f += 1;
    }
    fr
}

const fn build_sdcch8() -> [MfFrame; 102] {
    let mut fr = [MF_IDLE; 102];
    let mut f = 0;
    while f < 102 {
        fr[f] = MfFrame { dl: sdcch8_dl(f as u32), ul: sdcch8_ul(f as u32) };
        f += 1;
    }
    fr
}

const fn build_tchf(tn: u32) -> [MfFrame; 104] {
    let mut fr = [MF_IDLE; 104];
    let mut f = 0;
    while f < 104 {
        fr[f] = tchf_frame(tn, f as u32);
        f += 1;
    }
    fr
}

const fn build_tchh(pair: u32) -> [MfFrame; 104] {
    let mut fr = [MF_IDLE; 104];
    let mut f = 0;
    while f < 104 {
        fr[f] = tchh_frame(pair, f as u32);
        f += 1;
    }
    fr
}

const fn build_pdch() -> [MfFrame; 104] {
    let mut fr = [MF_IDLE; 104];
    let mut f = 0;
    while f < 104 {
        fr[f] = pdch_frame(f as u32);
        f += 1;
    }
    fr
}

static FRAME_CCCH: [MfFrame; 51] = build_ccch();
static FRAME_CCCH_SDCCH4: [MfFrame; 102] = build_ccch_sdcch4();
static FRAME_SDCCH8: [MfFrame; 102] = build_sdcch8();
static FRAME_TCHF: [[MfFrame; 104]; 8] = [
    build_tchf(0),
    build_tchf(1),
    build_tchf(2),
    build_tchf(3),
    build_tchf(4),
    build_tchf(5),
    build_tchf(6),
    build_tchf(7),
];
static FRAME_TCHH: [[MfFrame; 104]; 4] = [build_tchh(0), build_tchh(1), build_tchh(2), build_tchh(3)];
static FRAME_PDCH: [MfFrame; 104] = build_pdch();

/// One registered multiframe layout.
#[derive(Debug)]
pub struct Multiframe {
    pub pchan: Pchan,
    /// Timeslots this layout may serve
    pub slotmask: u8,
    pub period: u32,
    pub frames: &'static [MfFrame],
    pub name: &'static str,
}

#[rustfmt::skip]
pub static TRX_SCHED_MULTIFRAMES: [Multiframe; 16] = [
    Multiframe { pchan: Pchan::Ccch,       slotmask: 0x01, period: 51,  frames: &FRAME_CCCH,         name: "BCCH+CCCH" },
    Multiframe { pchan: Pchan::CcchSdcch4, slotmask: 0x01, period: 102, frames: &FRAME_CCCH_SDCCH4,  name: "BCCH+CCCH+SDCCH/4" },
    Multiframe { pchan: Pchan::Sdcch8,     slotmask: 0xff, period: 102, frames: &FRAME_SDCCH8,       name: "SDCCH/8" },
    Multiframe { pchan: Pchan::TchF,       slotmask: 0x01, period: 104, frames: &FRAME_TCHF[0],      name: "TCH/F (TS0)" },
    Multiframe { pchan: Pchan::TchF,       slotmask: 0x02, period: 104, frames: &FRAME_TCHF[1],      name: "TCH/F (TS1)" },
    Multiframe { pchan: Pchan::TchF,       slotmask: 0x04, period: 104, frames: &FRAME_TCHF[2],      name: "TCH/F (TS2)" },
    Multiframe { pchan: Pchan::TchF,       slotmask: 0x08, period: 104, frames: &FRAME_TCHF[3],      name: "TCH/F (TS3)" },
    Multiframe { pchan: Pchan::TchF,       slotmask: 0x10, period: 104, frames: &FRAME_TCHF[4],      name: "TCH/F (TS4)" },
    Multiframe { pchan: Pchan::TchF,       slotmask: 0x20, period: 104, frames: &FRAME_TCHF[5],      name: "TCH/F (TS5)" },
    Multiframe { pchan: Pchan::TchF,       slotmask: 0x40, period: 104, frames: &FRAME_TCHF[6],      name: "TCH/F (TS6)" },
    Multiframe { pchan: Pchan::TchF,       slotmask: 0x80, period: 104, frames: &FRAME_TCHF[7],      name: "TCH/F (TS7)" },
    Multiframe { pchan: Pchan::TchH,       slotmask: 0x03, period: 104, frames: &FRAME_TCHH[0],      name: "TCH/H (TS0/1)" },
    Multiframe { pchan: Pchan::TchH,       slotmask: 0x0c, period: 104, frames: &FRAME_TCHH[1],      name: "TCH/H (TS2/3)" },
    Multiframe { pchan: Pchan::TchH,       slotmask: 0x30, period: 104, frames: &FRAME_TCHH[2],      name: "TCH/H (TS4/5)" },
    Multiframe { pchan: Pchan::TchH,       slotmask: 0xc0, period: 104, frames: &FRAME_TCHH[3],      name: "TCH/H (TS6/7)" },
    Multiframe { pchan: Pchan::Pdch,       slotmask: 0xff, period: 104, frames: &FRAME_PDCH,         name: "PDCH" },
];

/// Select the multiframe layout for a pchan on a given timeslot.
pub fn find(pchan: Pchan, tn: u8) -> Option<&'static Multiframe> {
    TRX_SCHED_MULTIFRAMES
        .iter()
        .find(|m| m.pchan == pchan && (m.slotmask >> tn) & 1 == 1)
}

impl Multiframe {
    pub fn dl(&self, fnr: u32) -> MfEntry {
        self.frames[(fnr % self.period) as usize].dl
    }

    pub fn ul(&self, fnr: u32) -> MfEntry {
        self.frames[(fnr % self.period) as usize].ul
    }

    /// True if the given frame carries a SACCH burst in the given direction.
    pub fn is_sacch(&self, fnr: u32, uplink: bool) -> bool {
        let e = if uplink { self.ul(fnr) } else { self.dl(fnr) };
        e.chan.is_sacch()
    }
}
