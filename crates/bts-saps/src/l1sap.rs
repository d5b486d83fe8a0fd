use core::fmt::Display;
use std::collections::VecDeque;

/// PH-DATA.req: downlink MAC block awaiting transmission.
#[derive(Debug, Clone)]
pub struct PhDataReq {
    pub chan_nr: u8,
    pub link_id: u8,
    /// Frame number the block is scheduled for
    pub fnr: u32,
    /// Packed MAC block
    pub data: Vec<u8>,
}

/// TCH.req: downlink traffic frame.
#[derive(Debug, Clone)]
pub struct TchReq {
    pub chan_nr: u8,
    pub fnr: u32,
    pub data: Vec<u8>,
}

/// Downlink primitive as held in the per-TRX prim queue.
#[derive(Debug, Clone)]
pub enum DlPrim {
    Data(PhDataReq),
    Tch(TchReq),
}

impl DlPrim {
    pub fn chan_nr(&self) -> u8 {
        match self {
            DlPrim::Data(p) => p.chan_nr,
            DlPrim::Tch(p) => p.chan_nr,
        }
    }

    pub fn link_id(&self) -> u8 {
        match self {
            DlPrim::Data(p) => p.link_id,
            DlPrim::Tch(_) => 0,
        }
    }

    pub fn fnr(&self) -> u32 {
        match self {
            DlPrim::Data(p) => p.fnr,
            DlPrim::Tch(p) => p.fnr,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            DlPrim::Data(p) => &p.data,
            DlPrim::Tch(p) => &p.data,
        }
    }
}

/// PH-RTS.ind: the scheduler is ready to send a block for (chan_nr, fn).
#[derive(Debug, Clone)]
pub struct PhRtsInd {
    pub chan_nr: u8,
    pub link_id: u8,
    pub tn: u8,
    pub fnr: u32,
}

/// TCH-RTS.ind: ready to send a traffic frame.
#[derive(Debug, Clone)]
pub struct TchRtsInd {
    pub chan_nr: u8,
    pub tn: u8,
    pub fnr: u32,
}

/// PH-DATA.ind: received uplink block.
#[derive(Debug, Clone)]
pub struct PhDataInd {
    pub chan_nr: u8,
    pub link_id: u8,
    pub tn: u8,
    /// Frame number of the first burst of the block
    pub fnr: u32,
    pub data: Vec<u8>,
    pub rssi_dbm: i8,
    pub ber10k: u16,
    pub ta256: i16,
}

/// TCH.ind: received uplink traffic frame.
#[derive(Debug, Clone)]
pub struct TchInd {
    pub chan_nr: u8,
    pub tn: u8,
    pub fnr: u32,
    pub data: Vec<u8>,
    pub rssi_dbm: i8,
    pub ber10k: u16,
    pub ta256: i16,
}

/// PH-RACH.ind: received access burst.
#[derive(Debug, Clone)]
pub struct PhRachInd {
    pub chan_nr: u8,
    pub tn: u8,
    pub fnr: u32,
    pub rssi_dbm: i8,
    pub ber10k: u16,
    pub ta256: i16,
    /// Burst was detected on a dedicated channel during handover access
    pub is_handover: bool,
}

/// Extended TOA statistics over one measurement interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToaExt {
    pub toa256_min: i16,
    pub toa256_max: i16,
    pub toa256_std_dev: u16,
}

/// Uplink measurement report for one reporting interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasResult {
    pub rxlev_full: u8,
    pub rxqual_full: u8,
    pub rxlev_sub: u8,
    pub rxqual_sub: u8,
    pub toa256_mean: i16,
    /// Present when the interval contained real samples
    pub toa_ext: Option<ToaExt>,
    /// Real (non-substituted) samples that went into the report
    pub num_real_samples: u16,
}

/// MPH-MEAS.ind: end-of-interval uplink measurement report.
#[derive(Debug, Clone)]
pub struct MphMeasInd {
    pub chan_nr: u8,
    pub tn: u8,
    pub fnr: u32,
    pub result: MeasResult,
}

/// Exhaustive list of upward primitives emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum L1sapUp {
    PhRtsInd(PhRtsInd),
    TchRtsInd(TchRtsInd),
    PhDataInd(PhDataInd),
    TchInd(TchInd),
    PhRachInd(PhRachInd),
    MphMeasInd(MphMeasInd),
}

impl Display for L1sapUp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            L1sapUp::PhRtsInd(_) => write!(f, "PhRtsInd"),
            L1sapUp::TchRtsInd(_) => write!(f, "TchRtsInd"),
            L1sapUp::PhDataInd(_) => write!(f, "PhDataInd"),
            L1sapUp::TchInd(_) => write!(f, "TchInd"),
            L1sapUp::PhRachInd(_) => write!(f, "PhRachInd"),
            L1sapUp::MphMeasInd(_) => write!(f, "MphMeasInd"),
        }
    }
}

/// Queue carrying upward primitives out of the scheduler. The caller owns
/// it and drains it after each scheduler call.
#[derive(Debug, Default)]
pub struct L1sapQueue {
    msgs: VecDeque<L1sapUp>,
}

impl L1sapQueue {
    pub fn new() -> L1sapQueue {
        L1sapQueue { msgs: VecDeque::new() }
    }

    pub fn push(&mut self, msg: L1sapUp) {
        tracing::trace!("-> {}", msg);
        self.msgs.push_back(msg);
    }

    pub fn pop(&mut self) -> Option<L1sapUp> {
        self.msgs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.msgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = L1sapUp> + '_ {
        self.msgs.drain(..)
    }
}
