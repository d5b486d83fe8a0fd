//! Logical channel descriptors and per-channel scheduler state.

use bts_core::chan_nr::{LID_DEDIC, LID_SACCH};
use bts_core::{Sbit, Ubit};

use crate::meas::MeasState;

/// Logical channel slots a timeslot's multiframe can dispatch to.
/// Discriminants index [`TRX_CHAN_DESC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrxChanType {
    Idle = 0,
    Fcch,
    Sch,
    Bcch,
    Rach,
    Ccch,
    TchF,
    TchH0,
    TchH1,
    Sdcch4_0,
    Sdcch4_1,
    Sdcch4_2,
    Sdcch4_3,
    Sdcch8_0,
    Sdcch8_1,
    Sdcch8_2,
    Sdcch8_3,
    Sdcch8_4,
    Sdcch8_5,
    Sdcch8_6,
    Sdcch8_7,
    SacchTF,
    SacchTH0,
    SacchTH1,
    Sacch4_0,
    Sacch4_1,
    Sacch4_2,
    Sacch4_3,
    Sacch8_0,
    Sacch8_1,
    Sacch8_2,
    Sacch8_3,
    Sacch8_4,
    Sacch8_5,
    Sacch8_6,
    Sacch8_7,
    Pdtch,
    Ptcch,
    Cbch,
}

pub const TRX_CHAN_MAX: usize = 39;

/// Ready-to-send handling for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtsKind {
    None,
    Data,
    Tchf,
    Tchh,
}

/// Downlink burst production for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlKind {
    None,
    Idle,
    Fcch,
    Sch,
    Data,
    Tchf,
    Tchh,
    Pdtch,
}

/// Uplink burst consumption for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UlKind {
    None,
    Rach,
    Data,
    Tchf,
    Tchh,
    Pdtch,
}

/// Static properties of one logical channel slot.
#[derive(Debug, Clone, Copy)]
pub struct TrxChanDesc {
    pub chan: TrxChanType,
    pub pdch: bool,
    /// RSL chan_nr base (subchannel bits included), 0 for internal channels
    pub chan_nr: u8,
    pub link_id: u8,
    pub name: &'static str,
    pub rts: RtsKind,
    pub dl: DlKind,
    pub ul: UlKind,
    /// Active without explicit channel activation
    pub auto_active: bool,
}

const fn desc(
    chan: TrxChanType,
    pdch: bool,
    chan_nr: u8,
    link_id: u8,
    name: &'static str,
    rts: RtsKind,
    dl: DlKind,
    ul: UlKind,
    auto_active: bool,
) -> TrxChanDesc {
    TrxChanDesc { chan, pdch, chan_nr, link_id, name, rts, dl, ul, auto_active }
}

use DlKind as D;
use RtsKind as R;
use TrxChanType as C;
use UlKind as U;

#[rustfmt::skip]
pub static TRX_CHAN_DESC: [TrxChanDesc; TRX_CHAN_MAX] = [
    desc(C::Idle,     false, 0x00, LID_DEDIC, "IDLE",        R::None, D::Idle,  U::None,  true),
    desc(C::Fcch,     false, 0x00, LID_DEDIC, "FCCH",        R::None, D::Fcch,  U::None,  true),
    desc(C::Sch,      false, 0x00, LID_DEDIC, "SCH",         R::None, D::Sch,   U::None,  true),
    desc(C::Bcch,     false, 0x80, LID_DEDIC, "BCCH",        R::Data, D::Data,  U::None,  true),
    desc(C::Rach,     false, 0x88, LID_DEDIC, "RACH",        R::None, D::None,  U::Rach,  true),
    desc(C::Ccch,     false, 0x90, LID_DEDIC, "CCCH",        R::Data, D::Data,  U::None,  true),
    desc(C::TchF,     false, 0x08, LID_DEDIC, "TCH/F",       R::Tchf, D::Tchf,  U::Tchf,  false),
    desc(C::TchH0,    false, 0x10, LID_DEDIC, "TCH/H(0)",    R::Tchh, D::Tchh,  U::Tchh,  false),
    desc(C::TchH1,    false, 0x18, LID_DEDIC, "TCH/H(1)",    R::Tchh, D::Tchh,  U::Tchh,  false),
    desc(C::Sdcch4_0, false, 0x20, LID_DEDIC, "SDCCH/4(0)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch4_1, false, 0x28, LID_DEDIC, "SDCCH/4(1)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch4_2, false, 0x30, LID_DEDIC, "SDCCH/4(2)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch4_3, false, 0x38, LID_DEDIC, "SDCCH/4(3)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch8_0, false, 0x40, LID_DEDIC, "SDCCH/8(0)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch8_1, false, 0x48, LID_DEDIC, "SDCCH/8(1)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch8_2, false, 0x50, LID_DEDIC, "SDCCH/8(2)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch8_3, false, 0x58, LID_DEDIC, "SDCCH/8(3)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch8_4, false, 0x60, LID_DEDIC, "SDCCH/8(4)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch8_5, false, 0x68, LID_DEDIC, "SDCCH/8(5)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch8_6, false, 0x70, LID_DEDIC, "SDCCH/8(6)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sdcch8_7, false, 0x78, LID_DEDIC, "SDCCH/8(7)",  R::Data, D::Data,  U::Data,  false),
    desc(C::SacchTF,  false, 0x08, LID_SACCH, "SACCH/TF",    R::Data, D::Data,  U::Data,  false),
    desc(C::SacchTH0, false, 0x10, LID_SACCH, "SACCH/TH(0)", R::Data, D::Data,  U::Data,  false),
    desc(C::SacchTH1, false, 0x18, LID_SACCH, "SACCH/TH(1)", R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch4_0, false, 0x20, LID_SACCH, "SACCH/4(0)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch4_1, false, 0x28, LID_SACCH, "SACCH/4(1)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch4_2, false, 0x30, LID_SACCH, "SACCH/4(2)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch4_3, false, 0x38, LID_SACCH, "SACCH/4(3)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch8_0, false, 0x40, LID_SACCH, "SACCH/8(0)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch8_1, false, 0x48, LID_SACCH, "SACCH/8(1)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch8_2, false, 0x50, LID_SACCH, "SACCH/8(2)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch8_3, false, 0x58, LID_SACCH, "SACCH/8(3)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch8_4, false, 0x60, LID_SACCH, "SACCH/8(4)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch8_5, false, 0x68, LID_SACCH, "SACCH/8(5)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch8_6, false, 0x70, LID_SACCH, "SACCH/8(6)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Sacch8_7, false, 0x78, LID_SACCH, "SACCH/8(7)",  R::Data, D::Data,  U::Data,  false),
    desc(C::Pdtch,    true,  0xc0, LID_DEDIC, "PDTCH",       R::Data, D::Pdtch, U::Pdtch, false),
    desc(C::Ptcch,    true,  0xc0, LID_DEDIC, "PTCCH",       R::Data, D::Data,  U::Data,  false),
    // CBCH holds the 0xc8 address for the layout that substitutes it for
    // SDCCH(2); none of the registered multiframes carries a CBCH frame,
    // so nothing dispatches to this slot
    desc(C::Cbch,     false, 0xc8, LID_DEDIC, "CBCH",        R::Data, D::Data,  U::None,  true),
];

impl TrxChanType {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn desc(self) -> &'static TrxChanDesc {
        &TRX_CHAN_DESC[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.desc().name
    }

    pub fn is_sacch(self) -> bool {
        self.desc().link_id == LID_SACCH
    }
}

/// RSL channel mode (TS 48.058 9.3.6 speech/data indication).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RslChanMode {
    #[default]
    SignOnly,
    Speech,
    Data,
}

/// Traffic channel codec mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TchMode {
    #[default]
    None,
    /// FR / HR (speech version 1)
    SpeechV1,
    /// EFR
    SpeechV2,
    /// AMR
    SpeechAmr,
}

/// AMR codec bookkeeping for one channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmrState {
    /// Active codec set (frame types), up to 4 entries
    pub codec: [u8; 4],
    pub codecs: u8,
    pub ul_ft: u8,
    pub dl_ft: u8,
    pub ul_cmr: u8,
    pub dl_cmr: u8,
}

/// Ciphering state for one direction.
#[derive(Debug, Clone, Copy)]
pub struct CipherState {
    pub algo: u8,
    pub key: [u8; 8],
}

/// Dynamic scheduler state of one logical channel on one timeslot.
#[derive(Debug, Default)]
pub struct ChanState {
    pub active: bool,

    /// Downlink block spread over burst payloads, present while its
    /// bursts are being played out
    pub dl_bursts: Option<Vec<Ubit>>,
    /// Current downlink block is FACCH (stealing flags set)
    pub dl_facch: bool,

    /// Uplink soft bits collected for the block in progress
    pub ul_bursts: Option<Vec<Sbit>>,
    /// Burst ids collected so far (substituted ones included)
    pub ul_mask: u8,
    /// Burst ids that carried a real (not substituted) burst
    pub ul_real_mask: u8,
    /// Frame number of burst id 0 of the block in progress
    pub ul_first_fn: u32,
    pub ul_rssi_sum: i32,
    pub ul_toa256_sum: i32,

    pub lost_frames: u32,
    pub transmitted: u32,

    pub rsl_cmode: RslChanMode,
    pub tch_mode: TchMode,
    pub amr: AmrState,

    pub dl_cipher: Option<CipherState>,
    pub ul_cipher: Option<CipherState>,

    /// Access burst detection on a dedicated channel during handover
    pub ho_rach_detect: bool,

    pub meas: MeasState,
}

impl ChanState {
    /// Wipe all dynamic state, as done on channel activation.
    pub fn reset(&mut self) {
        *self = ChanState::default();
    }

    /// Drop the uplink block in progress.
    pub fn reset_ul_block(&mut self) {
        self.ul_bursts = None;
        self.ul_mask = 0;
        self.ul_real_mask = 0;
        self.ul_rssi_sum = 0;
        self.ul_toa256_sum = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desc_indexing() {
        for (i, d) in TRX_CHAN_DESC.iter().enumerate() {
            assert_eq!(d.chan.index(), i, "descriptor order broken at {}", d.name);
        }
        assert_eq!(C::Cbch.index(), TRX_CHAN_MAX - 1);
    }

    #[test]
    fn test_sacch_link_ids() {
        assert!(C::SacchTF.is_sacch());
        assert!(C::Sacch8_5.is_sacch());
        assert!(!C::TchF.is_sacch());
        assert!(!C::Sdcch4_2.is_sacch());
    }

    #[test]
    fn test_auto_active_set() {
        let auto: Vec<&str> = TRX_CHAN_DESC.iter().filter(|d| d.auto_active).map(|d| d.name).collect();
        assert_eq!(auto, ["IDLE", "FCCH", "SCH", "BCCH", "RACH", "CCCH", "CBCH"]);
    }
}
