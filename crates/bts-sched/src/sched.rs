//! Per-TRX scheduler: timeslot configuration, channel activation and the
//! downlink/uplink entry points driven by the frame clock.

use std::collections::VecDeque;

use bts_core::chan_nr::{LID_DEDIC, cbits, tn as chan_nr_tn};
use bts_core::frame::{GSM_HYPERFRAME, fn_diff};
use bts_core::{Sbit, TRX_NR_TS, Ubit};
use bts_saps::{DlPrim, L1sapQueue};
use tracing::{debug, error, info};

use crate::chan::{AmrState, ChanState, CipherState, RslChanMode, TRX_CHAN_DESC, TRX_CHAN_MAX, TchMode, TrxChanType};
use crate::err::SchedError;
use crate::mframe::{self, Multiframe, Pchan};

/// Uplink bursts further ahead of the previous one than this skip the
/// catch-up walk; the receiver has resynced, not dropped bursts.
const SCHED_UL_CATCHUP_MAX: u32 = 10;

/// Downlink prims scheduled further ahead than this are stale.
const PRIM_FN_AHEAD_MAX: u32 = 100;

/// One demodulated uplink burst handed to the scheduler.
#[derive(Debug, Clone)]
pub struct UlBurst {
    pub tn: u8,
    pub fnr: u32,
    /// 148 soft bits, negative meaning '1', zero meaning no confidence
    pub bits: [Sbit; 148],
    pub rssi_dbm: i8,
    /// Timing offset in 1/256 symbol steps
    pub ta256: i16,
}

/// Scheduler state of one timeslot.
pub(crate) struct TsSched {
    pub(crate) tn: u8,
    pub(crate) c0: bool,
    pub(crate) tsc: u8,
    pub(crate) bsic: u8,
    pub(crate) mf: Option<&'static Multiframe>,
    pub(crate) chan_state: [ChanState; TRX_CHAN_MAX],
    pub(crate) dl_prims: VecDeque<DlPrim>,
    pub(crate) last_ul_fn: Option<u32>,
}

impl TsSched {
    fn new(tn: u8, c0: bool, tsc: u8, bsic: u8) -> TsSched {
        TsSched {
            tn,
            c0,
            tsc,
            bsic,
            mf: None,
            chan_state: core::array::from_fn(|_| ChanState::default()),
            dl_prims: VecDeque::new(),
            last_ul_fn: None,
        }
    }

    /// Match a channel number + link id against the descriptor table,
    /// honouring the PDCH-ness of the current pchan. More than one channel
    /// may share an RSL address: chan_nr 0xc0 covers both PDTCH and PTCCH.
    pub(crate) fn find_chans(&self, chan_nr: u8, link_id: u8) -> Result<Vec<TrxChanType>, SchedError> {
        if chan_nr == 0 {
            return Err(SchedError::InvalidChanNr);
        }
        let mf = self.mf.ok_or(SchedError::NoMultiframe)?;
        let pdch = mf.pchan == Pchan::Pdch;
        let mut chans = Vec::new();
        for d in &TRX_CHAN_DESC {
            // internal channels without an RSL address
            if d.chan_nr == 0 {
                continue;
            }
            if d.pdch == pdch && d.chan_nr == cbits(chan_nr) && d.link_id == (link_id & 0xc0) {
                chans.push(d.chan);
            }
        }
        if chans.is_empty() {
            return Err(SchedError::NoSuchChannel);
        }
        Ok(chans)
    }

    /// The primary channel of an RSL address.
    pub(crate) fn find_chan(&self, chan_nr: u8, link_id: u8) -> Result<TrxChanType, SchedError> {
        Ok(self.find_chans(chan_nr, link_id)?[0])
    }
}

/// The SACCH that accompanies a dedicated channel.
pub(crate) fn sacch_of(chan: TrxChanType) -> Option<TrxChanType> {
    use TrxChanType as C;
    Some(match chan {
        C::TchF => C::SacchTF,
        C::TchH0 => C::SacchTH0,
        C::TchH1 => C::SacchTH1,
        C::Sdcch4_0 => C::Sacch4_0,
        C::Sdcch4_1 => C::Sacch4_1,
        C::Sdcch4_2 => C::Sacch4_2,
        C::Sdcch4_3 => C::Sacch4_3,
        C::Sdcch8_0 => C::Sacch8_0,
        C::Sdcch8_1 => C::Sacch8_1,
        C::Sdcch8_2 => C::Sacch8_2,
        C::Sdcch8_3 => C::Sacch8_3,
        C::Sdcch8_4 => C::Sacch8_4,
        C::Sdcch8_5 => C::Sacch8_5,
        C::Sdcch8_6 => C::Sacch8_6,
        C::Sdcch8_7 => C::Sacch8_7,
        _ => return None,
    })
}

/// Burst scheduler of one transceiver. Owns the 8 timeslot states; no
/// state outside the struct. Upward primitives go into the caller's
/// [`L1sapQueue`].
pub struct TrxSched {
    pub trx_nr: u8,
    pub c0: bool,
    ts: [TsSched; TRX_NR_TS],
}

impl TrxSched {
    pub fn new(trx_nr: u8, c0: bool, tsc: u8, bsic: u8) -> TrxSched {
        TrxSched {
            trx_nr,
            c0,
            ts: core::array::from_fn(|tn| TsSched::new(tn as u8, c0, tsc, bsic)),
        }
    }

    fn ts_mut(&mut self, tn: u8) -> Result<&mut TsSched, SchedError> {
        self.ts.get_mut(tn as usize).ok_or(SchedError::InvalidChanNr)
    }

    /// Configure the physical channel of a timeslot. Resets all logical
    /// channel state on the slot.
    pub fn set_pchan(&mut self, tn: u8, pchan: Pchan) -> Result<(), SchedError> {
        let trx_nr = self.trx_nr;
        let ts = self.ts_mut(tn)?;
        let mf = mframe::find(pchan, tn).ok_or(SchedError::NoMultiframe)?;
        info!("(trx={},ts={}) configuring multiframe {}", trx_nr, tn, mf.name);
        ts.mf = Some(mf);
        for st in ts.chan_state.iter_mut() {
            st.reset();
        }
        ts.dl_prims.clear();
        ts.last_ul_fn = None;
        Ok(())
    }

    /// Activate or deactivate a logical channel. All channels sharing the
    /// RSL address are toggled together; on a PDCH timeslot that covers
    /// PDTCH and PTCCH at once.
    pub fn set_lchan(&mut self, chan_nr: u8, link_id: u8, active: bool) -> Result<(), SchedError> {
        let ts = self.ts_mut(chan_nr_tn(chan_nr))?;
        let chans = ts.find_chans(chan_nr, link_id)?;
        let mut changed = false;
        for chan in chans {
            let st = &mut ts.chan_state[chan.index()];
            if st.active == active {
                continue;
            }
            info!("(ts={}) {} {}", ts.tn, if active { "activating" } else { "deactivating" }, chan.name());
            if active {
                st.reset();
                st.active = true;
            } else {
                st.active = false;
                st.ho_rach_detect = false;
                st.dl_bursts = None;
                st.ul_bursts = None;
            }
            changed = true;
        }
        if !changed {
            return Err(SchedError::AlreadyInState);
        }
        Ok(())
    }

    /// Set the channel mode of a dedicated channel (and its SACCH). A
    /// no-op on PDCH timeslots, where the mode is implicit.
    pub fn set_mode(
        &mut self,
        chan_nr: u8,
        rsl_cmode: RslChanMode,
        tch_mode: TchMode,
        amr: AmrState,
        handover: bool,
    ) -> Result<(), SchedError> {
        let ts = self.ts_mut(chan_nr_tn(chan_nr))?;
        if ts.mf.is_some_and(|mf| mf.pchan == Pchan::Pdch) {
            return Ok(());
        }
        let chan = ts.find_chan(chan_nr, LID_DEDIC)?;
        debug!("(ts={}) set mode {:?}/{:?} handover={} on {}", ts.tn, rsl_cmode, tch_mode, handover, chan.name());
        let mut apply = |c: TrxChanType| {
            let st = &mut ts.chan_state[c.index()];
            st.rsl_cmode = rsl_cmode;
            st.tch_mode = tch_mode;
            st.amr = amr;
        };
        apply(chan);
        if let Some(sacch) = sacch_of(chan) {
            apply(sacch);
        }
        ts.chan_state[chan.index()].ho_rach_detect = handover;
        Ok(())
    }

    /// Enable or disable ciphering on one direction of a dedicated
    /// channel. Algorithm 0 disables; only A5/1 is supported.
    pub fn set_cipher(&mut self, chan_nr: u8, downlink: bool, algo: u8, key: &[u8]) -> Result<(), SchedError> {
        let ts = self.ts_mut(chan_nr_tn(chan_nr))?;
        if ts.mf.is_some_and(|mf| mf.pchan == Pchan::Pdch) {
            return Err(SchedError::CipherUnsupported);
        }
        let cs = match algo {
            0 => None,
            1 => {
                if key.len() != 8 {
                    return Err(SchedError::CipherUnsupported);
                }
                let mut k = [0u8; 8];
                k.copy_from_slice(key);
                Some(CipherState { algo, key: k })
            }
            _ => return Err(SchedError::CipherUnsupported),
        };
        let chan = ts.find_chan(chan_nr, LID_DEDIC)?;
        info!(
            "(ts={}) {} A5/{} on {} {}",
            ts.tn,
            if cs.is_some() { "enabling" } else { "disabling" },
            algo,
            chan.name(),
            if downlink { "downlink" } else { "uplink" }
        );
        let mut apply = |c: TrxChanType| {
            let st = &mut ts.chan_state[c.index()];
            if downlink {
                st.dl_cipher = cs;
            } else {
                st.ul_cipher = cs;
            }
        };
        apply(chan);
        if let Some(sacch) = sacch_of(chan) {
            apply(sacch);
        }
        Ok(())
    }

    /// Enqueue a downlink block for transmission. `cur_fn` is the frame
    /// number the scheduler is currently serving.
    pub fn dl_prim(&mut self, cur_fn: u32, prim: DlPrim) -> Result<(), SchedError> {
        let ts = self.ts_mut(chan_nr_tn(prim.chan_nr()))?;
        let ahead = fn_diff(prim.fnr(), cur_fn);
        if ahead > PRIM_FN_AHEAD_MAX && ahead < GSM_HYPERFRAME / 2 {
            error!("(ts={}) prim for fn {} is {} frames ahead of fn {}, dropping", ts.tn, prim.fnr(), ahead, cur_fn);
            return Err(SchedError::StalePrim);
        }
        ts.dl_prims.push_back(prim);
        Ok(())
    }

    /// Issue ready-to-send indications for all timeslots at the given
    /// frame number.
    pub fn rts(&mut self, fnr: u32, q: &mut L1sapQueue) {
        for ts in self.ts.iter_mut() {
            ts.rts_frame(fnr, q);
        }
    }

    /// Produce the downlink burst of one timeslot. On the C0 carrier a
    /// slot with nothing to transmit yields the dummy burst; elsewhere
    /// None keeps the transmitter off.
    pub fn dl_burst(&mut self, fnr: u32, tn: u8) -> Option<[Ubit; 148]> {
        self.ts.get_mut(tn as usize)?.dl_frame(fnr)
    }

    /// Consume one demodulated uplink burst. If the burst is up to 9
    /// frames ahead of the previous one on this slot, the skipped frame
    /// numbers are processed with synthetic no-signal bursts first so
    /// block assembly and measurement stay aligned with the frame clock.
    pub fn ul_burst(&mut self, burst: UlBurst, q: &mut L1sapQueue) {
        let Some(ts) = self.ts.get_mut(burst.tn as usize) else {
            return;
        };
        if let Some(last) = ts.last_ul_fn {
            let elapsed = fn_diff(burst.fnr, last);
            if elapsed > 1 && elapsed < SCHED_UL_CATCHUP_MAX {
                let lost = [0i8; 148];
                let mut fnr = (last + 1) % GSM_HYPERFRAME;
                while fnr != burst.fnr {
                    ts.ul_substitute(fnr, &lost, q);
                    fnr = (fnr + 1) % GSM_HYPERFRAME;
                }
            }
        }
        ts.ul_frame(burst.fnr, &burst.bits, burst.rssi_dbm, burst.ta256, false, q);
        ts.last_ul_fn = Some(burst.fnr);
    }
}
