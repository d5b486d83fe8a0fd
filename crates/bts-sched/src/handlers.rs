//! Per-frame handlers: ready-to-send, downlink burst production and
//! uplink burst consumption, dispatched on the channel descriptor kinds.

use bts_core::a5;
use bts_core::burst::{BURST_PAYLOAD_LEN, DUMMY_BURST, FCCH_BURST, GSM_BURST_LEN, SCH_TRAIN, normal_burst};
use bts_core::chan_nr::LID_DEDIC;
use bts_core::frame::{GSM_HYPERFRAME, GsmTime, fn_diff};
use bts_core::{Sbit, Ubit};
use bts_saps::{DlPrim, L1sapQueue, L1sapUp, MphMeasInd, PhDataInd, PhRachInd, PhRtsInd, TchInd, TchRtsInd};
use tracing::{debug, trace, warn};

use crate::chan::{DlKind, RslChanMode, RtsKind, TrxChanDesc, TrxChanType, UlKind};
use crate::meas::{MeasLchan, MeasLchanKind, UlMeas};
use crate::mframe::{MfEntry, Multiframe, Pchan};
use crate::sched::TsSched;

/// Bits in a 4-burst block.
const BLOCK_LEN: usize = 4 * BURST_PAYLOAD_LEN;
/// Bits in a 2-burst half-rate frame.
const HALF_LEN: usize = 2 * BURST_PAYLOAD_LEN;

/// Unpack a MAC block into transmit bits, MSB first, zero padded.
fn unpack_block(data: &[u8], nbits: usize) -> Vec<Ubit> {
    let mut bits = vec![0u8; nbits];
    for (i, bit) in bits.iter_mut().enumerate() {
        let byte = i / 8;
        if byte < data.len() {
            *bit = (data[byte] >> (7 - i % 8)) & 1;
        }
    }
    bits
}

/// Hard-decide soft bits into packed bytes, MSB first. Negative soft
/// bits decode as '1'.
fn pack_block(soft: &[Sbit]) -> Vec<u8> {
    let mut data = vec![0u8; soft.len().div_ceil(8)];
    for (i, &s) in soft.iter().enumerate() {
        if s < 0 {
            data[i / 8] |= 1 << (7 - i % 8);
        }
    }
    data
}

/// BER proxy: the fraction of zero-confidence soft bits, in steps of .01%.
fn soft_ber10k(bits: &[Sbit]) -> u16 {
    let zeros = bits.iter().filter(|&&b| b == 0).count();
    (zeros * 10000 / bits.len()) as u16
}

/// The lchan whose measurement accumulator a received block feeds, with
/// its kind and subslot. SACCH blocks count towards the main channel.
fn meas_chan(chan: TrxChanType) -> Option<(TrxChanType, MeasLchanKind, u8)> {
    use MeasLchanKind as K;
    use TrxChanType as C;
    Some(match chan {
        C::TchF | C::SacchTF => (C::TchF, K::TchF, 0),
        C::TchH0 | C::SacchTH0 => (C::TchH0, K::TchH, 0),
        C::TchH1 | C::SacchTH1 => (C::TchH1, K::TchH, 1),
        C::Sdcch4_0 | C::Sacch4_0 => (C::Sdcch4_0, K::Sdcch, 0),
        C::Sdcch4_1 | C::Sacch4_1 => (C::Sdcch4_1, K::Sdcch, 1),
        C::Sdcch4_2 | C::Sacch4_2 => (C::Sdcch4_2, K::Sdcch, 2),
        C::Sdcch4_3 | C::Sacch4_3 => (C::Sdcch4_3, K::Sdcch, 3),
        C::Sdcch8_0 | C::Sacch8_0 => (C::Sdcch8_0, K::Sdcch, 0),
        C::Sdcch8_1 | C::Sacch8_1 => (C::Sdcch8_1, K::Sdcch, 1),
        C::Sdcch8_2 | C::Sacch8_2 => (C::Sdcch8_2, K::Sdcch, 2),
        C::Sdcch8_3 | C::Sacch8_3 => (C::Sdcch8_3, K::Sdcch, 3),
        C::Sdcch8_4 | C::Sacch8_4 => (C::Sdcch8_4, K::Sdcch, 4),
        C::Sdcch8_5 | C::Sacch8_5 => (C::Sdcch8_5, K::Sdcch, 5),
        C::Sdcch8_6 | C::Sacch8_6 => (C::Sdcch8_6, K::Sdcch, 6),
        C::Sdcch8_7 | C::Sacch8_7 => (C::Sdcch8_7, K::Sdcch, 7),
        _ => return None,
    })
}

impl TsSched {
    /// Ready-to-send for one timeslot at one frame number. Only the frame
    /// carrying burst id 0 of a block raises an indication.
    pub(crate) fn rts_frame(&mut self, fnr: u32, q: &mut L1sapQueue) {
        let Some(mf) = self.mf else { return };
        let ent = mf.dl(fnr);
        if ent.bid != 0 {
            return;
        }
        let desc = ent.chan.desc();
        let st = &self.chan_state[ent.chan.index()];
        if !(st.active || desc.auto_active) {
            debug!("(ts={}) no RTS for inactive {} at fn={}", self.tn, desc.name, fnr);
            return;
        }
        let chan_nr = desc.chan_nr | self.tn;
        match desc.rts {
            RtsKind::None => {}
            RtsKind::Data => {
                q.push(L1sapUp::PhRtsInd(PhRtsInd { chan_nr, link_id: desc.link_id, tn: self.tn, fnr }));
            }
            RtsKind::Tchf | RtsKind::Tchh => {
                // TCH/H spreads FACCH over two half-rate frames, so only
                // every second frame may start one
                let facch = desc.rts == RtsKind::Tchf || ((fnr % 26) >> 2) & 1 == 1;
                if facch {
                    q.push(L1sapUp::PhRtsInd(PhRtsInd { chan_nr, link_id: LID_DEDIC, tn: self.tn, fnr }));
                }
                if st.rsl_cmode != RslChanMode::SignOnly {
                    q.push(L1sapUp::TchRtsInd(TchRtsInd { chan_nr, tn: self.tn, fnr }));
                }
            }
        }
    }

    /// Produce the downlink burst of this slot for one frame number.
    pub(crate) fn dl_frame(&mut self, fnr: u32) -> Option<[Ubit; GSM_BURST_LEN]> {
        let mf = self.mf?;
        let ent = mf.dl(fnr);
        let bits = match ent.chan.desc().dl {
            DlKind::None | DlKind::Idle => None,
            DlKind::Fcch => Some(FCCH_BURST),
            DlKind::Sch => Some(self.sch_burst(fnr)),
            DlKind::Data | DlKind::Pdtch => self.dl_data(ent, fnr),
            DlKind::Tchf | DlKind::Tchh => self.dl_tch(ent, fnr),
        };
        match bits {
            Some(b) => Some(b),
            // C0 must radiate on every slot
            None if self.c0 => Some(DUMMY_BURST),
            None => None,
        }
    }

    /// SCH burst: BSIC and reduced frame number in the two 39-bit data
    /// fields around the extended training sequence.
    fn sch_burst(&self, fnr: u32) -> [Ubit; GSM_BURST_LEN] {
        let t = GsmTime::new(fnr);
        let t3p = t.t3().saturating_sub(1) / 10;
        let fields = [(self.bsic as u32, 6u32), (t.t1(), 11), (t.t2(), 5), (t3p, 3)];
        let mut data = [0u8; 78];
        let mut pos = 0;
        for (val, len) in fields {
            for b in (0..len).rev() {
                data[pos] = ((val >> b) & 1) as u8;
                pos += 1;
            }
        }
        let mut burst = [0u8; GSM_BURST_LEN];
        burst[3..42].copy_from_slice(&data[..39]);
        burst[42..106].copy_from_slice(&SCH_TRAIN);
        burst[106..145].copy_from_slice(&data[39..]);
        burst
    }

    /// Data-type downlink: fetch the queued block at burst id 0, then play
    /// out one quarter of it per burst. Control channel bursts carry set
    /// stealing flags.
    fn dl_data(&mut self, ent: MfEntry, fnr: u32) -> Option<[Ubit; GSM_BURST_LEN]> {
        let desc = ent.chan.desc();
        let idx = ent.chan.index();
        if !(self.chan_state[idx].active || desc.auto_active) {
            return None;
        }
        if ent.bid == 0 {
            let prim = self.dequeue_prim(fnr, desc, false);
            let st = &mut self.chan_state[idx];
            match prim {
                Some(p) => {
                    st.dl_bursts = Some(unpack_block(p.data(), BLOCK_LEN));
                    st.dl_facch = true;
                    st.transmitted += 1;
                }
                None => {
                    trace!("(ts={}) no block for {} at fn={}", self.tn, desc.name, fnr);
                    st.dl_bursts = None;
                }
            }
        }
        self.burst_from_block(idx, ent.bid, fnr)
    }

    /// TCH downlink: a queued FACCH block steals the traffic frame,
    /// otherwise the traffic frame is sent. TCH/F frames fill a 4-burst
    /// block, TCH/H frames a 2-burst pair.
    fn dl_tch(&mut self, ent: MfEntry, fnr: u32) -> Option<[Ubit; GSM_BURST_LEN]> {
        let desc = ent.chan.desc();
        let idx = ent.chan.index();
        if !self.chan_state[idx].active {
            return None;
        }
        if ent.bid == 0 {
            let nbits = if desc.dl == DlKind::Tchh { HALF_LEN } else { BLOCK_LEN };
            let (block, facch) = if let Some(p) = self.dequeue_prim(fnr, desc, false) {
                (Some(unpack_block(p.data(), nbits)), true)
            } else if let Some(p) = self.dequeue_prim(fnr, desc, true) {
                (Some(unpack_block(p.data(), nbits)), false)
            } else {
                trace!("(ts={}) no frame for {} at fn={}", self.tn, desc.name, fnr);
                (None, false)
            };
            let st = &mut self.chan_state[idx];
            st.dl_facch = facch;
            if block.is_some() {
                st.transmitted += 1;
            }
            st.dl_bursts = block;
        }
        self.burst_from_block(idx, ent.bid, fnr)
    }

    /// One burst out of the channel's pending block, ciphered if enabled.
    /// The buffer is released after its last burst.
    fn burst_from_block(&mut self, idx: usize, bid: u8, fnr: u32) -> Option<[Ubit; GSM_BURST_LEN]> {
        let tsc = self.tsc as usize;
        let st = &mut self.chan_state[idx];
        let buf = st.dl_bursts.as_ref()?;
        let off = bid as usize * BURST_PAYLOAD_LEN;
        let h = st.dl_facch as u8;
        let mut burst = normal_burst(&buf[off..off + 57], &buf[off + 57..off + BURST_PAYLOAD_LEN], h, h, tsc);
        if off + BURST_PAYLOAD_LEN == buf.len() {
            st.dl_bursts = None;
        }
        if let Some(cs) = st.dl_cipher
            && let Some((dl, _)) = a5::keystream(cs.algo, &cs.key, GsmTime::new(fnr))
        {
            for i in 0..57 {
                burst[3 + i] ^= dl[i];
                burst[88 + i] ^= dl[57 + i];
            }
        }
        Some(burst)
    }

    /// Catch-up substitution for a frame number that never got a burst
    /// from the receiver. RACH and handover-detection channels are left
    /// alone; a missing access burst is simply no access.
    pub(crate) fn ul_substitute(&mut self, fnr: u32, bits: &[Sbit; GSM_BURST_LEN], q: &mut L1sapQueue) {
        let Some(mf) = self.mf else { return };
        let ent = mf.ul(fnr);
        if ent.chan.desc().ul == UlKind::Rach || self.chan_state[ent.chan.index()].ho_rach_detect {
            return;
        }
        debug!("(ts={}) substituting lost uplink burst at fn={}", self.tn, fnr);
        self.ul_frame(fnr, bits, -128, 0, true, q);
    }

    /// Consume one uplink burst for this slot.
    pub(crate) fn ul_frame(
        &mut self,
        fnr: u32,
        bits: &[Sbit; GSM_BURST_LEN],
        rssi_dbm: i8,
        ta256: i16,
        synthetic: bool,
        q: &mut L1sapQueue,
    ) {
        let Some(mf) = self.mf else { return };
        let ent = mf.ul(fnr);
        match ent.chan.desc().ul {
            UlKind::None => {}
            UlKind::Rach => self.ul_rach(ent, fnr, bits, rssi_dbm, ta256, synthetic, q),
            UlKind::Data | UlKind::Tchf | UlKind::Tchh | UlKind::Pdtch => {
                self.ul_block(mf, ent, fnr, bits, rssi_dbm, ta256, synthetic, q)
            }
        }
    }

    fn ul_rach(
        &mut self,
        ent: MfEntry,
        fnr: u32,
        bits: &[Sbit; GSM_BURST_LEN],
        rssi_dbm: i8,
        ta256: i16,
        synthetic: bool,
        q: &mut L1sapQueue,
    ) {
        if synthetic {
            return;
        }
        let desc = ent.chan.desc();
        if !(self.chan_state[ent.chan.index()].active || desc.auto_active) {
            return;
        }
        q.push(L1sapUp::PhRachInd(PhRachInd {
            chan_nr: desc.chan_nr | self.tn,
            tn: self.tn,
            fnr,
            rssi_dbm,
            ber10k: soft_ber10k(bits),
            ta256,
            is_handover: false,
        }));
    }

    /// Block-assembling uplink path shared by data, SACCH, TCH and PDTCH
    /// channels. Bursts are collected by burst id; the last burst id
    /// (3, or 1 for a TCH/H pair) closes the block, raises the upward
    /// indication and feeds the measurement accumulator.
    #[allow(clippy::too_many_arguments)]
    fn ul_block(
        &mut self,
        mf: &'static Multiframe,
        ent: MfEntry,
        fnr: u32,
        bits: &[Sbit; GSM_BURST_LEN],
        rssi_dbm: i8,
        ta256: i16,
        synthetic: bool,
        q: &mut L1sapQueue,
    ) {
        let desc = ent.chan.desc();
        let idx = ent.chan.index();
        let tn = self.tn;
        let st = &mut self.chan_state[idx];
        if !(st.active || desc.auto_active) {
            return;
        }
        if st.ho_rach_detect {
            // The MS accesses the new channel with access bursts; report
            // them instead of assembling blocks.
            if !synthetic {
                q.push(L1sapUp::PhRachInd(PhRachInd {
                    chan_nr: desc.chan_nr | tn,
                    tn,
                    fnr,
                    rssi_dbm,
                    ber10k: soft_ber10k(bits),
                    ta256,
                    is_handover: true,
                }));
            }
            return;
        }

        let nbits = if desc.ul == UlKind::Tchh { HALF_LEN } else { BLOCK_LEN };
        let last_bid = (nbits / BURST_PAYLOAD_LEN - 1) as u8;
        if ent.bid == 0 {
            st.reset_ul_block();
            st.ul_bursts = Some(vec![0i8; nbits]);
            st.ul_first_fn = fnr;
        }
        let Some(buf) = st.ul_bursts.as_mut() else {
            // joined mid-block, wait for the next burst id 0
            return;
        };
        let off = ent.bid as usize * BURST_PAYLOAD_LEN;
        buf[off..off + 57].copy_from_slice(&bits[3..60]);
        buf[off + 57..off + BURST_PAYLOAD_LEN].copy_from_slice(&bits[88..145]);
        if let Some(cs) = st.ul_cipher
            && let Some((_, ul)) = a5::keystream(cs.algo, &cs.key, GsmTime::new(fnr))
        {
            for (b, &k) in buf[off..off + BURST_PAYLOAD_LEN].iter_mut().zip(ul.iter()) {
                if k == 1 {
                    *b = -*b;
                }
            }
        }
        st.ul_mask |= 1 << ent.bid;
        if !synthetic {
            st.ul_real_mask |= 1 << ent.bid;
            st.ul_rssi_sum += rssi_dbm as i32;
            st.ul_toa256_sum += ta256 as i32;
        }
        if ent.bid != last_bid {
            return;
        }

        // block complete
        if st.ul_mask != (1 << (last_bid + 1)) - 1 {
            debug!("(ts={}) {} block at fn={} incomplete, mask 0x{:x}", tn, desc.name, st.ul_first_fn, st.ul_mask);
        }
        let Some(buf) = st.ul_bursts.take() else { return };
        let first_fn = st.ul_first_fn;
        let real = st.ul_real_mask.count_ones() as i32;
        let ber10k = soft_ber10k(&buf);
        let (rssi, ta) = if real > 0 {
            ((st.ul_rssi_sum / real) as i8, (st.ul_toa256_sum / real) as i16)
        } else {
            (-128, 0)
        };
        if real == 0 {
            st.lost_frames += last_bid as u32 + 1;
            warn!("(ts={}) {} block at fn={} lost entirely", tn, desc.name, first_fn);
        }
        let real_mask = st.ul_real_mask;
        st.reset_ul_block();

        if real_mask != 0 {
            let data = pack_block(&buf);
            let chan_nr = desc.chan_nr | tn;
            match desc.ul {
                UlKind::Tchf | UlKind::Tchh => q.push(L1sapUp::TchInd(TchInd {
                    chan_nr,
                    tn,
                    fnr: first_fn,
                    data,
                    rssi_dbm: rssi,
                    ber10k,
                    ta256: ta,
                })),
                _ => q.push(L1sapUp::PhDataInd(PhDataInd {
                    chan_nr,
                    link_id: desc.link_id,
                    tn,
                    fnr: first_fn,
                    data,
                    rssi_dbm: rssi,
                    ber10k,
                    ta256: ta,
                })),
            }
        }

        let m = UlMeas { ber10k, ta256: ta, inv_rssi: (-(rssi as i32)).clamp(0, 255) as u8, is_sub: false };
        self.feed_meas(mf, ent.chan, first_fn, m, q);
    }

    fn feed_meas(&mut self, mf: &'static Multiframe, chan: TrxChanType, block_fn: u32, m: UlMeas, q: &mut L1sapQueue) {
        if !matches!(mf.pchan, Pchan::TchF | Pchan::TchH | Pchan::Sdcch8 | Pchan::CcchSdcch4) {
            return;
        }
        let Some((target, kind, subslot)) = meas_chan(chan) else { return };
        let tidx = target.index();
        if !self.chan_state[tidx].active {
            return;
        }
        let lchan = MeasLchan {
            pchan: mf.pchan,
            tn: self.tn,
            subslot,
            kind,
            tch_mode: self.chan_state[tidx].tch_mode,
        };
        if let Some(result) = self.chan_state[tidx].meas.process(&lchan, mf, m, block_fn) {
            q.push(L1sapUp::MphMeasInd(MphMeasInd {
                chan_nr: target.desc().chan_nr | self.tn,
                tn: self.tn,
                fnr: block_fn,
                result,
            }));
        }
    }

    /// Pull the block scheduled for (chan, fn) out of the prim queue.
    /// Past prims for any channel are discarded on the way.
    fn dequeue_prim(&mut self, fnr: u32, desc: &TrxChanDesc, tch: bool) -> Option<DlPrim> {
        let mut i = 0;
        while i < self.dl_prims.len() {
            let p = &self.dl_prims[i];
            let age = fn_diff(fnr, p.fnr());
            if age != 0 && age < GSM_HYPERFRAME / 2 {
                warn!("(ts={}) dropping prim for past fn={} at fn={}", self.tn, p.fnr(), fnr);
                self.dl_prims.remove(i);
                continue;
            }
            let matches = match p {
                DlPrim::Data(d) => {
                    !tch && bts_core::chan_nr::cbits(d.chan_nr) == desc.chan_nr && (d.link_id & 0xc0) == desc.link_id
                }
                DlPrim::Tch(t) => tch && bts_core::chan_nr::cbits(t.chan_nr) == desc.chan_nr,
            };
            if matches && age == 0 {
                return self.dl_prims.remove(i);
            }
            i += 1;
        }
        None
    }
}
