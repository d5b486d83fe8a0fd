//! Uplink measurement processing (TS 45.008 clause 8).
//!
//! Collects per-block uplink measurement samples for each active lchan,
//! detects the end of the reporting interval from the frame number and
//! computes the FULL/SUB averages reported via MPH-MEAS.ind.

use bts_saps::{MeasResult, ToaExt};
use tracing::{debug, error, warn};

use crate::chan::TchMode;
use crate::mframe::{Multiframe, Pchan};

/* Tables as per TS 45.008 Section 8.3: frames whose blocks a DTX
 * transmitter must always send (the "-SUB" set), besides the SACCH. */
const TS45008_83_TCH_F: [u8; 8] = [52, 53, 54, 55, 56, 57, 58, 59];
const TS45008_83_TCH_HS0: [u8; 8] = [0, 2, 4, 6, 52, 54, 56, 58];
const TS45008_83_TCH_HS1: [u8; 8] = [14, 16, 18, 20, 66, 68, 70, 72];

/// 100% BER, assumed for blocks that never arrived
pub const MEASUREMENT_DUMMY_BER: u16 = 10000;
/// noise floor in -dBm
pub const MEASUREMENT_DUMMY_IRSSI: u8 = 109;

/* Measurement reporting period and mapping of the SACCH message block for
 * TCH/F and TCH/H, as per 3GPP TS 45.008 section 8.4.1.
 *
 *             Timeslot number (TN)        TDMA frame number (FN) modulo 104
 *             Half rate,    Half rate,     Reporting    SACCH
 * Full Rate   subch.0       subch.1        period       Message block
 * 0           0 and 1                      0 to 103     12,  38,  64,  90
 * 1                         0 and 1        13 to 12     25,  51,  77,  103
 * 2           2 and 3                      26 to 25     38,  64,  90,  12
 * 3                         2 and 3        39 to 38     51,  77,  103, 25
 * 4           4 and 5                      52 to 51     64,  90,  12,  38
 * 5                         4 and 5        65 to 64     77,  103, 25,  51
 * 6           6 and 7                      78 to 77     90,  12,  38,  64
 * 7                         6 and 7        91 to 90     103, 25,  51,  77
 *
 * The array index of the following three lookup tables is the timeslot. */
const TCHF_MEAS_REP_FN104_BY_TS: [u8; 8] = [90, 103, 12, 25, 38, 51, 64, 77];
const TCHH0_MEAS_REP_FN104_BY_TS: [u8; 8] = [90, 90, 12, 12, 38, 38, 64, 64];
const TCHH1_MEAS_REP_FN104_BY_TS: [u8; 8] = [103, 103, 25, 25, 51, 51, 77, 77];

/* Measurement reporting period for SDCCH/8 and SDCCH/4, as per 3GPP
 * TS 45.008 section 8.4.2: SDCCH/8 runs fn%102 = 12 to 11, SDCCH/4 runs
 * 37 to 36. The array index is the subslot number. */

/// FN of the first burst whose block completes before reaching fn%102=11
const SDCCH8_MEAS_REP_FN102_BY_SS: [u8; 8] = [
    66, /* 15(SDCCH), 47(SACCH), 66(SDCCH) */
    70, /* 19(SDCCH), 51(SACCH), 70(SDCCH) */
    74, /* 23(SDCCH), 55(SACCH), 74(SDCCH) */
    78, /* 27(SDCCH), 59(SACCH), 78(SDCCH) */
    98, /* 31(SDCCH), 98(SACCH), 82(SDCCH) */
    0,  /* 35(SDCCH),  0(SACCH), 86(SDCCH) */
    4,  /* 39(SDCCH),  4(SACCH), 90(SDCCH) */
    8,  /* 43(SDCCH),  8(SACCH), 94(SDCCH) */
];

/// FN of the first burst whose block completes before reaching fn%102=37
const SDCCH4_MEAS_REP_FN102_BY_SS: [u8; 4] = [
    88, /* 37(SDCCH), 57(SACCH), 88(SDCCH) */
    92, /* 41(SDCCH), 61(SACCH), 92(SDCCH) */
    6,  /*  6(SACCH), 47(SDCCH), 98(SDCCH) */
    10, /* 10(SACCH),  0(SDCCH), 51(SDCCH) */
];

/* The measurement results are reported via the SACCH, whose block
 * alignment does not match the measurement interval. When the SACCH block
 * arrives, the interval it reports on has already ended one block ago.
 * E.g. a measurement indication on FN%104=38 in TS=2 reports the interval
 * that really ended on FN%104=12, which is the value to look for in
 * TCHF_MEAS_REP_FN104_BY_TS. See TS 45.002 clause 7 table 1 of 9. */
fn translate_tch_meas_rep_fn104(fn_mod: u32) -> u32 {
    match fn_mod {
        25 => 103,
        38 => 12,
        51 => 25,
        64 => 38,
        77 => 51,
        90 => 64,
        103 => 77,
        12 => 90,
        // Invalid / not of interest
        _ => 0,
    }
}

/// What kind of lchan the measurements belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasLchanKind {
    TchF,
    TchH,
    Sdcch,
}

/// Identity of the measured lchan, resolved by the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct MeasLchan {
    pub pchan: Pchan,
    pub tn: u8,
    /// Subslot within the pchan (TCH/H subchannel, SDCCH subslot)
    pub subslot: u8,
    pub kind: MeasLchanKind,
    pub tch_mode: TchMode,
}

/// One uplink measurement sample, taken per received (or lost) block.
#[derive(Debug, Clone, Copy)]
pub struct UlMeas {
    /// BER in steps of .01%
    pub ber10k: u16,
    /// Burst timing offset in 1/256 symbol steps
    pub ta256: i16,
    /// RSSI magnitude in -dBm
    pub inv_rssi: u8,
    pub is_sub: bool,
}

const MEASUREMENT_DUMMY: UlMeas = UlMeas {
    ber10k: MEASUREMENT_DUMMY_BER,
    ta256: 0,
    inv_rssi: MEASUREMENT_DUMMY_IRSSI,
    is_sub: false,
};

/// Decide if a given frame number is part of the "-SUB" measurements.
/// SACCH frames always are; for voice modes the TS 45.008 8.3 frames are
/// added; signalling on TCH/H and SDCCH have no DTX, so SUB equals FULL.
pub fn ts45008_83_is_sub(lchan: &MeasLchan, mf: &Multiframe, fnr: u32) -> bool {
    let fn104 = (fnr % 104) as u8;

    match lchan.kind {
        MeasLchanKind::TchF => match lchan.tch_mode {
            TchMode::None | TchMode::SpeechV1 | TchMode::SpeechV2 => {
                mf.is_sacch(fnr, true) || TS45008_83_TCH_F.contains(&fn104)
            }
            // AMR SID_UPDATE frames are tagged by the lower layers
            TchMode::SpeechAmr => mf.is_sacch(fnr, true),
        },
        MeasLchanKind::TchH => match lchan.tch_mode {
            TchMode::SpeechV1 => {
                let tbl = if lchan.subslot == 0 { &TS45008_83_TCH_HS0 } else { &TS45008_83_TCH_HS1 };
                mf.is_sacch(fnr, true) || tbl.contains(&fn104)
            }
            TchMode::SpeechAmr => mf.is_sacch(fnr, true),
            // No DTX allowed; SUB=FULL
            TchMode::None => true,
            TchMode::SpeechV2 => {
                error!("unsupported tch_mode {:?} on TCH/H", lchan.tch_mode);
                false
            }
        },
        // No DTX allowed; SUB=FULL
        MeasLchanKind::Sdcch => true,
    }
}

/// Determine if a measurement period ends at the given frame number.
pub fn is_meas_complete(lchan: &MeasLchan, fnr: u32) -> bool {
    let tn = lchan.tn as usize;
    match lchan.pchan {
        Pchan::TchF => {
            let fn_mod = translate_tch_meas_rep_fn104(fnr % 104);
            TCHF_MEAS_REP_FN104_BY_TS[tn] as u32 == fn_mod
        }
        Pchan::TchH => {
            let fn_mod = translate_tch_meas_rep_fn104(fnr % 104);
            let tbl = if lchan.subslot == 0 { &TCHH0_MEAS_REP_FN104_BY_TS } else { &TCHH1_MEAS_REP_FN104_BY_TS };
            tbl[tn] as u32 == fn_mod
        }
        Pchan::Sdcch8 => SDCCH8_MEAS_REP_FN102_BY_SS[lchan.subslot as usize] as u32 == fnr % 102,
        Pchan::CcchSdcch4 => SDCCH4_MEAS_REP_FN102_BY_SS[lchan.subslot as usize] as u32 == fnr % 102,
        _ => false,
    }
}

fn modulus_by_lchan(lchan: &MeasLchan) -> u32 {
    match lchan.pchan {
        Pchan::TchF | Pchan::TchH => 104,
        Pchan::Sdcch8 | Pchan::CcchSdcch4 => 102,
        _ => 1,
    }
}

/// Samples expected per interval, fixed by the slot layout.
fn num_expected(lchan: &MeasLchan) -> usize {
    match lchan.pchan {
        // 24 (half-)blocks for TCH + 1 for SACCH
        Pchan::TchF | Pchan::TchH => 25,
        // 2 for SDCCH + 1 for SACCH
        Pchan::Sdcch8 | Pchan::CcchSdcch4 => 3,
        _ => 0,
    }
}

/// SUB samples expected per interval. AMR uses a dynamic number of DTX
/// blocks, which this lookup cannot express; that case yields None.
fn sub_num_expected(lchan: &MeasLchan) -> Option<usize> {
    if lchan.tch_mode == TchMode::SpeechAmr {
        return None;
    }
    match lchan.pchan {
        // 1 block SACCH, 2 blocks TCH
        Pchan::TchF => Some(3),
        // 1 block SACCH, 4 half-blocks TCH
        Pchan::TchH => Some(5),
        // no DTX here, all blocks must be present
        Pchan::Sdcch8 | Pchan::CcchSdcch4 => Some(3),
        _ => Some(0),
    }
}

/// BER (in steps of .01%) to the eight RxQual levels of TS 45.008 8.2.4.
pub fn ber10k_to_rxqual(ber10k: u32) -> u8 {
    if ber10k < 20 {
        return 0;
    }
    if ber10k < 40 {
        return 1;
    }
    if ber10k < 80 {
        return 2;
    }
    if ber10k < 160 {
        return 3;
    }
    if ber10k < 320 {
        return 4;
    }
    if ber10k < 640 {
        return 5;
    }
    if ber10k < 1280 {
        return 6;
    }
    7
}

/// Received level in dBm to the RXLEV scale of TS 45.008 8.1.4.
pub fn dbm2rxlev(dbm: i32) -> u8 {
    (dbm + 110).clamp(0, 63) as u8
}

fn isqrt32(x: u32) -> u32 {
    let mut rem = x;
    let mut res = 0u32;
    let mut bit = 1u32 << 30;
    while bit > rem {
        bit >>= 2;
    }
    while bit != 0 {
        if rem >= res + bit {
            rem -= res + bit;
            res = (res >> 1) + bit;
        } else {
            res >>= 1;
        }
        bit >>= 2;
    }
    res
}

/// Measurement accumulator of one lchan.
#[derive(Debug, Default)]
pub struct MeasState {
    samples: Vec<UlMeas>,
    /// Mean TOA of the previous interval, fallback when an interval had
    /// no real samples and mean input for the extended statistics
    ms_toa256: i16,
}

impl MeasState {
    pub fn num_ul_meas(&self) -> usize {
        self.samples.len()
    }

    /// Add one uplink measurement sample. Samples beyond the interval's
    /// expected count are dropped.
    pub fn record(&mut self, lchan: &MeasLchan, mf: &Multiframe, mut m: UlMeas, fnr: u32) {
        let fn_mod = fnr % modulus_by_lchan(lchan);

        if self.samples.len() >= num_expected(lchan) {
            warn!("no space for uplink measurement, num_ul_meas={}, fn_mod={}", self.samples.len(), fn_mod);
            return;
        }

        // Lower layers tag AMR SID_UPDATE frames as SUB themselves; here
        // only the static TS 45.008 rules are applied on top.
        if !m.is_sub {
            m.is_sub = ts45008_83_is_sub(lchan, mf, fnr);
        }

        debug!(
            "adding measurement (is_sub={}), num_ul_meas={}, fn_mod={}",
            m.is_sub,
            self.samples.len(),
            fn_mod
        );

        self.samples.push(m);
    }

    /// Record a sample and compute the interval result if the sample's
    /// frame number ends a reporting interval.
    pub fn process(&mut self, lchan: &MeasLchan, mf: &Multiframe, m: UlMeas, fnr: u32) -> Option<MeasResult> {
        self.record(lchan, mf, m, fnr);
        self.check_compute(lchan, fnr)
    }

    /// Compute the interval averages if `fnr` ends a reporting interval.
    /// Missing samples are padded with worst-case dummies for the BER
    /// averages; RSSI and TOA are averaged over real samples only, since
    /// a made-up value would distort them.
    pub fn check_compute(&mut self, lchan: &MeasLchan, fnr: u32) -> Option<MeasResult> {
        if !is_meas_complete(lchan, fnr) {
            return None;
        }

        let num_ul_meas_expect = num_expected(lchan);
        let num_meas_sub_expect = match sub_num_expected(lchan) {
            Some(n) => n,
            None => {
                // See the AMR DTX note at sub_num_expected()
                warn!("expected SUB count not available for AMR, assuming 0");
                0
            }
        };

        debug!("received {} UL measurements, expected {}", self.samples.len(), num_ul_meas_expect);

        let mut ber_full_sum: u32 = 0;
        let mut irssi_full_sum: u32 = 0;
        let mut ber_sub_sum: u32 = 0;
        let mut irssi_sub_sum: u32 = 0;
        let mut ta256_sum: i32 = 0;
        let mut num_meas_sub = 0usize;
        let mut num_meas_sub_actual = 0usize;
        let mut num_meas_sub_subst = 0usize;
        let mut num_ul_meas_actual = 0usize;
        let mut num_ul_meas_subst = 0usize;

        // Step 1: add up. Always compute over a full interval; once the
        // received samples run out, continue with dummies. A missing
        // sample means the block itself was lost, so 100% BER holds.
        for i in 0..num_ul_meas_expect {
            let (m, is_sub) = if i < self.samples.len() {
                let m = &self.samples[i];
                if m.is_sub {
                    irssi_sub_sum += m.inv_rssi as u32;
                    num_meas_sub_actual += 1;
                }
                irssi_full_sum += m.inv_rssi as u32;
                ta256_sum += m.ta256 as i32;
                num_ul_meas_actual += 1;
                (m, m.is_sub)
            } else {
                // Tag trailing dummies as SUB while the interval still
                // owes SUB samples, so the SUB average stays complete.
                let is_sub = num_ul_meas_expect - i <= num_meas_sub_expect - num_meas_sub;
                if is_sub {
                    num_meas_sub_subst += 1;
                }
                num_ul_meas_subst += 1;
                (&MEASUREMENT_DUMMY, is_sub)
            };

            ber_full_sum += m.ber10k as u32;
            if is_sub {
                num_meas_sub += 1;
                ber_sub_sum += m.ber10k as u32;
            }
        }

        debug!(
            "interval had {} SUB measurements (expected {}), {} substituted ({} as SUB)",
            num_meas_sub_actual, num_meas_sub_expect, num_ul_meas_subst, num_meas_sub_subst
        );

        if sub_num_expected(lchan).is_some() && num_meas_sub != num_meas_sub_expect {
            // The padding above can only add missing SUB samples; it can
            // neither remove excess ones nor add any once the interval is
            // full. Ending up here means the is_sub tagging is wrong.
            error!("incorrect number of SUB measurements: {} != {}", num_meas_sub, num_meas_sub_expect);
        }

        // Step 2: divide
        let ber_full = ber_full_sum / num_ul_meas_expect as u32;
        let irssi_full = if num_ul_meas_actual == 0 {
            MEASUREMENT_DUMMY_IRSSI as u32
        } else {
            irssi_full_sum / num_ul_meas_actual as u32
        };
        let toa256_mean = if num_ul_meas_actual == 0 {
            self.ms_toa256
        } else {
            (ta256_sum / num_ul_meas_actual as i32) as i16
        };
        let ber_sub = if num_meas_sub == 0 {
            MEASUREMENT_DUMMY_BER as u32
        } else {
            ber_sub_sum / num_meas_sub as u32
        };
        let irssi_sub = if num_meas_sub_actual == 0 {
            MEASUREMENT_DUMMY_IRSSI as u32
        } else {
            irssi_sub_sum / num_meas_sub_actual as u32
        };

        self.ms_toa256 = toa256_mean;
        let toa_ext = self.compute_extended();

        let res = MeasResult {
            rxlev_full: dbm2rxlev(-(irssi_full as i32)),
            rxqual_full: ber10k_to_rxqual(ber_full),
            rxlev_sub: dbm2rxlev(-(irssi_sub as i32)),
            rxqual_sub: ber10k_to_rxqual(ber_sub),
            toa256_mean,
            toa_ext,
            num_real_samples: num_ul_meas_actual as u16,
        };

        tracing::info!(
            "computed TA256({}) BER-FULL({}.{:02}%) RSSI-FULL(-{}dBm) BER-SUB({}.{:02}%) RSSI-SUB(-{}dBm)",
            toa256_mean,
            ber_full / 100,
            ber_full % 100,
            irssi_full,
            ber_sub / 100,
            ber_sub % 100,
            irssi_sub
        );

        self.samples.clear();
        Some(res)
    }

    /// TOA min/max and standard deviation over the received samples.
    /// Returns None for an interval without real samples; with the signal
    /// gone there is nothing to report.
    fn compute_extended(&self) -> Option<ToaExt> {
        if self.samples.is_empty() {
            return None;
        }

        let mut toa256_min = i16::MAX;
        let mut toa256_max = i16::MIN;
        // each squared difference fits 32 bits, their sum does not
        let mut sq_diff_sum: u64 = 0;

        for m in &self.samples {
            let diff = (m.ta256 as i32 - self.ms_toa256 as i32).unsigned_abs();
            sq_diff_sum += (diff * diff) as u64;
            toa256_min = toa256_min.min(m.ta256);
            toa256_max = toa256_max.max(m.ta256);
        }

        let variance = sq_diff_sum / self.samples.len() as u64;
        Some(ToaExt {
            toa256_min,
            toa256_max,
            toa256_std_dev: isqrt32(variance as u32) as u16,
        })
    }
}
