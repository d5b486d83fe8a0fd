//! Scenario tests driving the scheduler through activation, RTS, burst
//! production and uplink block assembly.

use bts_core::burst::{DUMMY_BURST, FCCH_BURST, TSC};
use bts_core::chan_nr;
use bts_sched::chan::{AmrState, RslChanMode, TchMode};
use bts_sched::{Pchan, SchedError, TrxSched, UlBurst};
use bts_saps::{DlPrim, L1sapQueue, L1sapUp, PhDataReq, TchReq};

fn strong_burst() -> [i8; 148] {
    // all payload bits decode as '1' with full confidence
    let mut bits = [0i8; 148];
    for i in (3..60).chain(88..145) {
        bits[i] = -127;
    }
    bits
}

fn ul(tn: u8, fnr: u32, bits: [i8; 148]) -> UlBurst {
    UlBurst { tn, fnr, bits, rssi_dbm: -70, ta256: 128 }
}

#[test]
fn test_bcch_rts_and_burst_flow() {
    let _guard = bts_core::debug::setup_logging_default(None);
    let mut sched = TrxSched::new(0, true, 2, 5);
    let mut q = L1sapQueue::new();
    sched.set_pchan(0, Pchan::Ccch).unwrap();

    // FCCH and SCH frames raise no RTS
    sched.rts(0, &mut q);
    sched.rts(1, &mut q);
    assert!(q.is_empty());

    // BCCH block starts at fn 2
    sched.rts(2, &mut q);
    match q.pop() {
        Some(L1sapUp::PhRtsInd(rts)) => {
            assert_eq!(rts.chan_nr, chan_nr::bcch(0));
            assert_eq!(rts.fnr, 2);
        }
        other => panic!("expected PhRtsInd, got {other:?}"),
    }

    let prim = DlPrim::Data(PhDataReq { chan_nr: chan_nr::bcch(0), link_id: 0, fnr: 2, data: vec![0xff; 23] });
    sched.dl_prim(2, prim).unwrap();

    assert_eq!(sched.dl_burst(0, 0), Some(FCCH_BURST));

    let b = sched.dl_burst(2, 0).expect("BCCH burst");
    assert_eq!(&b[3..60], &[1u8; 57][..], "first 57 block bits are ones");
    assert_eq!(b[60], 1, "stealing flag set on control channels");
    assert_eq!(&b[61..87], &TSC[2][..]);
    for f in 3..=5 {
        assert!(sched.dl_burst(f, 0).is_some());
    }

    // no CCCH block queued: C0 fills with the dummy burst
    assert_eq!(sched.dl_burst(6, 0), Some(DUMMY_BURST));
}

#[test]
fn test_rts_requires_activation() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(1, Pchan::Sdcch8).unwrap();

    // SDCCH/8(0) block starts at fn 0
    sched.rts(0, &mut q);
    assert!(q.is_empty());

    sched.set_lchan(chan_nr::sdcch8(0, 1), 0, true).unwrap();
    sched.rts(0, &mut q);
    assert_eq!(q.len(), 1);
}

#[test]
fn test_tch_rts_modes() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(2, Pchan::TchF).unwrap();
    let cn = chan_nr::tchf(2);
    sched.set_lchan(cn, 0, true).unwrap();

    // signalling only: FACCH RTS, no TCH RTS
    sched.rts(0, &mut q);
    assert_eq!(q.len(), 1);
    assert!(matches!(q.pop(), Some(L1sapUp::PhRtsInd(_))));

    sched.set_mode(cn, RslChanMode::Speech, TchMode::SpeechV1, AmrState::default(), false).unwrap();
    sched.rts(0, &mut q);
    let kinds: Vec<String> = q.drain().map(|m| m.to_string()).collect();
    assert_eq!(kinds, ["PhRtsInd", "TchRtsInd"]);
}

#[test]
fn test_tchh_facch_rts_every_second_frame() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(4, Pchan::TchH).unwrap();
    sched.set_lchan(chan_nr::tchh(0, 4), 0, true).unwrap();

    // subchannel 0 frames start at fn%26 = 0, 4, 8, 13, 17, 21; FACCH
    // may only begin on every second one
    sched.rts(0, &mut q);
    assert!(q.is_empty(), "fn 0: (0 >> 2) & 1 == 0, no FACCH slot");
    sched.rts(4, &mut q);
    assert_eq!(q.len(), 1, "fn 4: (4 >> 2) & 1 == 1, FACCH slot");
    q.drain().for_each(drop);
    sched.rts(8, &mut q);
    assert!(q.is_empty(), "fn 8: (8 >> 2) & 1 == 0, no FACCH slot");
    sched.rts(13, &mut q);
    assert_eq!(q.len(), 1, "fn 13: (13 >> 2) & 1 == 1, FACCH slot");
}

#[test]
fn test_tchh_uplink_pair_assembly() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(4, Pchan::TchH).unwrap();
    let cn = chan_nr::tchh(0, 4);
    sched.set_lchan(cn, 0, true).unwrap();
    sched.set_mode(cn, RslChanMode::Speech, TchMode::SpeechV1, AmrState::default(), false).unwrap();

    // one half-rate frame spans the two bursts at fn 0 and 2
    sched.ul_burst(ul(4, 0, strong_burst()), &mut q);
    assert!(q.is_empty());
    sched.ul_burst(ul(4, 2, strong_burst()), &mut q);
    match q.pop() {
        Some(L1sapUp::TchInd(ind)) => {
            assert_eq!(ind.chan_nr, cn);
            assert_eq!(ind.fnr, 0);
            // 228 bits of ones pack into 28 full bytes plus 4 high bits
            assert_eq!(ind.data.len(), 29);
            assert_eq!(&ind.data[..28], &[0xff; 28][..]);
            assert_eq!(ind.data[28], 0xf0);
            assert_eq!(ind.ber10k, 0);
        }
        other => panic!("expected TchInd, got {other:?}"),
    }
}

#[test]
fn test_sdcch_uplink_block_assembly() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(1, Pchan::Sdcch8).unwrap();
    sched.set_lchan(chan_nr::sdcch8(0, 1), 0, true).unwrap();

    // SDCCH/8(0) uplink block occupies fn 15..=18
    for f in 15..=18 {
        sched.ul_burst(ul(1, f, strong_burst()), &mut q);
    }
    match q.pop() {
        Some(L1sapUp::PhDataInd(ind)) => {
            assert_eq!(ind.chan_nr, chan_nr::sdcch8(0, 1));
            assert_eq!(ind.fnr, 15, "block carries the fn of its first burst");
            assert_eq!(ind.data, vec![0xff; 57]);
            assert_eq!(ind.ber10k, 0);
            assert_eq!(ind.rssi_dbm, -70);
            assert_eq!(ind.ta256, 128);
        }
        other => panic!("expected PhDataInd, got {other:?}"),
    }
}

#[test]
fn test_uplink_catchup_substitution() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(1, Pchan::Sdcch8).unwrap();
    sched.set_lchan(chan_nr::sdcch8(0, 1), 0, true).unwrap();

    // bursts 16 and 17 never arrive; the fn 18 burst triggers the walk
    sched.ul_burst(ul(1, 15, strong_burst()), &mut q);
    sched.ul_burst(ul(1, 18, strong_burst()), &mut q);
    match q.pop() {
        Some(L1sapUp::PhDataInd(ind)) => {
            assert_eq!(ind.fnr, 15);
            // half the block is zero-confidence filler
            assert_eq!(ind.ber10k, 5000);
            // RSSI/TOA averaged over the two real bursts only
            assert_eq!(ind.rssi_dbm, -70);
            assert_eq!(ind.ta256, 128);
        }
        other => panic!("expected PhDataInd, got {other:?}"),
    }
}

#[test]
fn test_resync_gap_skips_substitution() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(1, Pchan::Sdcch8).unwrap();
    sched.set_lchan(chan_nr::sdcch8(0, 1), 0, true).unwrap();

    sched.ul_burst(ul(1, 15, strong_burst()), &mut q);
    // 102 frames later: a fresh block starts, the old one is abandoned
    sched.ul_burst(ul(1, 15 + 102, strong_burst()), &mut q);
    assert!(q.is_empty(), "abandoned block must not be emitted");
}

#[test]
fn test_rach_ind() {
    let mut sched = TrxSched::new(0, true, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(0, Pchan::Ccch).unwrap();

    sched.ul_burst(ul(0, 27, strong_burst()), &mut q);
    match q.pop() {
        Some(L1sapUp::PhRachInd(ind)) => {
            assert_eq!(ind.chan_nr, chan_nr::rach(0));
            assert_eq!(ind.fnr, 27);
            assert!(!ind.is_handover);
        }
        other => panic!("expected PhRachInd, got {other:?}"),
    }
}

#[test]
fn test_handover_rach_detection() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(2, Pchan::TchF).unwrap();
    let cn = chan_nr::tchf(2);
    sched.set_lchan(cn, 0, true).unwrap();
    sched.set_mode(cn, RslChanMode::Speech, TchMode::SpeechV1, AmrState::default(), true).unwrap();

    sched.ul_burst(ul(2, 0, strong_burst()), &mut q);
    match q.pop() {
        Some(L1sapUp::PhRachInd(ind)) => {
            assert_eq!(ind.chan_nr, cn);
            assert!(ind.is_handover);
        }
        other => panic!("expected handover PhRachInd, got {other:?}"),
    }
}

#[test]
fn test_tch_dl_facch_steals_block() {
    let mut sched = TrxSched::new(0, false, 3, 0);
    sched.set_pchan(2, Pchan::TchF).unwrap();
    let cn = chan_nr::tchf(2);
    sched.set_lchan(cn, 0, true).unwrap();
    sched.set_mode(cn, RslChanMode::Speech, TchMode::SpeechV1, AmrState::default(), false).unwrap();

    sched.dl_prim(0, DlPrim::Tch(TchReq { chan_nr: cn, fnr: 0, data: vec![0x55; 33] })).unwrap();
    let b = sched.dl_burst(0, 2).expect("speech burst");
    assert_eq!((b[60], b[87]), (0, 0), "speech bursts carry clear stealing flags");

    sched.dl_prim(4, DlPrim::Data(PhDataReq { chan_nr: cn, link_id: 0, fnr: 4, data: vec![0xaa; 23] })).unwrap();
    sched.dl_prim(4, DlPrim::Tch(TchReq { chan_nr: cn, fnr: 4, data: vec![0x55; 33] })).unwrap();
    let b = sched.dl_burst(4, 2).expect("FACCH burst");
    assert_eq!((b[60], b[87]), (1, 1), "FACCH steals with set flags");
    // 0xaa pattern, MSB first
    assert_eq!(&b[3..11], &[1, 0, 1, 0, 1, 0, 1, 0]);
}

#[test]
fn test_non_c0_stays_quiet() {
    let mut sched = TrxSched::new(1, false, 1, 0);
    sched.set_pchan(1, Pchan::Sdcch8).unwrap();
    assert_eq!(sched.dl_burst(48, 1), None, "idle frame on non-C0");
    assert_eq!(sched.dl_burst(0, 1), None, "inactive channel on non-C0");

    let mut c0 = TrxSched::new(0, true, 1, 0);
    c0.set_pchan(1, Pchan::Sdcch8).unwrap();
    assert_eq!(c0.dl_burst(48, 1), Some(DUMMY_BURST));
}

#[test]
fn test_pdch_activation_includes_ptcch() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(5, Pchan::Pdch).unwrap();
    let cn = chan_nr::pdtch(5);

    // fn 12 is the first PTCCH frame of the 104-multiframe
    sched.rts(12, &mut q);
    assert!(q.is_empty(), "no RTS before activation");

    sched.set_lchan(cn, 0, true).unwrap();
    sched.rts(0, &mut q);
    match q.pop() {
        Some(L1sapUp::PhRtsInd(rts)) => assert_eq!((rts.chan_nr, rts.fnr), (cn, 0)),
        other => panic!("expected PDTCH PhRtsInd, got {other:?}"),
    }
    sched.rts(12, &mut q);
    match q.pop() {
        Some(L1sapUp::PhRtsInd(rts)) => assert_eq!((rts.chan_nr, rts.fnr), (cn, 12)),
        other => panic!("expected PTCCH PhRtsInd, got {other:?}"),
    }
}

#[test]
fn test_dl_cipher_changes_payload_only() {
    let key = [0x12, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];
    let mut plain = TrxSched::new(0, false, 1, 0);
    let mut ciphered = TrxSched::new(0, false, 1, 0);
    for s in [&mut plain, &mut ciphered] {
        s.set_pchan(1, Pchan::Sdcch8).unwrap();
        s.set_lchan(chan_nr::sdcch8(0, 1), 0, true).unwrap();
    }
    ciphered.set_cipher(chan_nr::sdcch8(0, 1), true, 1, &key).unwrap();

    for s in [&mut plain, &mut ciphered] {
        let prim = DlPrim::Data(PhDataReq { chan_nr: chan_nr::sdcch8(0, 1), link_id: 0, fnr: 0, data: vec![0x2b; 23] });
        s.dl_prim(0, prim).unwrap();
    }
    let a = plain.dl_burst(0, 1).unwrap();
    let b = ciphered.dl_burst(0, 1).unwrap();
    assert_ne!(a[3..60], b[3..60]);
    assert_eq!(a[60..88], b[60..88], "flags and training sequence untouched");
    assert_ne!(a[88..145], b[88..145]);
    assert_eq!(a[..3], b[..3]);
    assert_eq!(a[145..], b[145..]);
}

#[test]
fn test_ul_cipher_roundtrip() {
    // bursts ciphered with the uplink keystream decode back to the clear
    // block once uplink deciphering is enabled
    use bts_core::a5;
    use bts_core::frame::GsmTime;

    let key = [0x02, 0x46, 0x8a, 0xce, 0x13, 0x57, 0x9b, 0xdf];
    let cn = chan_nr::sdcch8(0, 1);
    let mut rx = TrxSched::new(0, false, 1, 0);
    rx.set_pchan(1, Pchan::Sdcch8).unwrap();
    rx.set_lchan(cn, 0, true).unwrap();
    rx.set_cipher(cn, false, 1, &key).unwrap();

    let mut q = L1sapQueue::new();
    // clear block is all ones; apply the uplink keystream by hand for the
    // SDCCH/8(0) block at fn 15..=18
    for f in 15..=18u32 {
        let (_, ks) = a5::keystream(1, &key, GsmTime::new(f)).expect("A5/1 keystream");
        let mut soft = [0i8; 148];
        for i in 0..57 {
            soft[3 + i] = if ks[i] == 1 { 127 } else { -127 };
            soft[88 + i] = if ks[57 + i] == 1 { 127 } else { -127 };
        }
        rx.ul_burst(ul(1, f, soft), &mut q);
    }
    match q.pop() {
        Some(L1sapUp::PhDataInd(ind)) => {
            assert_eq!(ind.data, vec![0xff; 57], "deciphered block is all ones");
            assert_eq!(ind.ber10k, 0);
        }
        other => panic!("expected PhDataInd, got {other:?}"),
    }
}

#[test]
fn test_dl_ul_payload_roundtrip() {
    use rand::{Rng, SeedableRng};

    // bursts produced for the air interface reassemble into the original
    // MAC block on the receive side
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    for _ in 0..16 {
        let payload: Vec<u8> = (0..23).map(|_| rng.random()).collect();
        let cn = chan_nr::sdcch8(0, 1);
        let mut tx = TrxSched::new(0, false, 1, 0);
        let mut rx = TrxSched::new(0, false, 1, 0);
        for s in [&mut tx, &mut rx] {
            s.set_pchan(1, Pchan::Sdcch8).unwrap();
            s.set_lchan(cn, 0, true).unwrap();
        }
        tx.dl_prim(0, DlPrim::Data(PhDataReq { chan_nr: cn, link_id: 0, fnr: 0, data: payload.clone() }))
            .unwrap();

        let mut q = L1sapQueue::new();
        for f in 0..4u32 {
            let burst = tx.dl_burst(f, 1).expect("downlink burst");
            let mut soft = [0i8; 148];
            for (s, &b) in soft.iter_mut().zip(burst.iter()) {
                *s = if b == 1 { -127 } else { 127 };
            }
            // the uplink copy of this block sits 15 frames later
            rx.ul_burst(ul(1, 15 + f, soft), &mut q);
        }
        match q.pop() {
            Some(L1sapUp::PhDataInd(ind)) => {
                assert_eq!(&ind.data[..23], &payload[..]);
                assert_eq!(&ind.data[23..], &[0u8; 34][..], "unfilled block bits decode as zeros");
                assert_eq!(ind.ber10k, 0);
            }
            other => panic!("expected PhDataInd, got {other:?}"),
        }
    }
}

#[test]
fn test_measurement_report_end_to_end() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(2, Pchan::TchF).unwrap();
    let cn = chan_nr::tchf(2);
    sched.set_lchan(cn, 0, true).unwrap();
    sched.set_lchan(cn, 0x40, true).unwrap();
    sched.set_mode(cn, RslChanMode::Speech, TchMode::SpeechV1, AmrState::default(), false).unwrap();

    let mut reports = Vec::new();
    for f in 0..=520u32 {
        sched.ul_burst(ul(2, f, strong_burst()), &mut q);
        for msg in q.drain() {
            if let L1sapUp::MphMeasInd(ind) = msg {
                reports.push(ind);
            }
        }
    }
    assert!(reports.len() >= 3, "expected repeated measurement intervals, got {}", reports.len());
    let last = reports.last().unwrap();
    assert_eq!(last.chan_nr, cn);
    // full interval: 24 TCH blocks + 1 SACCH block, all real
    assert_eq!(last.result.num_real_samples, 25);
    assert_eq!(last.result.rxqual_full, 0);
    assert_eq!(last.result.rxqual_sub, 0);
    assert_eq!(last.result.rxlev_full, 40, "-70 dBm maps to rxlev 40");
    assert_eq!(last.result.toa256_mean, 128);
    let ext = last.result.toa_ext.expect("real samples present");
    assert_eq!(ext.toa256_min, 128);
    assert_eq!(ext.toa256_max, 128);
    assert_eq!(ext.toa256_std_dev, 0);
}

#[test]
fn test_measurement_degrades_with_lost_blocks() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(1, Pchan::Sdcch8).unwrap();
    let cn = chan_nr::sdcch8(0, 1);
    sched.set_lchan(cn, 0, true).unwrap();
    sched.set_lchan(cn, 0x40, true).unwrap();

    // run two full 102-frame cycles of all-zero bursts at noise-floor
    // RSSI: every block decodes as 100% zero-confidence bits
    let silent = [0i8; 148];
    let mut reports = Vec::new();
    for f in 0..=204u32 {
        sched.ul_burst(UlBurst { tn: 1, fnr: f, bits: silent, rssi_dbm: -110, ta256: 0 }, &mut q);
        for msg in q.drain() {
            if let L1sapUp::MphMeasInd(ind) = msg {
                reports.push(ind);
            }
        }
    }
    assert!(!reports.is_empty());
    let last = reports.last().unwrap();
    assert_eq!(last.result.rxqual_full, 7, "all-zero soft bits read as 100% BER");
}

#[test]
fn test_deactivated_channel_ignores_uplink() {
    let mut sched = TrxSched::new(0, false, 1, 0);
    let mut q = L1sapQueue::new();
    sched.set_pchan(1, Pchan::Sdcch8).unwrap();
    let cn = chan_nr::sdcch8(0, 1);
    sched.set_lchan(cn, 0, true).unwrap();
    sched.set_lchan(cn, 0, false).unwrap();

    for f in 15..=18 {
        sched.ul_burst(ul(1, f, strong_burst()), &mut q);
    }
    assert!(q.is_empty());
    assert_eq!(sched.set_lchan(cn, 0, false), Err(SchedError::AlreadyInState));
}
