use clap::Parser;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bts_config::{BtsConfig, CfgPchan, toml_config};
use bts_core::debug;
use bts_core::frame::{GSM_HYPERFRAME, fn_add};
use bts_saps::{L1sapQueue, L1sapUp};
use bts_sched::{Pchan, TrxSched};
use tracing::{debug as log_debug, info, warn};

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> BtsConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

fn pchan_of(cfg: CfgPchan) -> Option<Pchan> {
    match cfg {
        CfgPchan::None => None,
        CfgPchan::Ccch => Some(Pchan::Ccch),
        CfgPchan::CcchSdcch4 => Some(Pchan::CcchSdcch4),
        CfgPchan::Sdcch8 => Some(Pchan::Sdcch8),
        CfgPchan::TchF => Some(Pchan::TchF),
        CfgPchan::TchH => Some(Pchan::TchH),
        CfgPchan::Pdch => Some(Pchan::Pdch),
    }
}

/// Configure a scheduler from the static TRX settings.
fn build_sched(cfg: &BtsConfig) -> TrxSched {
    let trx = &cfg.trx;
    let mut sched = TrxSched::new(trx.nr, trx.c0, trx.tsc, trx.bsic);
    for (tn, &slot) in trx.timeslots.iter().enumerate() {
        if let Some(pchan) = pchan_of(slot)
            && let Err(e) = sched.set_pchan(tn as u8, pchan)
        {
            warn!("(ts={}) cannot configure pchan: {}", tn, e);
        }
    }
    sched
}

/// Run the scheduler against a free-running frame clock until shutdown.
/// Every tick issues ready-to-send ahead of airtime and produces the
/// downlink bursts of the current frame.
fn run_clock(cfg: &BtsConfig, mut sched: TrxSched, running: Arc<AtomicBool>) {
    let interval = Duration::from_micros(cfg.clock.frame_interval_us);
    let rts_advance = cfg.clock.rts_advance;
    let mut q = L1sapQueue::new();
    let mut fnr: u32 = 0;
    let mut next = Instant::now();

    info!(
        "starting virtual frame clock, interval {}us, rts_advance {}",
        cfg.clock.frame_interval_us, rts_advance
    );
    while running.load(Ordering::SeqCst) {
        sched.rts(fn_add(fnr, rts_advance), &mut q);
        for tn in 0..8u8 {
            sched.dl_burst(fnr, tn);
        }
        for msg in q.drain() {
            // No upper layer attached: RTS goes unanswered, C0 slots fall
            // back to dummy bursts
            log_debug!("fn={} upward {}", fnr, msg);
            if let L1sapUp::PhRachInd(ind) = msg {
                info!("RACH on ts {} at fn {}", ind.tn, ind.fnr);
            }
        }
        fnr = (fnr + 1) % GSM_HYPERFRAME;
        next += interval;
        let now = Instant::now();
        if next > now {
            std::thread::sleep(next - now);
        } else {
            // fell behind, resynchronize the tick base
            next = now;
        }
    }
    info!("frame clock stopped at fn {}", fnr);
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "GSM BTS L1 scheduler on a virtual frame clock",
    long_about = "Runs the burst scheduler against a free-running TDMA clock using the provided TOML configuration file"
)]
struct Args {
    /// Config file (required)
    #[arg(help = "TOML config with TRX/timeslot parameters")]
    config: String,
}

fn main() {
    let args = Args::parse();
    let cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.debug_log.clone());

    let sched = build_sched(&cfg);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("failed to set Ctrl+C handler");

    run_clock(&cfg, sched, running);
}
