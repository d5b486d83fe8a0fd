use serde::Deserialize;

/// Physical channel configuration of one timeslot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CfgPchan {
    None,
    Ccch,
    CcchSdcch4,
    Sdcch8,
    TchF,
    TchH,
    Pdch,
}

/// Per-TRX settings
#[derive(Debug, Clone)]
pub struct CfgTrx {
    /// TRX number within the BTS
    pub nr: u8,
    /// True for the C0 (BCCH carrier) transceiver
    pub c0: bool,
    /// Training sequence code, 0..7
    pub tsc: u8,
    /// Base station identity code (NCC << 3 | BCC)
    pub bsic: u8,
    /// Initial physical channel per timeslot
    pub timeslots: [CfgPchan; 8],
}

impl Default for CfgTrx {
    fn default() -> Self {
        Self {
            nr: 0,
            c0: true,
            tsc: 7,
            bsic: 7,
            timeslots: [CfgPchan::None; 8],
        }
    }
}

/// Virtual frame clock settings
#[derive(Debug, Clone)]
pub struct CfgClock {
    /// Frames the scheduler runs ahead of airtime when issuing RTS
    pub rts_advance: u32,
    /// Nominal frame interval in microseconds
    pub frame_interval_us: u64,
}

impl Default for CfgClock {
    fn default() -> Self {
        Self {
            rts_advance: 5,
            frame_interval_us: 4615,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BtsConfig {
    pub debug_log: Option<String>,
    pub trx: CfgTrx,
    pub clock: CfgClock,
}

impl BtsConfig {
    /// Validate that all required configuration fields are properly set.
    pub fn validate(&self) -> Result<(), &str> {
        if self.trx.tsc > 7 {
            return Err("trx tsc must be 0..7");
        }
        if self.trx.bsic > 0x3f {
            return Err("trx bsic must be 0..63");
        }
        // TS 45.008: the BCC part of the BSIC must equal the C0 TSC
        if self.trx.c0 && self.trx.bsic & 7 != self.trx.tsc {
            return Err("bsic BCC bits must match the trx tsc");
        }
        for (tn, pchan) in self.trx.timeslots.iter().enumerate() {
            let on_ts0 = tn == 0;
            match pchan {
                CfgPchan::Ccch | CfgPchan::CcchSdcch4 if !on_ts0 => {
                    return Err("CCCH pchan variants are only valid on timeslot 0");
                }
                _ => {}
            }
        }
        if self.trx.c0 && self.trx.timeslots[0] == CfgPchan::None {
            return Err("C0 requires a CCCH pchan on timeslot 0");
        }
        if self.clock.rts_advance == 0 || self.clock.rts_advance > 50 {
            return Err("clock rts_advance must be 1..50");
        }
        Ok(())
    }
}
