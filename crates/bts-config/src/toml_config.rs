use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use super::bts_config::{BtsConfig, CfgClock, CfgPchan, CfgTrx};

/// Build `BtsConfig` from a TOML configuration string
pub fn from_toml_str(toml_str: &str) -> Result<BtsConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.2";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if !root.trx.extra.is_empty() {
        return Err(format!("Unrecognized fields in trx: {:?}", sorted_keys(&root.trx.extra)).into());
    }
    if let Some(ref clock) = root.clock {
        if !clock.extra.is_empty() {
            return Err(format!("Unrecognized fields in clock: {:?}", sorted_keys(&clock.extra)).into());
        }
    }

    let mut cfg = BtsConfig {
        debug_log: root.debug_log,
        trx: CfgTrx::default(),
        clock: CfgClock::default(),
    };

    cfg.trx.nr = root.trx.nr;
    cfg.trx.c0 = root.trx.c0;
    if let Some(tsc) = root.trx.tsc {
        cfg.trx.tsc = tsc;
    }
    // BCC defaults to the TSC, NCC to 0
    cfg.trx.bsic = root.trx.bsic.unwrap_or(cfg.trx.tsc);
    if root.trx.timeslots.len() != 8 {
        return Err(format!("trx.timeslots must list 8 entries, got {}", root.trx.timeslots.len()).into());
    }
    for (tn, pchan) in root.trx.timeslots.iter().enumerate() {
        cfg.trx.timeslots[tn] = *pchan;
    }

    if let Some(clock) = root.clock {
        if let Some(v) = clock.rts_advance {
            cfg.clock.rts_advance = v;
        }
        if let Some(v) = clock.frame_interval_us {
            cfg.clock.frame_interval_us = v;
        }
    }

    cfg.validate().map_err(|e| e.to_string())?;
    Ok(cfg)
}

/// Build `BtsConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<BtsConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `BtsConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<BtsConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    from_reader(BufReader::new(f))
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    trx: TrxDto,

    #[serde(default)]
    clock: Option<ClockDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct TrxDto {
    nr: u8,
    c0: bool,
    tsc: Option<u8>,
    bsic: Option<u8>,
    timeslots: Vec<CfgPchan>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct ClockDto {
    rts_advance: Option<u32>,
    frame_interval_us: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"
config_version = "0.2"

[trx]
nr = 0
c0 = true
tsc = 7
timeslots = ["CCCH_SDCCH4", "SDCCH8", "TCH_F", "TCH_F", "TCH_H", "TCH_H", "PDCH", "PDCH"]

[clock]
rts_advance = 5
"#;

    #[test]
    fn test_parse_good_config() {
        let cfg = from_toml_str(GOOD).expect("config should parse");
        assert!(cfg.trx.c0);
        assert_eq!(cfg.trx.bsic, 7, "BCC defaults to the TSC");
        assert_eq!(cfg.trx.timeslots[0], CfgPchan::CcchSdcch4);
        assert_eq!(cfg.trx.timeslots[6], CfgPchan::Pdch);
        assert_eq!(cfg.clock.rts_advance, 5);
        assert_eq!(cfg.clock.frame_interval_us, 4615);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let bad = GOOD.replace("rts_advance = 5", "rts_advance = 5\nbogus = 1");
        assert!(from_toml_str(&bad).is_err());
    }

    #[test]
    fn test_reject_ccch_off_ts0() {
        let bad = GOOD.replace(
            r#"["CCCH_SDCCH4", "SDCCH8""#,
            r#"["CCCH_SDCCH4", "CCCH""#,
        );
        assert!(from_toml_str(&bad).is_err());
    }

    #[test]
    fn test_reject_bsic_tsc_mismatch() {
        let bad = GOOD.replace("tsc = 7", "tsc = 7\nbsic = 9");
        assert!(from_toml_str(&bad).is_err());
    }

    #[test]
    fn test_reject_wrong_version() {
        let bad = GOOD.replace("0.2", "0.1");
        assert!(from_toml_str(&bad).is_err());
    }
}
