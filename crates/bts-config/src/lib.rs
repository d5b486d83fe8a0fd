//! TOML-backed configuration for the BTS scheduler binaries.

pub mod bts_config;
pub mod toml_config;

pub use bts_config::{BtsConfig, CfgClock, CfgPchan, CfgTrx};
