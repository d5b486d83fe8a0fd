//! L1SAP primitives exchanged between the burst scheduler and the MAC.

pub mod l1sap;

pub use l1sap::*;
