//! Layer-1 burst scheduler and uplink measurement engine.
//!
//! The scheduler maps TDMA frame numbers onto logical channels per
//! timeslot, produces downlink bursts from queued MAC blocks and
//! consumes demodulated uplink bursts into blocks and measurements.

pub mod chan;
pub mod err;
pub mod handlers;
pub mod meas;
pub mod mframe;
pub mod sched;

pub use chan::{ChanState, TrxChanType};
pub use err::SchedError;
pub use mframe::{Multiframe, Pchan};
pub use sched::{TrxSched, UlBurst};
