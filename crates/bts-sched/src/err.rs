use core::fmt;

/// Errors returned by scheduler operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Channel number 0 or otherwise unparseable
    InvalidChanNr,
    /// No multiframe table for the (pchan, timeslot) combination
    NoMultiframe,
    /// chan_nr/link_id does not match any channel on the slot's multiframe
    NoSuchChannel,
    /// Channel already in the requested activation state
    AlreadyInState,
    /// Cipher algorithm not supported or key length wrong
    CipherUnsupported,
    /// Downlink primitive too far in the future
    StalePrim,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::InvalidChanNr => write!(f, "invalid channel number"),
            SchedError::NoMultiframe => write!(f, "no multiframe for pchan/timeslot"),
            SchedError::NoSuchChannel => write!(f, "no matching channel on this timeslot"),
            SchedError::AlreadyInState => write!(f, "channel already in requested state"),
            SchedError::CipherUnsupported => write!(f, "cipher algorithm or key not supported"),
            SchedError::StalePrim => write!(f, "downlink primitive out of schedule range"),
        }
    }
}

impl std::error::Error for SchedError {}
