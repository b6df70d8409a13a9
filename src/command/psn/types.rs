//! Argument and parameter types used by Packet domain Commands and Responses

use atat::atat_derive::AtatEnum;

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum GPRSAttachedState {
    Detached = 0,
    Attached = 1,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum EPSNetworkRegistrationUrcConfig {
    /// Network registration URC disabled
    UrcDisabled = 0,
    /// Network registration URC +CEREG: <stat> enabled
    UrcEnabled = 1,
    /// Network registration and location information URC enabled
    UrcVerbose = 2,
    /// As 2, plus the EMM cause value
    UrcVerboseCause = 3,
    /// As 2, plus the PSM timers granted by the network
    UrcPsm = 4,
    /// As 4, plus the EMM cause value
    UrcPsmCause = 5,
}
