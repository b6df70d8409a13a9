//! ### 3GPP TS 27.007 chapter 8 - Mobile termination control and status commands
pub mod responses;
pub mod types;
pub mod urc;

use super::NoResponse;
use atat::atat_derive::AtatCmd;
use responses::{NetworkClock, SignalQuality};
use types::Functionality;

/// 8.2 Set phone functionality +CFUN
///
/// Selects the level of functionality <fun> in the MT.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CFUN", NoResponse, attempts = 2, timeout_ms = 15000)]
pub struct SetModuleFunctionality {
    #[at_arg(position = 0)]
    pub fun: Functionality,
}

/// 8.5 Signal quality +CSQ
///
/// Returns the received signal strength indication <rssi> and the channel bit
/// error rate <ber>.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CSQ", SignalQuality, attempts = 2, timeout_ms = 1000)]
pub struct GetSignalQuality;

/// 8.15 Clock +CCLK
///
/// Reads the real time clock of the MT, synchronised from the network on
/// attach.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CCLK?", NetworkClock, attempts = 2, timeout_ms = 1000)]
pub struct GetClock;
