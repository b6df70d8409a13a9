//! ### V.250 and 3GPP TS 27.007 chapter 9 - Control commands
pub mod types;

use super::NoResponse;
use atat::atat_derive::AtatCmd;
use types::{Echo, TerminationErrorMode};

/// V.250 6.2.4 Command echo E
///
/// Controls whether the modem echoes characters received from the DTE. The
/// driver switches echo off right after probing so that answer lines are never
/// preceded by the command text.
#[derive(Clone, AtatCmd)]
#[at_cmd("E", NoResponse, value_sep = false, attempts = 3, timeout_ms = 1000)]
pub struct SetEcho {
    #[at_arg(position = 0)]
    pub enabled: Echo,
}

/// 9.1 Report mobile termination error +CMEE
///
/// Configures the formatting of the result code +CME ERROR: <err> as an indication of an error relating to the
/// functionality of the MT. When enabled, MT related errors cause +CME ERROR: <err> final result code instead
/// of the regular ERROR final result code.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMEE", NoResponse, attempts = 3, timeout_ms = 1000)]
pub struct SetReportMobileTerminationError {
    #[at_arg(position = 0)]
    pub n: TerminationErrorMode,
}
