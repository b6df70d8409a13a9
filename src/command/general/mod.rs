//! ### 3GPP TS 27.007 chapter 5 - General commands
pub mod responses;

use atat::atat_derive::AtatCmd;
use responses::{CardIdentification, FirmwareRevision, Imsi};

/// 5.3 Request revision identification +CGMR
///
/// Returns the firmware version of the modem, e.g. `LR8.2.1.0-61488`.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGMR", FirmwareRevision, attempts = 3, timeout_ms = 1000)]
pub struct GetFirmwareVersion;

/// 5.6 Request international mobile subscriber identity +CIMI
///
/// Reads the IMSI of the SIM. Requires the SIM to be powered, i.e. the modem
/// in airplane or full functionality.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIMI", Imsi, attempts = 2, timeout_ms = 2000)]
pub struct GetIMSI;

/// Read card identification +SQNCCID
///
/// Returns the ICCID and, for eUICC cards, the EUICCID.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNCCID?", CardIdentification, attempts = 2, timeout_ms = 2000)]
pub struct GetCCID;
