//! ### 3GPP TS 27.007 chapter 10 - Packet domain commands
pub mod types;
pub mod urc;

use super::NoResponse;
use atat::atat_derive::AtatCmd;
use types::{EPSNetworkRegistrationUrcConfig, GPRSAttachedState};

/// 10.1.1 Define PDP context +CGDCONT
///
/// Defines the connection parameters for a PDP context, identified by the
/// local context identification parameter <cid>.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGDCONT", NoResponse, attempts = 2, timeout_ms = 5000)]
pub struct SetPDPContextDefinition<'a> {
    #[at_arg(position = 0)]
    pub cid: u8,
    #[at_arg(position = 1, len = 6)]
    pub pdp_type: &'a str,
    #[at_arg(position = 2, len = 32)]
    pub apn: &'a str,
}

/// 10.1.9 PS attach or detach +CGATT
///
/// Attaches the MT to, or detaches the MT from, the packet domain service.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGATT", NoResponse, attempts = 1, timeout_ms = 180000)]
pub struct SetGPRSAttached {
    #[at_arg(position = 0)]
    pub state: GPRSAttachedState,
}

/// 10.1.22 EPS network registration status +CEREG
///
/// Configures the network registration information. Level 4 reports the
/// serving cell, the reject cause and the PSM timers granted by the network.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CEREG", NoResponse, attempts = 2, timeout_ms = 1000)]
pub struct SetEPSNetworkRegistrationStatus {
    #[at_arg(position = 0)]
    pub n: EPSNetworkRegistrationUrcConfig,
}
