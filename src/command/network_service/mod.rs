//! ### 3GPP TS 27.007 chapter 7 - Network service related commands
pub mod types;
pub mod urc;

use super::NoResponse;
use atat::atat_derive::AtatCmd;
use types::{EdrxActType, EdrxMode, OperatorFormat, OperatorSelectionMode, PsmMode};

/// 7.3 PLMN selection +COPS
///
/// Forces an attempt to select and register with the GSM/LTE network operator,
/// that can be chosen in the list of network operators returned by the test
/// command. Manual selection is only used when the configuration names an
/// operator for the active SIM slot.
#[derive(Clone, AtatCmd)]
#[at_cmd("+COPS", NoResponse, attempts = 1, timeout_ms = 180000)]
pub struct SetOperatorSelection<'a> {
    #[at_arg(position = 0)]
    pub mode: OperatorSelectionMode,
    #[at_arg(position = 1)]
    pub format: Option<OperatorFormat>,
    #[at_arg(position = 2, len = 32)]
    pub oper: Option<&'a str>,
}

/// 7.38 Power saving mode setting +CPSMS
///
/// Requests the network to apply the given periodic TAU and active time.
/// Unused GERAN/UTRAN timers are left empty.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CPSMS", NoResponse, attempts = 2, timeout_ms = 5000)]
pub struct SetPowerSavingMode<'a> {
    #[at_arg(position = 0)]
    pub mode: PsmMode,
    #[at_arg(position = 1, len = 8)]
    pub requested_periodic_rau: Option<&'a str>,
    #[at_arg(position = 2, len = 8)]
    pub requested_gprs_ready_timer: Option<&'a str>,
    #[at_arg(position = 3, len = 8)]
    pub requested_periodic_tau: Option<&'a str>,
    #[at_arg(position = 4, len = 8)]
    pub requested_active_time: Option<&'a str>,
}

/// 7.40 eDRX setting +CEDRXS
///
/// With mode 2 the modem additionally reports network provided values
/// through the +CEDRXP URC.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CEDRXS", NoResponse, attempts = 2, timeout_ms = 5000)]
pub struct SetEdrx<'a> {
    #[at_arg(position = 0)]
    pub mode: EdrxMode,
    #[at_arg(position = 1)]
    pub act_type: EdrxActType,
    #[at_arg(position = 2, len = 4)]
    pub requested_edrx_value: &'a str,
}

/// Paging time window and eDRX setting +SQNPTWEDRXS
///
/// Sequans extension of +CEDRXS that also requests a paging time window.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNPTWEDRXS", NoResponse, attempts = 2, timeout_ms = 5000)]
pub struct SetPtwEdrx<'a> {
    #[at_arg(position = 0)]
    pub mode: EdrxMode,
    #[at_arg(position = 1)]
    pub act_type: EdrxActType,
    #[at_arg(position = 2, len = 4)]
    pub requested_ptw: &'a str,
    #[at_arg(position = 3, len = 4)]
    pub requested_edrx_value: &'a str,
}
