//! Unsolicited responses for modem power state, upgrades and restarts
use atat::atat_derive::{AtatEnum, AtatResp};
use heapless::String;

/// Modem power state reported by `+SQNPSS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemStatus {
    Active = 0,
    Sleeping = 1,
}

/// Power saving status +SQNPSS
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct PowerSavingStatus {
    #[at_arg(position = 0)]
    pub status: ModemStatus,
}

/// Firmware upgrade progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpgradeEvent {
    Start,
    Success,
    Failure,
}

/// Firmware upgrade status +SQNSUPGRADE
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct UpgradeStatus {
    #[at_arg(position = 0)]
    pub phase: String<16>,
}

impl UpgradeStatus {
    /// Phases other than start and the outcome (progress reports) map to
    /// `None`.
    pub fn event(&self) -> Option<UpgradeEvent> {
        match self.phase.as_str() {
            "start" => Some(UpgradeEvent::Start),
            "success" => Some(UpgradeEvent::Success),
            "failure" | "error" => Some(UpgradeEvent::Failure),
            _ => None,
        }
    }
}
