use heapless::String;

use crate::command::general::responses::{
    CardIdentification, FirmwareVersion, EUICCID_MAX_LEN, ICCID_MAX_LEN, IMSI_MAX_LEN,
};
use crate::command::mobile_control::urc::SimStatus;
use crate::command::network_service::urc::EdrxInfo;
use crate::config::{OpenMode, SimSlot};
use crate::digest::FinalError;
use crate::power::Usage;
use crate::registration::NetworkStatusInfo;
use crate::state::DriverState;

/// SIM identity. Every field is filled independently, as soon as the modem
/// reported it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimInfo {
    pub slot: SimSlot,
    pub status: Option<SimStatus>,
    pub iccid: Option<String<ICCID_MAX_LEN>>,
    pub euiccid: Option<String<EUICCID_MAX_LEN>>,
    pub imsi: Option<String<IMSI_MAX_LEN>>,
}

impl SimInfo {
    pub(crate) fn set_card(&mut self, card: CardIdentification) {
        self.iccid = Some(card.iccid);
        self.euiccid = card.euiccid;
    }

    /// ICCID and IMSI are both known.
    pub fn is_complete(&self) -> bool {
        self.iccid.is_some() && self.imsi.is_some()
    }
}

/// Snapshot returned by [`Driver::get_info`](crate::Driver::get_info).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    pub state: DriverState,
    pub modem_on: bool,
    /// The modem answered at `HwConfig::HIGH_BAUD_RATE`
    pub high_speed_uart: bool,
    pub open_mode: OpenMode,
    pub psm_enabled: bool,
    pub network: NetworkStatusInfo,
    pub edrx: Option<EdrxInfo>,
    pub sim: SimInfo,
    pub usage: Usage,
    pub firmware: Option<FirmwareVersion>,
    pub busy: bool,
    /// Most recent error result code returned by the modem
    pub last_error: Option<FinalError>,
}
