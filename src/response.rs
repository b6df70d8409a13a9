use crate::command::system_features::responses::RxTxStats;
use crate::digest::FinalError;
use crate::info::SimInfo;
use crate::request::ResponseStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStatus {
    Success,
    /// The modem answered, but its firmware version or SIM identity could
    /// not be read
    Partial,
    /// The modem never answered
    Failure,
}

/// Decoded answer of a typed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseData {
    None,
    /// Signal strength in dBm, 0 when unknown
    Rssi(i8),
    /// Continuous wave reception RSSI in hundredths of dBm
    RfRssi(i32),
    RxTxStats(RxTxStats),
    SimId(SimInfo),
}

/// Completion of a user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: ResponseStatus,
    /// Answer lines, newline separated
    pub raw: &'a str,
    pub data: ResponseData,
    pub error: Option<FinalError>,
}
