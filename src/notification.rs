//! Unsolicited events delivered to the [`EventHandler`](crate::EventHandler).

use crate::command::mobile_control::responses::UtcTime;
use crate::command::mobile_control::urc::SimStatus;
use crate::command::network_service::urc::EdrxInfo;
use crate::command::system_features::urc::ModemStatus;
use crate::registration::NetworkStatusInfo;
use crate::socket::{SocketId, SocketResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotificationKind {
    NetworkStatus,
    SimStatus,
    EdrxChange,
    SocketOpen,
    SocketClose,
    SocketRxData,
    SocketTxDone,
    UtcTime,
    ModemStatus,
    UpgradeStart,
    UpgradeSuccess,
    UpgradeFailure,
    ModemCrash,
    OpenDone,
    CloseDone,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkStatus => "network_status",
            Self::SimStatus => "sim_status",
            Self::EdrxChange => "edrx_change",
            Self::SocketOpen => "socket_open",
            Self::SocketClose => "socket_close",
            Self::SocketRxData => "socket_rx_data",
            Self::SocketTxDone => "socket_tx_done",
            Self::UtcTime => "utc_time",
            Self::ModemStatus => "modem_status",
            Self::UpgradeStart => "upgrade_start",
            Self::UpgradeSuccess => "upgrade_success",
            Self::UpgradeFailure => "upgrade_failure",
            Self::ModemCrash => "modem_crash",
            Self::OpenDone => "open_done",
            Self::CloseDone => "close_done",
        }
    }
}

/// An event from the modem or the driver. Borrowed data is only valid for
/// the duration of the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<'a> {
    NetworkStatus(NetworkStatusInfo),
    SimStatus(SimStatus),
    EdrxChange(EdrxInfo),
    SocketOpen { id: SocketId, result: SocketResult },
    SocketClose { id: SocketId, result: SocketResult },
    SocketRxData { id: SocketId, data: &'a [u8] },
    /// Completion of a `socket_send`
    SocketTxDone { id: SocketId, result: SocketResult },
    UtcTime(UtcTime),
    ModemStatus(ModemStatus),
    UpgradeStart,
    UpgradeSuccess,
    UpgradeFailure,
    /// The modem rebooted on its own while open
    ModemCrash,
    OpenDone { success: bool },
    CloseDone,
}

impl Notification<'_> {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::NetworkStatus(_) => NotificationKind::NetworkStatus,
            Self::SimStatus(_) => NotificationKind::SimStatus,
            Self::EdrxChange(_) => NotificationKind::EdrxChange,
            Self::SocketOpen { .. } => NotificationKind::SocketOpen,
            Self::SocketClose { .. } => NotificationKind::SocketClose,
            Self::SocketRxData { .. } => NotificationKind::SocketRxData,
            Self::SocketTxDone { .. } => NotificationKind::SocketTxDone,
            Self::UtcTime(_) => NotificationKind::UtcTime,
            Self::ModemStatus(_) => NotificationKind::ModemStatus,
            Self::UpgradeStart => NotificationKind::UpgradeStart,
            Self::UpgradeSuccess => NotificationKind::UpgradeSuccess,
            Self::UpgradeFailure => NotificationKind::UpgradeFailure,
            Self::ModemCrash => NotificationKind::ModemCrash,
            Self::OpenDone { .. } => NotificationKind::OpenDone,
            Self::CloseDone => NotificationKind::CloseDone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let n = Notification::SocketTxDone {
            id: SocketId::new(1).unwrap(),
            result: SocketResult::Success,
        };
        assert_eq!(n.kind(), NotificationKind::SocketTxDone);
        assert_eq!(n.kind().as_str(), "socket_tx_done");
        assert_eq!(Notification::CloseDone.kind().as_str(), "close_done");
    }
}
