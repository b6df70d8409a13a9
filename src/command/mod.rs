//! AT Commands for the Sequans GM02S modem\
//! Standard commands follow 3GPP TS 27.007, the `+SQN*` / `+SMCW*` commands are
//! Sequans extensions.
//!
//! Commands are encoded through [`atat::AtatCmd::write`]. Answers and
//! unsolicited result codes are framed by [`crate::digest`] and decoded with
//! `serde_at` into the `responses` and `urc` types of each chapter.

pub mod control;
pub mod general;
pub mod ip_transport_layer;
pub mod mobile_control;
pub mod network_service;
pub mod psn;
pub mod system_features;

use atat::atat_derive::{AtatCmd, AtatResp, AtatUrc};

#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Attention, checks the link and wakes the modem UART
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse, attempts = 3, timeout_ms = 500)]
pub struct AT;

#[derive(Debug, Clone, AtatUrc)]
pub enum Urc {
    #[at_urc("+CEREG")]
    EPSNetworkRegistration(psn::urc::EPSNetworkRegistration),
    #[at_urc("+CPIN")]
    SimStatus(mobile_control::urc::PinStatus),
    #[at_urc("+CEDRXP")]
    EdrxParameters(network_service::urc::EdrxParameters),
    #[at_urc("+SQNPSS")]
    PowerSavingStatus(system_features::urc::PowerSavingStatus),
    #[at_urc("+SQNSRING")]
    SocketRing(ip_transport_layer::urc::SocketRing),
    #[at_urc("+SQNSH")]
    SocketClosed(ip_transport_layer::urc::SocketClosed),
    #[at_urc("+SQNSUPGRADE")]
    Upgrade(system_features::urc::UpgradeStatus),
    #[at_urc("+SYSSTART")]
    SystemStart,
}

#[cfg(test)]
mod tests {
    use super::*;
    use atat::{AtatUrc, Parser};

    #[test]
    fn urc_lines() {
        match <Urc as AtatUrc>::parse(b"+CEREG: 1,\"00C3\",\"0A1B2C3D\",7") {
            Some(Urc::EPSNetworkRegistration(reg)) => {
                assert_eq!(reg.stat, 1);
                assert_eq!(reg.act, Some(7));
            }
            other => panic!("{:?}", other),
        }
        match <Urc as AtatUrc>::parse(b"+SQNSH: 3") {
            Some(Urc::SocketClosed(closed)) => assert_eq!(closed.sid, 3),
            other => panic!("{:?}", other),
        }
        match <Urc as AtatUrc>::parse(b"+SQNSRING: 1,2,\"4142\"") {
            Some(Urc::SocketRing(ring)) => assert_eq!(ring.hex(), b"4142"),
            other => panic!("{:?}", other),
        }
        assert!(matches!(
            <Urc as AtatUrc>::parse(b"+SYSSTART"),
            Some(Urc::SystemStart)
        ));
    }

    #[test]
    fn unknown_or_malformed() {
        assert!(<Urc as AtatUrc>::parse(b"+CSQ: 20,99").is_none());
        assert!(<Urc as AtatUrc>::parse(b"+SQNSH: x").is_none());
        assert!(<Urc as AtatUrc>::parse(b"RING").is_none());
    }

    #[test]
    fn urc_framing() {
        assert_eq!(
            <Urc as Parser>::parse(b"\r\n+SQNSH: 2\r\n\r\nOK\r\n"),
            Ok((&b"+SQNSH: 2"[..], 13))
        );
        assert_eq!(
            <Urc as Parser>::parse(b"\r\n+SYSSTART\r\n"),
            Ok((&b"+SYSSTART"[..], 13))
        );
        assert!(<Urc as Parser>::parse(b"\r\n+CSQ: 20,99\r\n").is_err());
    }
}
