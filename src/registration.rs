use heapless::String;

use crate::command::psn::urc::EPSNetworkRegistration;
use crate::hex;
use crate::power;

/// EPS registration status, as reported by `+CEREG`.
///
/// `Lost` (80) is reported by the modem when the serving cell disappears
/// while in connected mode. `Suspended` is never reported by the modem, the
/// driver emits it when it puts the modem into airplane mode.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    #[default]
    None,
    Home,
    Searching,
    Denied,
    Unknown,
    Roaming,
    SmsOnlyHome,
    SmsOnlyRoaming,
    Emergency,
    Lost,
    Suspended,
}

impl From<u8> for Status {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            4 => Self::Unknown,
            5 => Self::Roaming,
            6 => Self::SmsOnlyHome,
            7 => Self::SmsOnlyRoaming,
            8 => Self::Emergency,
            80 => Self::Lost,
            81 => Self::Suspended,
            _ => Self::None,
        }
    }
}

impl Status {
    pub fn registered(&self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Home => "home",
            Self::Searching => "searching",
            Self::Denied => "denied",
            Self::Unknown => "unknown",
            Self::Roaming => "roaming",
            Self::SmsOnlyHome => "sms_home",
            Self::SmsOnlyRoaming => "sms_roaming",
            Self::Emergency => "emergency",
            Self::Lost => "lost",
            Self::Suspended => "suspended",
        }
    }
}

/// Radio access technology of the serving cell (`<AcT>`).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccessTechnology {
    Gsm,
    GsmCompact,
    Utran,
    GsmEgprs,
    UtranHsdpa,
    UtranHsupa,
    UtranHsdpaHsupa,
    Eutran,
    EcGsmIot,
    EutranNb,
    #[default]
    Unknown,
}

impl From<u8> for AccessTechnology {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Gsm,
            1 => Self::GsmCompact,
            2 => Self::Utran,
            3 => Self::GsmEgprs,
            4 => Self::UtranHsdpa,
            5 => Self::UtranHsupa,
            6 => Self::UtranHsdpaHsupa,
            7 => Self::Eutran,
            8 => Self::EcGsmIot,
            9 => Self::EutranNb,
            _ => Self::Unknown,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CauseType {
    /// `<reject_cause>` is an EMM cause from 3GPP TS 24.301 Annex A
    ThreeGpp,
    /// `<reject_cause>` is manufacturer specific
    Manufacturer,
    #[default]
    None,
}

/// Cached network registration state, updated from every `+CEREG` URC.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkStatusInfo {
    pub status: Status,
    pub act: AccessTechnology,
    pub tac: u16,
    pub ci: u32,
    /// Raw T3324 byte granted by the network
    pub psm_active_time: u8,
    /// Raw T3412 extended byte granted by the network
    pub psm_tau: u8,
    pub cause_type: CauseType,
    pub reject_cause: u8,
}

impl From<&EPSNetworkRegistration> for NetworkStatusInfo {
    fn from(reg: &EPSNetworkRegistration) -> Self {
        let bits = |v: &Option<String<8>>| {
            v.as_deref()
                .and_then(power::parse_bit_string)
                .unwrap_or(power::PSM_DEACTIVATED)
        };
        let tac = reg
            .tac
            .as_deref()
            .and_then(hex::parse_hex_u32)
            .and_then(|tac| u16::try_from(tac).ok())
            .unwrap_or_default();

        Self {
            status: Status::from(reg.stat),
            act: reg.act.map(AccessTechnology::from).unwrap_or_default(),
            tac,
            ci: reg
                .ci
                .as_deref()
                .and_then(hex::parse_hex_u32)
                .unwrap_or_default(),
            psm_active_time: bits(&reg.active_time),
            psm_tau: bits(&reg.periodic_tau),
            cause_type: match reg.cause_type {
                Some(0) => CauseType::ThreeGpp,
                Some(1) => CauseType::Manufacturer,
                _ => CauseType::None,
            },
            reject_cause: reg.reject_cause.unwrap_or_default(),
        }
    }
}

impl NetworkStatusInfo {
    pub fn registered(&self) -> bool {
        self.status.registered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(line: &[u8]) -> NetworkStatusInfo {
        let reg: EPSNetworkRegistration = atat::serde_at::from_slice(line).unwrap();
        NetworkStatusInfo::from(&reg)
    }

    #[test]
    fn full_registration_report() {
        let info = info(b"+CEREG: 5,\"00C3\",\"0A1B2C3D\",7,,,\"00100100\",\"01000111\"");
        assert_eq!(info.status, Status::Roaming);
        assert_eq!(info.tac, 0x00C3);
        assert_eq!(info.ci, 0x0A1B_2C3D);
        assert_eq!(info.act, AccessTechnology::Eutran);
        assert_eq!(info.cause_type, CauseType::None);
        assert_eq!(info.psm_active_time, 0b0010_0100);
        assert_eq!(info.psm_tau, 0b0100_0111);
        assert!(info.registered());
    }

    #[test]
    fn short_and_reject_reports() {
        let short = info(b"+CEREG: 2");
        assert_eq!(short.status, Status::Searching);
        assert_eq!(short.psm_tau, power::PSM_DEACTIVATED);
        assert!(!short.registered());

        let denied = info(b"+CEREG: 3,\"0001\",\"00000001\",9,0,15");
        assert_eq!(denied.status, Status::Denied);
        assert_eq!(denied.act, AccessTechnology::EutranNb);
        assert_eq!(denied.cause_type, CauseType::ThreeGpp);
        assert_eq!(denied.reject_cause, 15);

        assert_eq!(info(b"+CEREG: 80").status, Status::Lost);
    }
}
