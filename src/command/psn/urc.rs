//! Unsolicited responses for Packet domain Commands
use atat::atat_derive::AtatResp;
use heapless::String;

/// 10.1.22 EPS network registration status +CEREG
///
/// URC form, without `<n>`:
/// `+CEREG: <stat>[,[<tac>],[<ci>],[<AcT>][,[<cause_type>],[<reject_cause>][,[<Active-Time>],[<Periodic-TAU>]]]]`
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct EPSNetworkRegistration {
    #[at_arg(position = 0)]
    pub stat: u8,
    /// Tracking area code, hex
    #[at_arg(position = 1)]
    pub tac: Option<String<4>>,
    /// Cell id, hex
    #[at_arg(position = 2)]
    pub ci: Option<String<8>>,
    #[at_arg(position = 3)]
    pub act: Option<u8>,
    #[at_arg(position = 4)]
    pub cause_type: Option<u8>,
    #[at_arg(position = 5)]
    pub reject_cause: Option<u8>,
    /// T3324 bit string
    #[at_arg(position = 6)]
    pub active_time: Option<String<8>>,
    /// T3412 extended bit string
    #[at_arg(position = 7)]
    pub periodic_tau: Option<String<8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_with_psm_timers() {
        let resp = b"+CEREG: 5,\"00C3\",\"0A1B2C3D\",7,,,\"00100100\",\"01000111\"";
        let exp = EPSNetworkRegistration {
            stat: 5,
            tac: Some(String::try_from("00C3").unwrap()),
            ci: Some(String::try_from("0A1B2C3D").unwrap()),
            act: Some(7),
            cause_type: None,
            reject_cause: None,
            active_time: Some(String::try_from("00100100").unwrap()),
            periodic_tau: Some(String::try_from("01000111").unwrap()),
        };
        assert_eq!(atat::serde_at::from_slice(resp), Ok(exp));
    }

    #[test]
    fn registration_status_only() {
        let exp = EPSNetworkRegistration {
            stat: 2,
            tac: None,
            ci: None,
            act: None,
            cause_type: None,
            reject_cause: None,
            active_time: None,
            periodic_tau: None,
        };
        assert_eq!(atat::serde_at::from_slice(b"+CEREG: 2"), Ok(exp));
    }
}
