//! Unsolicited responses for Network service Commands
use atat::atat_derive::AtatResp;
use heapless::String;

use crate::config::EdrxAccessTechnology;
use crate::power::parse_bit_string;

/// 7.41 eDRX read dynamic parameters +CEDRXP
///
/// `+CEDRXP: <AcT-type>[,<Requested_eDRX_value>[,<NW-provided_eDRX_value>[,<Paging_time_window>]]]`
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct EdrxParameters {
    #[at_arg(position = 0)]
    pub act_type: u8,
    #[at_arg(position = 1)]
    pub requested: Option<String<4>>,
    #[at_arg(position = 2)]
    pub provided: Option<String<4>>,
    #[at_arg(position = 3)]
    pub ptw: Option<String<4>>,
}

/// eDRX settings in use, decoded from [`EdrxParameters`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdrxInfo {
    pub act_type: EdrxAccessTechnology,
    pub requested: u8,
    pub provided: u8,
    pub ptw: u8,
}

impl From<&EdrxParameters> for EdrxInfo {
    fn from(p: &EdrxParameters) -> Self {
        let nibble = |v: &Option<String<4>>| {
            v.as_deref()
                .and_then(parse_bit_string)
                .unwrap_or_default()
        };
        Self {
            act_type: EdrxAccessTechnology::from_u8(p.act_type),
            requested: nibble(&p.requested),
            provided: nibble(&p.provided),
            ptw: nibble(&p.ptw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edrx_parameters() {
        let resp = b"+CEDRXP: 4,\"0101\",\"0010\",\"0011\"";
        let exp = EdrxParameters {
            act_type: 4,
            requested: Some(String::try_from("0101").unwrap()),
            provided: Some(String::try_from("0010").unwrap()),
            ptw: Some(String::try_from("0011").unwrap()),
        };
        assert_eq!(atat::serde_at::from_slice(resp), Ok(exp.clone()));
        assert_eq!(
            EdrxInfo::from(&exp),
            EdrxInfo {
                act_type: EdrxAccessTechnology::EutranWbS1,
                requested: 0b0101,
                provided: 0b0010,
                ptw: 0b0011,
            }
        );

        let short: EdrxParameters = atat::serde_at::from_slice(b"+CEDRXP: 5").unwrap();
        assert_eq!(
            EdrxInfo::from(&short).act_type,
            EdrxAccessTechnology::EutranNbS1
        );
        assert!(atat::serde_at::from_slice::<EdrxParameters>(b"+CEDRXP: \"x\"").is_err());
    }
}
