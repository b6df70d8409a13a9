//! Argument and parameter types used by Network service Commands and Responses

use atat::atat_derive::AtatEnum;

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum OperatorSelectionMode {
    Automatic = 0,
    Manual = 1,
    Deregister = 2,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum OperatorFormat {
    Long = 0,
    Short = 1,
    Numeric = 2,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum PsmMode {
    Disable = 0,
    Enable = 1,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum EdrxMode {
    Disable = 0,
    /// Enable, with unsolicited +CEDRXP reporting
    EnableWithUrc = 2,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum EdrxActType {
    NotUsed = 0,
    EcGsmIot = 1,
    Gsm = 2,
    Utran = 3,
    EutranWbS1 = 4,
    EutranNbS1 = 5,
}

impl From<crate::config::EdrxAccessTechnology> for EdrxActType {
    fn from(act: crate::config::EdrxAccessTechnology) -> Self {
        use crate::config::EdrxAccessTechnology as Act;
        match act {
            Act::None => Self::NotUsed,
            Act::EcGsmIot => Self::EcGsmIot,
            Act::Gsm => Self::Gsm,
            Act::Utran => Self::Utran,
            Act::EutranWbS1 => Self::EutranWbS1,
            Act::EutranNbS1 => Self::EutranNbS1,
        }
    }
}
