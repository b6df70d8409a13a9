//! Argument and parameter types used by the hardware configuration and test Commands
use atat::atat_derive::AtatEnum;

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum SimInterfaceState {
    Disable = 0,
    Enable = 1,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum ActiveMode {
    LteM = 1,
    NbIot = 2,
}

impl From<crate::config::NetworkType> for ActiveMode {
    fn from(t: crate::config::NetworkType) -> Self {
        match t {
            crate::config::NetworkType::LteM => Self::LteM,
            crate::config::NetworkType::NbIot => Self::NbIot,
        }
    }
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum CwTxState {
    Stop = 0,
    Start = 1,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum RxTxStatsAction {
    Disable = 0,
    Enable = 1,
    Reset = 2,
    EnableAndReset = 3,
}

/// Main UART baud rate, 115200 or 57600
#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum Uart0Speed {
    Low = 0,
    High = 1,
}

/// Service carried by the secondary UART
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uart1Mode {
    /// AT command channel
    At,
    /// Debug and crash dump channel
    Dcp,
}

impl Uart1Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::At => "at",
            Self::Dcp => "dcp",
        }
    }
}
