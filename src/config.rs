use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use heapless::String;
use serde::{Deserialize, Serialize};

/// Maximum length of the APN and operator strings.
pub const APN_MAX_LEN: usize = 32;
pub const OPERATOR_MAX_LEN: usize = 32;

pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Inverts an active-low output, e.g. a load switch enable line.
pub struct ReverseOutputPin<P: OutputPin<Error = Infallible>>(pub P);

impl<P: OutputPin<Error = Infallible>> ErrorType for ReverseOutputPin<P> {
    type Error = Infallible;
}

impl<P: OutputPin<Error = Infallible>> OutputPin for ReverseOutputPin<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        match state {
            PinState::Low => self.0.set_state(PinState::High),
            PinState::High => self.0.set_state(PinState::Low),
        }
    }
}

/// Board glue for the modem.
///
/// The driver only toggles the pins and asks for baud rate changes; UART
/// flow control and clock gating stay with the implementor.
pub trait HwConfig {
    /// Drives the modem power load switch, high means powered.
    type PowerPin: OutputPin;
    /// Modem `RESET_N`, active low.
    type ResetPin: OutputPin;

    const HIGH_BAUD_RATE: u32 = 921_600;
    const LOW_BAUD_RATE: u32 = 115_200;

    fn power_pin(&mut self) -> Option<&mut Self::PowerPin>;
    fn reset_pin(&mut self) -> Option<&mut Self::ResetPin>;

    /// Called while probing the transport speed.
    fn set_baud_rate(&mut self, _baud: u32) {}
}

/// How the modem is brought up by `modem_open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    #[default]
    Off,
    /// Full functionality, network attach
    Normal,
    /// Radio off, SIM accessible
    Airplane,
    /// RF test mode, only `tx_rf_test` / `rx_rf_test` are usable
    Manufacturing,
    /// Airplane mode plus a SIM identity read, for production lines
    ManufacturingCcid,
}

impl OpenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Off => "off",
            OpenMode::Normal => "normal",
            OpenMode::Airplane => "airplane",
            OpenMode::Manufacturing => "manufacturing",
            OpenMode::ManufacturingCcid => "manufacturing_ccid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkType {
    #[default]
    LteM,
    NbIot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimSlot {
    #[default]
    Slot0,
    Slot1,
}

impl SimSlot {
    pub fn index(self) -> u8 {
        match self {
            SimSlot::Slot0 => 0,
            SimSlot::Slot1 => 1,
        }
    }
}

/// Requested PSM timers, as the raw 3GPP TS 24.008 GPRS timer bytes.
///
/// See [`crate::power`] for the conversion to and from seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PsmConfig {
    pub enabled: bool,
    /// Periodic TAU (T3412 extended)
    pub tau: u8,
    /// Active time (T3324)
    pub active_time: u8,
}

/// Access technology an eDRX setting applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdrxAccessTechnology {
    #[default]
    None,
    EcGsmIot,
    Gsm,
    Utran,
    EutranWbS1,
    EutranNbS1,
}

impl EdrxAccessTechnology {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::EcGsmIot,
            2 => Self::Gsm,
            3 => Self::Utran,
            4 => Self::EutranWbS1,
            5 => Self::EutranNbS1,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdrxConfig {
    pub enabled: bool,
    pub act_type: EdrxAccessTechnology,
    /// eDRX cycle nibble
    pub requested_value: u8,
    /// Paging time window nibble
    pub ptw: u8,
}

/// Everything `modem_open` negotiates with the modem.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModemConfig {
    pub network_type: NetworkType,
    pub edrx: EdrxConfig,
    pub psm: PsmConfig,
    pub sim_slot: SimSlot,
    pub apn: String<APN_MAX_LEN>,
    /// Numeric PLMN to select manually when using SIM slot 0, empty for automatic
    pub operator_slot0: String<OPERATOR_MAX_LEN>,
    pub operator_slot1: String<OPERATOR_MAX_LEN>,
    /// Passed back with every notification
    pub user_arg: u32,
}

impl ModemConfig {
    pub fn operator(&self) -> &str {
        match self.sim_slot {
            SimSlot::Slot0 => &self.operator_slot0,
            SimSlot::Slot1 => &self.operator_slot1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockPin;

    #[test]
    fn reversed_pin() {
        let mut pin = ReverseOutputPin(MockPin::default());
        pin.set_high().unwrap();
        assert!(!pin.0.is_high());
        pin.set_state(PinState::Low).unwrap();
        assert!(pin.0.is_high());
    }

    #[test]
    fn operator_follows_sim_slot() {
        let mut cfg = ModemConfig {
            operator_slot0: String::try_from("20801").unwrap(),
            ..Default::default()
        };
        assert_eq!(cfg.operator(), "20801");
        cfg.sim_slot = SimSlot::Slot1;
        assert_eq!(cfg.operator(), "");
        assert_eq!(cfg.sim_slot.index(), 1);
    }
}
