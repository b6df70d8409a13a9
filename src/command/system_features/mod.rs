//! ### Sequans hardware configuration, statistics and RF test commands
pub mod responses;
pub mod types;
pub mod urc;

use super::NoResponse;
use crate::error::Error;
use crate::power::{AntennaTuning, BandPrefix, MAX_TUNING_FREQUENCY_MHZ, MIN_TUNING_FREQUENCY_MHZ};
use atat::atat_derive::AtatCmd;
use core::fmt::Write;
use heapless::String;
use responses::{CwRxRssi, RxTxStatsResponse};
use types::{ActiveMode, CwTxState, RxTxStatsAction, SimInterfaceState, Uart0Speed, Uart1Mode};

/// Hardware configuration of a SIM interface +SQNHWCFG="sim"
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNHWCFG", NoResponse, attempts = 2, timeout_ms = 5000)]
pub struct SetSimInterface<'a> {
    #[at_arg(position = 0, len = 3)]
    pub function: &'a str,
    #[at_arg(position = 1)]
    pub slot: u8,
    #[at_arg(position = 2)]
    pub state: SimInterfaceState,
}

impl SetSimInterface<'_> {
    pub fn new(slot: u8, enable: bool) -> Self {
        Self {
            function: "sim",
            slot,
            state: if enable {
                SimInterfaceState::Enable
            } else {
                SimInterfaceState::Disable
            },
        }
    }
}

/// Hardware configuration of the main UART +SQNHWCFG="uart0"
///
/// Applied at the next modem boot.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNHWCFG", NoResponse, attempts = 2, timeout_ms = 5000)]
pub struct SetUart0Config<'a> {
    #[at_arg(position = 0, len = 5)]
    pub function: &'a str,
    #[at_arg(position = 1)]
    pub speed: Uart0Speed,
}

impl SetUart0Config<'_> {
    pub fn new(high_speed: bool) -> Self {
        Self {
            function: "uart0",
            speed: if high_speed {
                Uart0Speed::High
            } else {
                Uart0Speed::Low
            },
        }
    }
}

/// Hardware configuration of the secondary UART +SQNHWCFG="uart1"
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNHWCFG", NoResponse, attempts = 2, timeout_ms = 5000)]
pub struct SetUart1Config<'a> {
    #[at_arg(position = 0, len = 5)]
    pub function: &'a str,
    #[at_arg(position = 1, len = 3)]
    pub mode: &'a str,
}

impl SetUart1Config<'_> {
    pub fn new(mode: Uart1Mode) -> Self {
        Self {
            function: "uart1",
            mode: mode.as_str(),
        }
    }
}

/// Radio access technology selection +SQNMODEACTIV
///
/// Only taken into account while the modem is in minimum functionality.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNMODEACTIV", NoResponse, attempts = 2, timeout_ms = 5000)]
pub struct SetModeActivation {
    #[at_arg(position = 0)]
    pub mode: ActiveMode,
}

/// Continuous wave transmission test +SMCWTX
///
/// Only accepted while the modem is in test mode (`+CFUN=5`). `level` is in
/// hundredths of dBm.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SMCWTX", NoResponse, attempts = 1, timeout_ms = 5000)]
pub struct SetCwTx {
    #[at_arg(position = 0)]
    pub state: CwTxState,
    #[at_arg(position = 1)]
    pub earfcn: u32,
    #[at_arg(position = 2)]
    pub level: i32,
}

/// Continuous wave reception test +SMCWRX
///
/// Measures the RSSI on `earfcn`, answered with `+SMCWRX: <rssi>` in
/// hundredths of dBm.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SMCWRX", CwRxRssi, attempts = 1, timeout_ms = 10000)]
pub struct GetCwRx {
    #[at_arg(position = 0)]
    pub earfcn: u32,
}

/// Save the manufacturing configuration +SQNFACTORYSAVE
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNFACTORYSAVE", NoResponse, attempts = 1, timeout_ms = 10000)]
pub struct FactorySave;

/// Restore the saved manufacturing configuration +SQNFACTORYRESTORE
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNFACTORYRESTORE", NoResponse, attempts = 1, timeout_ms = 10000)]
pub struct FactoryRestore;

/// Radio activity statistics +SQNRXTXSTATS
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNRXTXSTATS", NoResponse, attempts = 2, timeout_ms = 2000)]
pub struct SetRxTxStats {
    #[at_arg(position = 0)]
    pub action: RxTxStatsAction,
}

/// Radio activity statistics +SQNRXTXSTATS, answered by
/// `+SQNRXTXSTATS: <rx>,<tx>,<tx23>,...,<tx0>`
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNRXTXSTATS?", RxTxStatsResponse, attempts = 2, timeout_ms = 2000)]
pub struct GetRxTxStats;

/// Builds `AT+SQNHWCFG="antennaTuning",...`.
///
/// The band list has a variable length, so the command text is formatted
/// directly rather than derived.
pub fn antenna_tuning_command(cfg: &AntennaTuning) -> Result<String<128>, Error> {
    let default = cfg.default_prefix.index().ok_or(Error::InvalidParameter)?;

    let mut cmd = String::new();
    write!(cmd, "AT+SQNHWCFG=\"antennaTuning\",{}", default).map_err(|_| Error::Overflow)?;
    for band in cfg.bands.iter() {
        let Some(prefix) = band.prefix.index() else {
            continue;
        };
        let freqs = MIN_TUNING_FREQUENCY_MHZ..=MAX_TUNING_FREQUENCY_MHZ;
        if band.min_freq > band.max_freq
            || !freqs.contains(&band.min_freq)
            || !freqs.contains(&band.max_freq)
        {
            return Err(Error::InvalidParameter);
        }
        write!(cmd, ",{},{},{}", prefix, band.min_freq, band.max_freq)
            .map_err(|_| Error::Overflow)?;
    }
    cmd.push_str("\r\n").map_err(|_| Error::Overflow)?;
    Ok(cmd)
}
