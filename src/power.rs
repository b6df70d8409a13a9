//! PSM / eDRX timer codecs, power usage accounting and the configuration
//! types of the RF test and antenna tuning commands.
//!
//! The PSM timers are the GPRS timer 2/3 information elements of
//! 3GPP TS 24.008 (10.5.7.4a and 10.5.7.4): the top 3 bits select a unit,
//! the low 5 bits a multiplier.

use embassy_time::{Duration, Instant};
use heapless::String;

use crate::config::EdrxAccessTechnology;

/// Unit value meaning "timer deactivated", for both PSM timers.
pub const PSM_DEACTIVATED: u8 = 0b111_00000;

const TIMER_UNIT_SHIFT: u8 = 5;
const TIMER_VALUE_MASK: u8 = 0b0001_1111;

/// T3412 extended (periodic TAU) units in seconds, `None` is deactivated.
const TAU_UNITS: [Option<u32>; 8] = [
    Some(600),
    Some(3_600),
    Some(36_000),
    Some(2),
    Some(30),
    Some(60),
    Some(1_152_000),
    None,
];

/// T3324 (active time) units in seconds. Values 3 to 6 are read as minutes.
const ACTIVE_TIME_UNITS: [Option<u32>; 8] = [
    Some(2),
    Some(60),
    Some(360),
    Some(60),
    Some(60),
    Some(60),
    Some(60),
    None,
];

const ACTIVE_TIME_ENCODABLE_UNITS: usize = 3;

fn decode_timer(units: &[Option<u32>; 8], byte: u8) -> Option<u32> {
    let unit = units[(byte >> TIMER_UNIT_SHIFT) as usize]?;
    Some(unit * (byte & TIMER_VALUE_MASK) as u32)
}

fn encode_timer(units: &[Option<u32>], seconds: u32) -> Option<u8> {
    units.iter().enumerate().find_map(|(i, unit)| {
        let unit = (*unit)?;
        let value = seconds / unit;
        (seconds % unit == 0 && value <= TIMER_VALUE_MASK as u32)
            .then(|| (i as u8) << TIMER_UNIT_SHIFT | value as u8)
    })
}

/// Periodic TAU in seconds, `None` when deactivated.
pub fn psm_tau_seconds(tau: u8) -> Option<u32> {
    decode_timer(&TAU_UNITS, tau)
}

/// PSM active time in seconds, `None` when deactivated.
pub fn psm_active_time_seconds(active_time: u8) -> Option<u32> {
    decode_timer(&ACTIVE_TIME_UNITS, active_time)
}

/// Encodes a periodic TAU, picking the first unit able to represent
/// `seconds` exactly.
pub fn encode_psm_tau(seconds: u32) -> Option<u8> {
    encode_timer(&TAU_UNITS, seconds)
}

pub fn encode_psm_active_time(seconds: u32) -> Option<u8> {
    encode_timer(&ACTIVE_TIME_UNITS[..ACTIVE_TIME_ENCODABLE_UNITS], seconds)
}

/// eDRX cycle lengths in ms for the S1 modes, 3GPP TS 24.008 table 10.5.5.32
const EDRX_CYCLE_MS: [u32; 16] = [
    5_120, 10_240, 20_480, 40_960, 61_440, 81_920, 102_400, 122_880, 143_360, 163_840, 327_680,
    655_360, 1_310_720, 2_621_440, 5_242_880, 10_485_760,
];

pub fn edrx_cycle_ms(value: u8) -> u32 {
    EDRX_CYCLE_MS[(value & 0x0F) as usize]
}

/// Paging time window in ms, its step depends on the access technology.
pub fn edrx_ptw_ms(act: EdrxAccessTechnology, ptw: u8) -> u32 {
    let step = match act {
        EdrxAccessTechnology::EutranNbS1 => 2_560,
        _ => 1_280,
    };
    ((ptw & 0x0F) as u32 + 1) * step
}

/// Formats the low `width` bits of `value` as a 3GPP bit string. `width`
/// is capped by the capacity `N`.
pub fn bit_string<const N: usize>(value: u8, width: u8) -> String<N> {
    let width = usize::from(width.min(8)).min(N);
    let mut s = String::new();
    for bit in (0..width).rev() {
        let c = if value >> bit & 1 == 1 { '1' } else { '0' };
        let pushed = s.push(c).is_ok();
        debug_assert!(pushed, "bit string wider than its capacity");
    }
    s
}

/// Parses a 3GPP bit string such as `"00100001"`, at most 8 bits.
pub fn parse_bit_string(s: &str) -> Option<u8> {
    if s.is_empty() || s.len() > 8 {
        return None;
    }
    u8::from_str_radix(s, 2).ok()
}

/// Antenna matching network selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BandPrefix {
    P0,
    P1,
    P2,
    P3,
    #[default]
    None,
}

impl BandPrefix {
    pub(crate) fn index(self) -> Option<u8> {
        match self {
            BandPrefix::P0 => Some(0),
            BandPrefix::P1 => Some(1),
            BandPrefix::P2 => Some(2),
            BandPrefix::P3 => Some(3),
            BandPrefix::None => None,
        }
    }
}

pub const MAX_TUNING_BANDS: usize = 3;
pub const MIN_TUNING_FREQUENCY_MHZ: u16 = 700;
pub const MAX_TUNING_FREQUENCY_MHZ: u16 = 1200;

/// A frequency range (MHz) switched to a given matching network. Bands with
/// [`BandPrefix::None`] are unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningBand {
    pub prefix: BandPrefix,
    pub min_freq: u16,
    pub max_freq: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AntennaTuning {
    pub default_prefix: BandPrefix,
    pub bands: [TuningBand; MAX_TUNING_BANDS],
}

/// Continuous wave RF test parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RfTestConfig {
    pub earfcn: u32,
    /// TX only: start or stop the wave
    pub tx_enable: bool,
    /// TX only: level in hundredths of dBm
    pub tx_level: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigAction {
    Save,
    Restore,
}

/// Reading the statistics excludes changing their acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatsRequest {
    Get,
    Configure { enable: bool, reset: bool },
}

/// Average supply current of each activity, in uA
const ACTIVE_CURRENT_UA: u64 = 7_000;
const NETWORK_CURRENT_UA: u64 = 120_000;
const DEEP_SLEEP_CURRENT_UA: u64 = 3;

const UA_MS_PER_UAH: u64 = 3_600_000;

/// What the modem was doing during an accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Activity {
    Off,
    DeepSleep,
    Active,
    /// Active and exchanging data with the network
    Network,
}

/// Modem usage and modelled consumption since the last clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Usage {
    pub active_ms: u64,
    /// Time spent in RX/TX, included in `active_ms`
    pub network_ms: u64,
    pub deep_sleep_ms: u64,
    pub network_uah: u64,
    pub total_uah: u64,
    /// Number of uplink data sequences
    pub seq_count: u32,
}

#[derive(Debug, Default)]
pub(crate) struct UsageCounters {
    active_ms: u64,
    network_ms: u64,
    deep_sleep_ms: u64,
    network_ua_ms: u64,
    total_ua_ms: u64,
    seq_count: u32,
    last_tick: Option<Instant>,
}

impl UsageCounters {
    /// Accounts the time elapsed since the previous report to `activity`,
    /// once at least `period` has elapsed. Returns whether counters moved.
    pub fn tick(&mut self, now: Instant, period: Duration, activity: Activity) -> bool {
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            return false;
        };
        let elapsed = match now.checked_duration_since(last) {
            Some(elapsed) if elapsed >= period => elapsed.as_millis(),
            _ => return false,
        };
        self.last_tick = Some(now);

        match activity {
            Activity::Off => {}
            Activity::DeepSleep => {
                self.deep_sleep_ms += elapsed;
                self.total_ua_ms += elapsed * DEEP_SLEEP_CURRENT_UA;
            }
            Activity::Active => {
                self.active_ms += elapsed;
                self.total_ua_ms += elapsed * ACTIVE_CURRENT_UA;
            }
            Activity::Network => {
                self.active_ms += elapsed;
                self.network_ms += elapsed;
                self.network_ua_ms += elapsed * NETWORK_CURRENT_UA;
                self.total_ua_ms += elapsed * NETWORK_CURRENT_UA;
            }
        }
        true
    }

    pub fn count_sequence(&mut self) {
        self.seq_count = self.seq_count.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        *self = Self {
            last_tick: self.last_tick,
            ..Default::default()
        };
    }

    pub fn usage(&self) -> Usage {
        Usage {
            active_ms: self.active_ms,
            network_ms: self.network_ms,
            deep_sleep_ms: self.deep_sleep_ms,
            network_uah: self.network_ua_ms / UA_MS_PER_UAH,
            total_uah: self.total_ua_ms / UA_MS_PER_UAH,
            seq_count: self.seq_count,
        }
    }

    pub fn consumption_uah(&self) -> u64 {
        self.total_ua_ms / UA_MS_PER_UAH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tau_round_trip_every_entry() {
        for unit in 0u8..7 {
            for value in 0u8..=31 {
                let byte = unit << 5 | value;
                let seconds = psm_tau_seconds(byte).unwrap();
                let encoded = encode_psm_tau(seconds).unwrap();
                assert_eq!(psm_tau_seconds(encoded), Some(seconds), "byte {:08b}", byte);
            }
        }
        assert_eq!(psm_tau_seconds(PSM_DEACTIVATED | 5), None);
    }

    #[test]
    fn active_time_round_trip_every_entry() {
        for unit in 0u8..3 {
            for value in 0u8..=31 {
                let byte = unit << 5 | value;
                let seconds = psm_active_time_seconds(byte).unwrap();
                let encoded = encode_psm_active_time(seconds).unwrap();
                assert_eq!(psm_active_time_seconds(encoded), Some(seconds));
            }
        }
        assert_eq!(psm_active_time_seconds(PSM_DEACTIVATED), None);
    }

    #[test]
    fn timer_table_values() {
        // one deci-hour
        assert_eq!(psm_active_time_seconds(0b010_00001), Some(360));
        assert_eq!(psm_active_time_seconds(0b000_00101), Some(10));
        assert_eq!(psm_tau_seconds(0b001_00001), Some(3_600));
        assert_eq!(psm_tau_seconds(0b110_00010), Some(2_304_000));
        assert_eq!(psm_tau_seconds(0b011_00100), Some(8));

        assert_eq!(encode_psm_tau(3_600), Some(0b000_00110));
        assert_eq!(encode_psm_active_time(360), Some(0b001_00110));
        assert_eq!(encode_psm_tau(7), None);
        assert_eq!(encode_psm_active_time(3), None);
    }

    #[test]
    fn edrx_tables() {
        assert_eq!(edrx_cycle_ms(0b0000), 5_120);
        assert_eq!(edrx_cycle_ms(0b0101), 81_920);
        assert_eq!(edrx_cycle_ms(0b1111), 10_485_760);
        assert_eq!(edrx_ptw_ms(EdrxAccessTechnology::EutranWbS1, 0), 1_280);
        assert_eq!(edrx_ptw_ms(EdrxAccessTechnology::EutranNbS1, 3), 10_240);
    }

    #[test]
    fn bit_strings() {
        assert_eq!(bit_string::<8>(0b0010_0001, 8).as_str(), "00100001");
        assert_eq!(bit_string::<4>(0b0101, 4).as_str(), "0101");
        assert_eq!(bit_string::<4>(0b1111_0101, 8).as_str(), "0101");

        assert_eq!(parse_bit_string("00100001"), Some(0b0010_0001));
        assert_eq!(parse_bit_string("0011"), Some(3));
        assert_eq!(parse_bit_string(""), None);
        assert_eq!(parse_bit_string("2"), None);
        assert_eq!(parse_bit_string("100000000"), None);
    }

    #[test]
    fn usage_accounting() {
        let period = Duration::from_secs(1);
        let mut counters = UsageCounters::default();
        let t0 = Instant::from_millis(1_000);

        assert!(!counters.tick(t0, period, Activity::Active));
        assert!(!counters.tick(t0 + Duration::from_millis(500), period, Activity::Active));
        assert!(counters.tick(t0 + Duration::from_secs(36), period, Activity::Active));
        assert!(counters.tick(t0 + Duration::from_secs(72), period, Activity::Network));
        assert!(counters.tick(t0 + Duration::from_secs(108), period, Activity::DeepSleep));
        counters.count_sequence();

        let usage = counters.usage();
        assert_eq!(usage.active_ms, 72_000);
        assert_eq!(usage.network_ms, 36_000);
        assert_eq!(usage.deep_sleep_ms, 36_000);
        // 36 s at 7 mA + 36 s at 120 mA + 36 s at 3 uA
        assert_eq!(usage.network_uah, 1_200);
        assert_eq!(usage.total_uah, 70 + 1_200);
        assert_eq!(usage.seq_count, 1);

        counters.clear();
        assert_eq!(counters.usage(), Usage::default());
        assert_eq!(counters.consumption_uah(), 0);
    }
}
