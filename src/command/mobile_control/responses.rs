//! Responses for Mobile termination control and status Commands
use atat::atat_derive::AtatResp;
use heapless::String;

/// 8.5 Signal quality +CSQ
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalQuality {
    #[at_arg(position = 0)]
    pub rssi: u8,
    #[at_arg(position = 1)]
    pub ber: u8,
}

impl SignalQuality {
    /// Received signal strength in dBm, 0 when not known or not detectable.
    pub fn rssi_dbm(&self) -> i8 {
        match self.rssi {
            0..=31 => -113 + 2 * self.rssi as i8,
            _ => 0,
        }
    }
}

/// 8.15 Clock +CCLK, `"yy/MM/dd,hh:mm:ss±zz"`
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct NetworkClock {
    #[at_arg(position = 0)]
    pub time: String<24>,
}

/// Network synchronised time, as reported by `+CCLK`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

fn field<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<u8, ()> {
    parts.next().ok_or(())?.parse().map_err(drop)
}

impl TryFrom<&NetworkClock> for UtcTime {
    type Error = ();

    fn try_from(clock: &NetworkClock) -> Result<Self, ()> {
        let (date, time) = clock.time.split_once(',').ok_or(())?;
        // Time zone suffix is in quarters of an hour and is not applied.
        let time = time.split(|c: char| c == '+' || c == '-').next().unwrap_or(time);

        let mut d = date.split('/');
        let mut t = time.split(':');
        let utc = Self {
            year: 2000 + u16::from(field(&mut d)?),
            month: field(&mut d)?,
            day: field(&mut d)?,
            hour: field(&mut t)?,
            minute: field(&mut t)?,
            second: field(&mut t)?,
        };
        if !(1..=12).contains(&utc.month) || !(1..=31).contains(&utc.day) {
            return Err(());
        }
        Ok(utc)
    }
}
