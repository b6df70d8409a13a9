//! Responses for General Commands
use atat::atat_derive::AtatResp;
use atat::heapless_bytes::Bytes;
use heapless::String;

pub const ICCID_MAX_LEN: usize = 20;
pub const EUICCID_MAX_LEN: usize = 32;
pub const IMSI_MAX_LEN: usize = 15;

/// 5.3 Request revision identification +CGMR
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct FirmwareRevision {
    #[at_arg(position = 0)]
    pub version: Bytes<32>,
}

/// Decoded firmware version, `LR<branch>.<mode>.<image>.<delivery>-<release>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    pub branch: u8,
    pub mode: u8,
    pub image: u8,
    pub delivery: u8,
    pub release: u32,
}

impl TryFrom<&FirmwareRevision> for FirmwareVersion {
    type Error = ();

    fn try_from(rev: &FirmwareRevision) -> Result<Self, ()> {
        let text = core::str::from_utf8(rev.version.as_slice()).map_err(drop)?;
        let version = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        let (numbers, release) = version.split_once('-').ok_or(())?;
        let mut parts = numbers.split('.').map(str::parse::<u8>);
        let mut part = || parts.next().ok_or(())?.map_err(drop);
        let fw = Self {
            branch: part()?,
            mode: part()?,
            image: part()?,
            delivery: part()?,
            release: release.parse().map_err(drop)?,
        };
        match part() {
            Err(()) => Ok(fw),
            Ok(_) => Err(()),
        }
    }
}

/// 5.6 Request international mobile subscriber identity +CIMI
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct Imsi {
    #[at_arg(position = 0)]
    pub imsi: Bytes<IMSI_MAX_LEN>,
}

impl Imsi {
    /// The IMSI when the answer is made of digits only.
    pub fn digits(&self) -> Option<String<IMSI_MAX_LEN>> {
        let imsi = self.imsi.as_slice();
        if imsi.is_empty() || !imsi.iter().all(u8::is_ascii_digit) {
            return None;
        }
        String::try_from(core::str::from_utf8(imsi).ok()?).ok()
    }
}

/// Read card identification +SQNCCID: `"<iccid>","<euiccid>"`
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct CardIdentification {
    #[at_arg(position = 0)]
    pub iccid: String<ICCID_MAX_LEN>,
    #[at_arg(position = 1)]
    pub euiccid: Option<String<EUICCID_MAX_LEN>>,
}

impl CardIdentification {
    /// Drops the EUICCID field of cards that report it empty.
    pub fn normalized(mut self) -> Option<Self> {
        if self.iccid.is_empty() {
            return None;
        }
        if self.euiccid.as_ref().map_or(false, |e| e.is_empty()) {
            self.euiccid = None;
        }
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_version() {
        let rev: FirmwareRevision = atat::serde_at::from_slice(b"LR8.2.1.0-61488").unwrap();
        assert_eq!(rev.version, b"LR8.2.1.0-61488");
        assert_eq!(
            FirmwareVersion::try_from(&rev),
            Ok(FirmwareVersion {
                branch: 8,
                mode: 2,
                image: 1,
                delivery: 0,
                release: 61488,
            })
        );

        let short = FirmwareRevision {
            version: Bytes::from_slice(b"LR8.2.1-61488").unwrap(),
        };
        assert_eq!(FirmwareVersion::try_from(&short), Err(()));
        let garbage = FirmwareRevision {
            version: Bytes::from_slice(b"garbage").unwrap(),
        };
        assert_eq!(FirmwareVersion::try_from(&garbage), Err(()));
    }

    #[test]
    fn imsi() {
        let imsi: Imsi = atat::serde_at::from_slice(b"001010123456789").unwrap();
        assert_eq!(imsi.digits().as_deref(), Some("001010123456789"));

        let imsi: Imsi = atat::serde_at::from_slice(b"ERROR").unwrap();
        assert_eq!(imsi.digits(), None);

        assert!(atat::serde_at::from_slice::<Imsi>(b"0010101234567890").is_err());
    }

    #[test]
    fn card_identification() {
        let card: CardIdentification = atat::serde_at::from_slice(
            b"+SQNCCID: \"89330123456789012345\",\"89049032000001000000012345678901\"",
        )
        .unwrap();
        let card = card.normalized().unwrap();
        assert_eq!(card.iccid.as_str(), "89330123456789012345");
        assert_eq!(
            card.euiccid.as_deref(),
            Some("89049032000001000000012345678901")
        );

        let card: CardIdentification =
            atat::serde_at::from_slice(b"+SQNCCID: \"8933012345678901234\",\"\"").unwrap();
        assert_eq!(card.normalized().unwrap().euiccid, None);

        let card: CardIdentification =
            atat::serde_at::from_slice(b"+SQNCCID: \"8933012345678901234\"").unwrap();
        assert_eq!(card.euiccid, None);
    }
}
