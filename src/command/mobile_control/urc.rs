//! Unsolicited responses for Mobile termination control and status Commands
use atat::atat_derive::AtatResp;
use serde::de::{self, Deserialize, Deserializer, Visitor};

/// SIM state reported by `+CPIN: <code>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimStatus {
    NoSim,
    UnderInit,
    Locked,
    Invalid,
    Failure,
    Ready,
    PhNetPin,
    PhSimPin,
    InvalidPs,
    InvalidPsCs,
    InvalidCs,
}

impl SimStatus {
    /// Maps a `<code>` of `+CPIN`. Codes the driver does not know are
    /// reported as [`SimStatus::Invalid`].
    pub fn from_code(code: &[u8]) -> Self {
        let code = code
            .strip_prefix(b"\"")
            .and_then(|c| c.strip_suffix(b"\""))
            .unwrap_or(code);
        match code {
            b"READY" => Self::Ready,
            b"SIM PIN" | b"SIM PUK" | b"SIM PIN2" | b"SIM PUK2" => Self::Locked,
            b"NOT INSERTED" | b"NOT READY" => Self::NoSim,
            b"INITIALIZING" => Self::UnderInit,
            b"PH-NET PIN" | b"PH-NET PUK" => Self::PhNetPin,
            b"PH-SIM PIN" => Self::PhSimPin,
            b"SIM FAILURE" => Self::Failure,
            b"INVALID PS" => Self::InvalidPs,
            b"INVALID PS CS" => Self::InvalidPsCs,
            b"INVALID CS" => Self::InvalidCs,
            _ => Self::Invalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSim => "no_sim",
            Self::UnderInit => "under_init",
            Self::Locked => "locked",
            Self::Invalid => "invalid",
            Self::Failure => "failure",
            Self::Ready => "ready",
            Self::PhNetPin => "ph_net_pin",
            Self::PhSimPin => "ph_sim_pin",
            Self::InvalidPs => "invalid_ps",
            Self::InvalidPsCs => "invalid_ps_cs",
            Self::InvalidCs => "invalid_cs",
        }
    }
}

impl<'de> Deserialize<'de> for SimStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CodeVisitor;

        impl<'de> Visitor<'de> for CodeVisitor {
            type Value = SimStatus;

            fn expecting(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                f.write_str("a +CPIN code")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<SimStatus, E> {
                Ok(SimStatus::from_code(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SimStatus, E> {
                Ok(SimStatus::from_code(v.as_bytes()))
            }
        }

        // Codes contain spaces and dashes, which only the raw bytes form keeps
        deserializer.deserialize_bytes(CodeVisitor)
    }
}

/// 9.3 Enter PIN +CPIN
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct PinStatus {
    #[at_arg(position = 0)]
    pub code: SimStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_states() {
        assert_eq!(
            atat::serde_at::from_slice(b"+CPIN: READY"),
            Ok(PinStatus {
                code: SimStatus::Ready
            })
        );
        assert_eq!(
            atat::serde_at::from_slice(b"+CPIN: SIM PIN"),
            Ok(PinStatus {
                code: SimStatus::Locked
            })
        );
        assert_eq!(
            atat::serde_at::from_slice(b"+CPIN: NOT INSERTED"),
            Ok(PinStatus {
                code: SimStatus::NoSim
            })
        );
        assert_eq!(
            atat::serde_at::from_slice(b"+CPIN: PH-NET PIN"),
            Ok(PinStatus {
                code: SimStatus::PhNetPin
            })
        );
        assert_eq!(SimStatus::from_code(b"???"), SimStatus::Invalid);
        assert_eq!(SimStatus::from_code(b"\"READY\""), SimStatus::Ready);
    }
}
