//! Sockets multiplexed over the AT channel.

mod set;

pub use self::set::{Iter as SocketSetIter, Socket, SocketSet};

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::request::ResponseStatus;
use crate::digest::FinalError;

pub const MAX_SOCKETS: usize = 6;
/// Largest payload accepted by a single `socket_send`
pub const MAX_SEND_LEN: usize = 255;
pub const REMOTE_MAX_LEN: usize = 32;

/// Modem connection id, `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketId(u8);

impl SocketId {
    pub fn new(id: u8) -> Result<Self, Error> {
        if (1..=MAX_SOCKETS as u8).contains(&id) {
            Ok(Self(id))
        } else {
            Err(Error::InvalidParameter)
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn all() -> impl Iterator<Item = SocketId> {
        (1..=MAX_SOCKETS as u8).map(SocketId)
    }
}

impl TryFrom<u8> for SocketId {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Error> {
        Self::new(id)
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketConfig {
    pub id: SocketId,
    pub protocol: Protocol,
    /// IP address or host name
    pub remote: String<REMOTE_MAX_LEN>,
    pub remote_port: u16,
    /// 0 lets the modem pick one
    pub local_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl SocketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
        }
    }

    fn can_become(self, next: SocketState) -> bool {
        use SocketState::*;
        matches!(
            (self, next),
            (Closed, Opening) | (Opening, Open) | (Opening, Closed) | (Open, Closing) | (Closing, Closed)
        )
    }
}

/// Outcome reported by socket notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketResult {
    Success,
    /// The modem rejected the command
    RequestError,
    Timeout,
    NoCarrier,
    Refused,
    AuthReject,
    TlsError,
    Unknown,
}

/// CME error codes with a dedicated socket result
const CME_REFUSED: u16 = 3;
const CME_AUTH_REJECT: u16 = 149;
const CME_TLS_ERRORS: core::ops::RangeInclusive<u16> = 550..=599;

impl SocketResult {
    /// Maps the resolution of a socket command.
    pub fn from_resolution(status: ResponseStatus, error: Option<FinalError>) -> Self {
        match (status, error) {
            (ResponseStatus::Success | ResponseStatus::Partial, _) => Self::Success,
            (ResponseStatus::Timeout, _) => Self::Timeout,
            (_, Some(FinalError::NoCarrier)) => Self::NoCarrier,
            (_, Some(FinalError::Cme(CME_REFUSED))) => Self::Refused,
            (_, Some(FinalError::Cme(CME_AUTH_REJECT))) => Self::AuthReject,
            (_, Some(FinalError::Cme(code))) if CME_TLS_ERRORS.contains(&code) => Self::TlsError,
            (_, Some(FinalError::Error)) => Self::RequestError,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RequestError => "request_error",
            Self::Timeout => "timeout",
            Self::NoCarrier => "no_carrier",
            Self::Refused => "refused",
            Self::AuthReject => "auth_reject",
            Self::TlsError => "tls_error",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_range() {
        assert_eq!(SocketId::new(0), Err(Error::InvalidParameter));
        assert_eq!(SocketId::new(7), Err(Error::InvalidParameter));
        assert_eq!(SocketId::new(6).map(SocketId::index), Ok(5));
        assert_eq!(SocketId::all().count(), MAX_SOCKETS);
    }

    #[test]
    fn deserialized_ids_are_checked() {
        use serde::de::value::{Error as ValueError, U8Deserializer};
        use serde::de::IntoDeserializer;

        let id = |v: u8| {
            let de: U8Deserializer<ValueError> = v.into_deserializer();
            SocketId::deserialize(de)
        };
        assert!(id(0).is_err());
        assert!(id(7).is_err());
        assert_eq!(id(3).map(SocketId::index), Ok(2));
    }

    #[test]
    fn open_results() {
        let error = |e| SocketResult::from_resolution(ResponseStatus::Error, Some(e));
        assert_eq!(error(FinalError::NoCarrier), SocketResult::NoCarrier);
        assert_eq!(error(FinalError::Cme(3)), SocketResult::Refused);
        assert_eq!(error(FinalError::Cme(149)), SocketResult::AuthReject);
        assert_eq!(error(FinalError::Cme(563)), SocketResult::TlsError);
        assert_eq!(error(FinalError::Cme(30)), SocketResult::Unknown);
        assert_eq!(error(FinalError::Cms(3)), SocketResult::Unknown);
        assert_eq!(error(FinalError::Error), SocketResult::RequestError);
        assert_eq!(
            SocketResult::from_resolution(ResponseStatus::Timeout, None),
            SocketResult::Timeout
        );
        assert_eq!(
            SocketResult::from_resolution(ResponseStatus::Cancelled, None),
            SocketResult::Unknown
        );
    }
}
