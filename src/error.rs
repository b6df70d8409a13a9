use embedded_io::ErrorKind;

/// Errors returned synchronously by driver operations.
///
/// Outcomes of accepted requests are never reported through this type, they
/// are delivered to the [`EventHandler`](crate::EventHandler) as a
/// [`ResponseStatus`](crate::request::ResponseStatus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Operation is not legal in the current driver state
    InvalidState,
    /// A request is already outstanding, or the resource is in use
    Busy,
    Timeout,
    /// The modem answered with an error result code
    Rejected,
    /// Writing to the serial transport failed
    Transport(ErrorKind),
    InvalidParameter,
    /// Command or payload does not fit the driver buffers
    Overflow,
    IoPin,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::InvalidState => defmt::write!(f, "InvalidState"),
            Self::Busy => defmt::write!(f, "Busy"),
            Self::Timeout => defmt::write!(f, "Timeout"),
            Self::Rejected => defmt::write!(f, "Rejected"),
            Self::Transport(e) => defmt::write!(f, "Transport({:?})", e),
            Self::InvalidParameter => defmt::write!(f, "InvalidParameter"),
            Self::Overflow => defmt::write!(f, "Overflow"),
            Self::IoPin => defmt::write!(f, "IoPin"),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidState => f.write_str("operation not allowed in this state"),
            Self::Busy => f.write_str("busy"),
            Self::Timeout => f.write_str("timed out"),
            Self::Rejected => f.write_str("rejected by the modem"),
            Self::Transport(e) => write!(f, "transport error: {:?}", e),
            Self::InvalidParameter => f.write_str("invalid parameter"),
            Self::Overflow => f.write_str("buffer overflow"),
            Self::IoPin => f.write_str("pin error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(e: ErrorKind) -> Self {
        Self::Transport(e)
    }
}
