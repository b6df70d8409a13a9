/// Lifecycle state of the modem, as driven by [`Driver`](crate::Driver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// Not initialized, modem unpowered
    #[default]
    Off,
    /// Waiting for the modem to boot and answer `AT`
    Probing,
    /// Reading modem and SIM identity
    Initializing,
    /// Initialized, modem powered off
    Shutdown,
    Opening,
    /// Opened in normal mode, radio suspended
    Sleeping,
    Active,
    /// Resuming from `Sleeping`
    WaitWakeup,
    Closing,
    /// Modem is installing a firmware update
    Upgrading,
}

impl DriverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Probing => "probing",
            Self::Initializing => "initializing",
            Self::Shutdown => "shutdown",
            Self::Opening => "opening",
            Self::Sleeping => "sleeping",
            Self::Active => "active",
            Self::WaitWakeup => "wait_wakeup",
            Self::Closing => "closing",
            Self::Upgrading => "upgrading",
        }
    }

    /// Between `modem_open` and the end of `modem_close`. Unsolicited
    /// notifications are only delivered in these states.
    pub fn is_open(&self) -> bool {
        !matches!(
            self,
            Self::Off | Self::Probing | Self::Initializing | Self::Shutdown
        )
    }

    /// States accepting diagnostic and user commands.
    pub fn accepts_requests(&self) -> bool {
        matches!(self, Self::Active | Self::Sleeping)
    }

    /// A lifecycle sequence is running.
    pub fn in_transition(&self) -> bool {
        matches!(
            self,
            Self::Probing
                | Self::Initializing
                | Self::Opening
                | Self::WaitWakeup
                | Self::Closing
                | Self::Upgrading
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_states() {
        assert!(!DriverState::Shutdown.is_open());
        assert!(DriverState::Closing.is_open());
        assert!(DriverState::Sleeping.accepts_requests());
        assert!(!DriverState::Opening.accepts_requests());
        assert!(!DriverState::Active.in_transition());
        assert_eq!(DriverState::WaitWakeup.as_str(), "wait_wakeup");
    }
}
