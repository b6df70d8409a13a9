//! Argument and parameter types used by Mobile termination control and status Commands and Responses

use atat::atat_derive::AtatEnum;

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum Functionality {
    /// Sets the MT to minimum functionality (disable both transmit and receive RF
    /// circuits)
    Minimum = 0,
    /// Sets the MT to full functionality
    Full = 1,
    /// Disables both transmit and receive RF circuits, the SIM stays powered
    AirplaneMode = 4,
    /// RF test mode, required by the continuous wave test commands
    TestMode = 5,
}
