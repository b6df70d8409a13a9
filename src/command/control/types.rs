//! Argument and parameter types used by V.250 control and error reporting commands

use atat::atat_derive::AtatEnum;

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum Echo {
    Disable = 0,
    Enable = 1,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum TerminationErrorMode {
    /// +CME ERROR: <err> result code disabled and ERROR used
    Disabled = 0,
    /// +CME ERROR: <err> result code enabled and numeric <err> values used
    Enabled = 1,
    /// +CME ERROR: <err> result code enabled and verbose <err> values used
    Verbose = 2,
}
