//! Argument and parameter types used by the socket Commands and Responses
use atat::atat_derive::AtatEnum;

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum SocketProtocol {
    TCP = 0,
    UDP = 1,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum RingMode {
    /// `+SQNSRING: <connId>`
    Notify = 0,
    /// `+SQNSRING: <connId>,<recData>`
    WithLength = 1,
    /// `+SQNSRING: <connId>,<recData>,<data>`
    WithData = 2,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum RecvDataMode {
    Text = 0,
    Hex = 1,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum ClosureType {
    /// Local host closes immediately when the remote host has closed
    Immediate = 0,
    /// Local host closes after an escape sequence
    Escape = 255,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum ConnectionMode {
    Online = 0,
    Command = 1,
}

impl From<crate::socket::Protocol> for SocketProtocol {
    fn from(p: crate::socket::Protocol) -> Self {
        match p {
            crate::socket::Protocol::Tcp => Self::TCP,
            crate::socket::Protocol::Udp => Self::UDP,
        }
    }
}
