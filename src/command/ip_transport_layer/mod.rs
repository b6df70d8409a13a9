//! ### Sequans socket commands
//!
//! Socket traffic is multiplexed over the AT channel. Inbound data is pushed
//! in hexadecimal through the `+SQNSRING` URC, outbound data is written raw
//! after the `>` prompt of `+SQNSSENDEXT`.
pub mod types;
pub mod urc;

use super::NoResponse;
use atat::atat_derive::AtatCmd;
use types::{ClosureType, ConnectionMode, RecvDataMode, RingMode, SocketProtocol};

/// Extended socket configuration +SQNSCFGEXT
///
/// Selects how inbound data is reported for a connection id. The driver asks
/// for the data to be carried, hex encoded, by the ring URC itself.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNSCFGEXT", NoResponse, attempts = 2, timeout_ms = 2000)]
pub struct SetSocketConfigExt {
    #[at_arg(position = 0)]
    pub sid: u8,
    #[at_arg(position = 1)]
    pub ring_mode: RingMode,
    #[at_arg(position = 2)]
    pub recv_data_mode: RecvDataMode,
    #[at_arg(position = 3)]
    pub keepalive: u16,
}

/// Socket dial +SQNSD
///
/// Opens a remote connection. In command mode the final result code is only
/// returned once the connection is established or has failed.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNSD", NoResponse, attempts = 1, timeout_ms = 60000)]
pub struct SocketDial<'a> {
    #[at_arg(position = 0)]
    pub sid: u8,
    #[at_arg(position = 1)]
    pub protocol: SocketProtocol,
    #[at_arg(position = 2)]
    pub remote_port: u16,
    #[at_arg(position = 3, len = 32)]
    pub remote_addr: &'a str,
    #[at_arg(position = 4)]
    pub closure_type: ClosureType,
    #[at_arg(position = 5)]
    pub local_port: u16,
    #[at_arg(position = 6)]
    pub mode: ConnectionMode,
}

/// Socket shutdown +SQNSH
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNSH", NoResponse, attempts = 1, timeout_ms = 10000)]
pub struct SocketShutdown {
    #[at_arg(position = 0)]
    pub sid: u8,
}

/// Extended send data in command mode +SQNSSENDEXT
///
/// The modem answers with a `> ` prompt, after which exactly `len` bytes are
/// written before the final result code.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SQNSSENDEXT", NoResponse, attempts = 1, timeout_ms = 10000)]
pub struct SocketSendExt {
    #[at_arg(position = 0)]
    pub sid: u8,
    #[at_arg(position = 1)]
    pub len: u16,
}
