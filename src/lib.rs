#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod command;
pub mod config;
pub mod digest;
mod driver;
pub mod error;
mod hex;
pub mod info;
mod module_timing;
pub mod notification;
pub mod power;
pub mod registration;
pub mod request;
pub mod response;
pub mod socket;
pub mod state;
pub mod traits;

#[cfg(test)]
mod test_helpers;

pub use config::{HwConfig, ModemConfig, OpenMode};
pub use driver::Driver;
pub use error::Error;
pub use notification::{Notification, NotificationKind};
pub use request::{RequestKind, ResponseStatus};
pub use response::{InitStatus, Response, ResponseData};
pub use socket::{SocketConfig, SocketId, SocketResult, SocketState};
pub use state::DriverState;
pub use traits::{Clock, EventHandler};
