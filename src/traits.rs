use embassy_time::Instant;

use crate::notification::Notification;
use crate::response::{InitStatus, Response};

/// Monotonic time source for deadlines and usage accounting.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Receiver of everything the driver reports asynchronously.
///
/// Methods are only ever called from within [`Driver`](crate::Driver)
/// operations, one at a time.
pub trait EventHandler {
    /// Outcome of `init`.
    fn on_init(&mut self, _status: InitStatus) {}

    /// Completion of a request started with a `user_arg`, called exactly once
    /// per accepted request.
    fn on_response(&mut self, _user_arg: u32, _response: &Response<'_>) {}

    /// `user_arg` is the one of the [`ModemConfig`](crate::config::ModemConfig)
    /// the modem was opened with.
    fn on_notification(&mut self, _notification: &Notification<'_>, _user_arg: u32) {}
}
