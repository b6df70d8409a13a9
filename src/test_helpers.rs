//! Mocks for driving the modem state machine from tests.

use core::cell::Cell;
use core::convert::Infallible;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embassy_time::Instant;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_io::ErrorKind;

use crate::config::HwConfig;
use crate::notification::{Notification, NotificationKind};
use crate::request::ResponseStatus;
use crate::response::{InitStatus, Response, ResponseData};
use crate::socket::SocketId;
use crate::traits::{Clock, EventHandler};

/// Records everything written to the modem.
#[derive(Debug, Default)]
pub struct MockTransport {
    written: Vec<u8>,
    fail: bool,
}

impl MockTransport {
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    pub fn clear(&mut self) {
        self.written.clear();
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail = fail;
    }
}

impl embedded_io::ErrorType for MockTransport {
    type Error = ErrorKind;
}

impl embedded_io::Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Manually advanced time, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_ms: Rc<Cell<u64>>,
}

impl MockClock {
    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms.get())
    }
}

/// Keeps owned copies of every callback.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub inits: Vec<InitStatus>,
    pub responses: Vec<(u32, ResponseStatus, ResponseData)>,
    /// Raw answer text of each response
    pub raw: Vec<String>,
    /// Debug rendering of each notification
    pub notifications: Vec<String>,
    pub user_args: Vec<u32>,
    pub rx: Vec<(SocketId, Vec<u8>)>,
    kinds: Vec<NotificationKind>,
}

impl RecordingHandler {
    pub fn kinds(&self) -> &[NotificationKind] {
        &self.kinds
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl EventHandler for RecordingHandler {
    fn on_init(&mut self, status: InitStatus) {
        self.inits.push(status);
    }

    fn on_response(&mut self, user_arg: u32, response: &Response<'_>) {
        self.responses
            .push((user_arg, response.status, response.data.clone()));
        self.raw.push(response.raw.into());
    }

    fn on_notification(&mut self, notification: &Notification<'_>, user_arg: u32) {
        match notification {
            Notification::SocketRxData { id, data } => self.rx.push((*id, data.to_vec())),
            other => self.notifications.push(format!("{:?}", other)),
        }
        self.kinds.push(notification.kind());
        self.user_args.push(user_arg);
    }
}

#[derive(Debug, Default)]
pub struct MockPin {
    high: bool,
}

impl MockPin {
    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

/// Board with both pins wired, recording baud rate changes.
#[derive(Debug, Default)]
pub struct TestHw {
    pub power: MockPin,
    pub reset: MockPin,
    pub bauds: Vec<u32>,
}

impl HwConfig for TestHw {
    type PowerPin = MockPin;
    type ResetPin = MockPin;

    fn power_pin(&mut self) -> Option<&mut MockPin> {
        Some(&mut self.power)
    }

    fn reset_pin(&mut self) -> Option<&mut MockPin> {
        Some(&mut self.reset)
    }

    fn set_baud_rate(&mut self, baud: u32) {
        self.bauds.push(baud);
    }
}
