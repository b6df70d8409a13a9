//! Correlates command answers with the single outstanding request.
//!
//! Only one request is ever in flight, so issue order is completion order.
//! Every accepted request resolves exactly once: with a final result code,
//! after its retry budget ran out, or when cancelled.

use embassy_time::{Duration, Instant};
use embedded_io::{Error as _, Write};
use heapless::{String, Vec};

use crate::error::Error;
use crate::module_timing;
use crate::socket::MAX_SEND_LEN;
use crate::digest::{Expectation, FinalError};

/// Longest command, terminator included.
pub const CMD_BUF_LEN: usize = 256;
/// Answer text kept for a request, lines are joined with `\n`.
pub const RAW_LEN: usize = 512;

/// Retries granted to free-form user commands.
pub const DEFAULT_RETRIES: u8 = 2;

pub type CommandBuf = Vec<u8, CMD_BUF_LEN>;
pub type Payload = Vec<u8, MAX_SEND_LEN>;

/// Answer shape expected from a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    /// No information text, only a final result code
    Set,
    /// Information text, possibly empty, then a final result code
    GetSet,
    /// A single answer line. The final result code may never come.
    GetSingle,
    /// Any number of answer lines up to the final result code
    GetMultiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseStatus {
    Success,
    /// Succeeded, but the answer did not fit and was truncated
    Partial,
    Timeout,
    Error,
    Cancelled,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A request ready to be submitted.
pub(crate) struct Request<O> {
    pub kind: RequestKind,
    pub command: CommandBuf,
    pub origin: O,
    pub timeout: Duration,
    pub retries: u8,
    /// Written when the modem prompts for data
    pub payload: Option<Payload>,
}

impl<O> Request<O> {
    /// Encodes a typed command, taking timeout and attempts from its
    /// definition.
    pub fn from_cmd<C: atat::AtatCmd>(cmd: &C, kind: RequestKind, origin: O) -> Result<Self, Error> {
        if C::MAX_LEN > CMD_BUF_LEN {
            return Err(Error::Overflow);
        }
        let mut buf = [0u8; CMD_BUF_LEN];
        let len = cmd.write(&mut buf);
        Ok(Self {
            kind,
            command: Vec::from_slice(&buf[..len]).map_err(|_| Error::Overflow)?,
            origin,
            timeout: Duration::from_millis(C::MAX_TIMEOUT_MS as u64),
            retries: C::ATTEMPTS.saturating_sub(1),
            payload: None,
        })
    }

    /// Free-form command text. A missing line terminator is added.
    pub fn from_text(text: &str, kind: RequestKind, origin: O) -> Result<Self, Error> {
        let text = text.trim_end_matches(|c| c == '\r' || c == '\n');
        if text.is_empty() {
            return Err(Error::InvalidParameter);
        }
        let mut command = CommandBuf::new();
        command
            .extend_from_slice(text.as_bytes())
            .and_then(|_| command.extend_from_slice(b"\r\n"))
            .map_err(|_| Error::Overflow)?;
        Ok(Self {
            kind,
            command,
            origin,
            timeout: module_timing::user_command_timeout(),
            retries: DEFAULT_RETRIES,
            payload: None,
        })
    }

    pub fn with_payload(mut self, data: &[u8]) -> Result<Self, Error> {
        self.payload = Some(Payload::from_slice(data).map_err(|_| Error::InvalidParameter)?);
        Ok(self)
    }
}

/// Outcome of an accepted request.
#[derive(Debug)]
pub struct Resolved<O> {
    pub origin: O,
    pub status: ResponseStatus,
    /// Answer lines received before resolution
    pub raw: String<RAW_LEN>,
    pub error: Option<FinalError>,
}

struct PendingRequest<O> {
    kind: RequestKind,
    command: CommandBuf,
    origin: O,
    timeout: Duration,
    deadline: Instant,
    retries_left: u8,
    payload: Option<Payload>,
    payload_sent: bool,
    raw: String<RAW_LEN>,
    answered: bool,
    truncated: bool,
}

impl<O> PendingRequest<O> {
    fn resolve(self, status: ResponseStatus, error: Option<FinalError>) -> Resolved<O> {
        Resolved {
            origin: self.origin,
            status,
            raw: self.raw,
            error,
        }
    }

    fn push_answer(&mut self, line: &str) {
        let fits = (self.raw.is_empty() || self.raw.push('\n').is_ok())
            && self.raw.push_str(line).is_ok();
        self.truncated |= !fits;
    }
}

/// The prefix a modem uses when answering `command`, e.g. `+CSQ` for
/// `AT+CSQ\r\n` or `+CEREG` for `AT+CEREG?`.
pub(crate) fn answer_prefix(command: &[u8]) -> Option<&[u8]> {
    let body = command.strip_prefix(b"AT")?;
    if body.first() != Some(&b'+') {
        return None;
    }
    let end = body
        .iter()
        .position(|c| matches!(c, b'=' | b'?' | b'\r' | b'\n'))
        .unwrap_or(body.len());
    Some(&body[..end])
}

fn transmit<W: Write>(tx: &mut W, bytes: &[u8]) -> Result<(), Error> {
    tx.write_all(bytes).map_err(|e| Error::Transport(e.kind()))?;
    tx.flush().map_err(|e| Error::Transport(e.kind()))
}

pub(crate) struct RequestEngine<O> {
    pending: Option<PendingRequest<O>>,
}

impl<O> Default for RequestEngine<O> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<O> RequestEngine<O> {
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn origin(&self) -> Option<&O> {
        self.pending.as_ref().map(|p| &p.origin)
    }

    /// Command text of the pending request.
    pub fn outstanding(&self) -> Option<&[u8]> {
        self.pending.as_ref().map(|p| p.command.as_slice())
    }

    /// Writes the command and makes it the pending request.
    ///
    /// Fails with [`Error::Busy`] without touching the transport while
    /// another request is pending. A failed write leaves nothing pending.
    pub fn submit<W: Write>(&mut self, tx: &mut W, now: Instant, req: Request<O>) -> Result<(), Error> {
        if self.pending.is_some() {
            return Err(Error::Busy);
        }

        trace!("--> {:?}", core::str::from_utf8(&req.command).unwrap_or("<bin>").trim_end());
        transmit(tx, &req.command)?;

        self.pending = Some(PendingRequest {
            kind: req.kind,
            command: req.command,
            origin: req.origin,
            timeout: req.timeout,
            deadline: now + req.timeout,
            retries_left: req.retries,
            payload: req.payload,
            payload_sent: false,
            raw: String::new(),
            answered: false,
            truncated: false,
        });
        Ok(())
    }

    /// What the pending request expects from the modem.
    pub fn expectation(&self) -> Option<Expectation<'_>> {
        self.pending.as_ref().map(|p| Expectation {
            kind: p.kind,
            prefix: answer_prefix(&p.command),
        })
    }

    /// Accumulates a line of information text.
    ///
    /// A get-single request keeps its first line only and resolves once the
    /// linger delay expires, if no final result code came by then.
    pub fn on_answer(&mut self, line: &str, now: Instant) {
        let Some(pending) = self.pending.as_mut() else {
            trace!("Answer without a pending request: {:?}", line);
            return;
        };
        match pending.kind {
            RequestKind::Set => {
                debug!("Unexpected answer to a set command: {:?}", line);
                pending.push_answer(line);
            }
            RequestKind::GetSingle if pending.answered => {}
            RequestKind::GetSingle => {
                pending.push_answer(line);
                pending.deadline = now + module_timing::single_answer_linger();
            }
            RequestKind::GetSet | RequestKind::GetMultiple => pending.push_answer(line),
        }
        pending.answered = true;
    }

    /// Resolves the pending request with its final result code.
    ///
    /// `truncated` tells that information text was lost before reaching
    /// the engine.
    pub fn on_final(
        &mut self,
        result: Result<(), FinalError>,
        truncated: bool,
    ) -> Option<Resolved<O>> {
        let Some(pending) = self.pending.take() else {
            trace!("Final result code without a pending request");
            return None;
        };
        match result {
            Ok(()) if pending.truncated || truncated => {
                Some(pending.resolve(ResponseStatus::Partial, None))
            }
            Ok(()) => Some(pending.resolve(ResponseStatus::Success, None)),
            Err(e) => {
                debug!("Command failed: {:?}", e);
                Some(pending.resolve(ResponseStatus::Error, Some(e)))
            }
        }
    }

    /// Writes the payload of the pending request after a `>` prompt.
    pub fn on_prompt<W: Write>(&mut self, tx: &mut W) -> Option<Resolved<O>> {
        let pending = self.pending.as_mut()?;
        if pending.payload_sent {
            return None;
        }
        let Some(payload) = pending.payload.as_ref() else {
            warn!("Prompt without a payload to send");
            return None;
        };

        pending.payload_sent = true;
        match transmit(tx, payload) {
            Ok(()) => None,
            Err(e) => {
                error!("Payload write failed: {:?}", e);
                self.pending
                    .take()
                    .map(|p| p.resolve(ResponseStatus::Error, None))
            }
        }
    }

    /// Handles the deadline of the pending request.
    ///
    /// An expired get-single request that captured its answer succeeds.
    /// Otherwise the command is sent again while retries remain, and the
    /// request times out once they are spent.
    pub fn poll<W: Write>(&mut self, tx: &mut W, now: Instant) -> Option<Resolved<O>> {
        let pending = self.pending.as_mut()?;
        if now < pending.deadline {
            return None;
        }

        if pending.kind == RequestKind::GetSingle && pending.answered {
            return self
                .pending
                .take()
                .map(|p| p.resolve(ResponseStatus::Success, None));
        }

        if pending.retries_left == 0 || pending.payload_sent {
            warn!("Command timed out");
            return self
                .pending
                .take()
                .map(|p| p.resolve(ResponseStatus::Timeout, None));
        }

        pending.retries_left -= 1;
        pending.raw.clear();
        pending.answered = false;
        pending.truncated = false;
        pending.deadline = now + pending.timeout;
        debug!("Retrying command, {} retries left", pending.retries_left);

        match transmit(tx, &pending.command) {
            Ok(()) => None,
            Err(e) => {
                error!("Retry write failed: {:?}", e);
                self.pending
                    .take()
                    .map(|p| p.resolve(ResponseStatus::Error, None))
            }
        }
    }

    /// Drops the pending request, resolving it as cancelled.
    pub fn cancel(&mut self) -> Option<Resolved<O>> {
        self.pending
            .take()
            .map(|p| p.resolve(ResponseStatus::Cancelled, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::mobile_control::GetSignalQuality;
    use crate::test_helpers::MockTransport;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn csq(origin: u32) -> Request<u32> {
        Request::from_cmd(&GetSignalQuality, RequestKind::GetSet, origin).unwrap()
    }

    #[test]
    fn typed_command_encoding() {
        let req = csq(1);
        assert_eq!(&req.command[..], b"AT+CSQ\r\n");
        assert_eq!(req.timeout, Duration::from_millis(1000));
        assert_eq!(req.retries, 1);
    }

    #[test]
    fn prefix_of_command() {
        assert_eq!(answer_prefix(b"AT+CSQ\r\n"), Some(&b"+CSQ"[..]));
        assert_eq!(answer_prefix(b"AT+CEREG?\r\n"), Some(&b"+CEREG"[..]));
        assert_eq!(answer_prefix(b"AT+SMCWRX=6300\r\n"), Some(&b"+SMCWRX"[..]));
        assert_eq!(answer_prefix(b"ATI1\r\n"), None);
        assert_eq!(answer_prefix(b"AT\r\n"), None);
    }

    #[test]
    fn answer_then_ok() {
        let mut tx = MockTransport::default();
        let mut engine = RequestEngine::default();
        assert!(engine.expectation().is_none());
        engine.submit(&mut tx, at(0), csq(7)).unwrap();
        assert_eq!(tx.written(), b"AT+CSQ\r\n");

        let expect = engine.expectation().unwrap();
        assert_eq!(expect.kind, RequestKind::GetSet);
        assert_eq!(expect.prefix, Some(&b"+CSQ"[..]));

        engine.on_answer("+CSQ: 20,99", at(2));
        let r = engine.on_final(Ok(()), false).unwrap();
        assert_eq!(r.origin, 7);
        assert_eq!(r.status, ResponseStatus::Success);
        assert_eq!(r.raw.as_str(), "+CSQ: 20,99");
        assert!(!engine.is_busy());
        assert!(engine.on_final(Ok(()), false).is_none());
    }

    #[test]
    fn second_request_is_busy_without_transmit() {
        let mut tx = MockTransport::default();
        let mut engine = RequestEngine::default();
        engine.submit(&mut tx, at(0), csq(1)).unwrap();
        tx.clear();

        assert_eq!(engine.submit(&mut tx, at(1), csq(2)), Err(Error::Busy));
        assert!(tx.written().is_empty());
        assert_eq!(engine.origin(), Some(&1));
    }

    #[test]
    fn error_keeps_partial_answer() {
        let mut tx = MockTransport::default();
        let mut engine = RequestEngine::default();
        let req = Request::from_text("AT+SQNCCID?", RequestKind::GetMultiple, 3).unwrap();
        engine.submit(&mut tx, at(0), req).unwrap();
        assert_eq!(tx.written(), b"AT+SQNCCID?\r\n");

        engine.on_answer("+SQNCCID: \"8944\"", at(1));
        let r = engine.on_final(Err(FinalError::Cme(10)), false).unwrap();
        assert_eq!(r.status, ResponseStatus::Error);
        assert_eq!(r.error, Some(FinalError::Cme(10)));
        assert_eq!(r.raw.as_str(), "+SQNCCID: \"8944\"");
    }

    #[test]
    fn timeout_once_after_retries() {
        let mut tx = MockTransport::default();
        let mut engine = RequestEngine::default();
        let req = Request::from_text("AT+CSQ", RequestKind::GetSet, 9).unwrap();
        engine.submit(&mut tx, at(0), req).unwrap();

        let mut resolutions = std::vec::Vec::new();
        for ms in (0..=30_000).step_by(100) {
            if let Some(r) = engine.poll(&mut tx, at(ms)) {
                resolutions.push((ms, r.status));
            }
        }

        // Initial write plus two retries
        assert_eq!(tx.written().len(), 3 * b"AT+CSQ\r\n".len());
        assert_eq!(resolutions, vec![(15_000, ResponseStatus::Timeout)]);
        assert!(engine.cancel().is_none());
    }

    #[test]
    fn get_single_resolves_after_linger() {
        let mut tx = MockTransport::default();
        let mut engine = RequestEngine::default();
        let req = Request::from_cmd(&GetSignalQuality, RequestKind::GetSingle, 4).unwrap();
        engine.submit(&mut tx, at(0), req).unwrap();

        engine.on_answer("+CSQ: 18,99", at(100));
        engine.on_answer("+CSQ: 19,99", at(150));
        assert!(engine.poll(&mut tx, at(399)).is_none());
        let r = engine.poll(&mut tx, at(400)).unwrap();
        assert_eq!(r.status, ResponseStatus::Success);
        assert_eq!(r.raw.as_str(), "+CSQ: 18,99");
    }

    #[test]
    fn payload_written_on_prompt() {
        let mut tx = MockTransport::default();
        let mut engine = RequestEngine::default();
        let req = Request::from_text("AT+SQNSSENDEXT=1,3", RequestKind::Set, 0)
            .unwrap()
            .with_payload(b"abc")
            .unwrap();
        engine.submit(&mut tx, at(0), req).unwrap();
        tx.clear();

        assert!(engine.on_prompt(&mut tx).is_none());
        assert_eq!(tx.written(), b"abc");
        assert!(engine.on_prompt(&mut tx).is_none());
        assert_eq!(tx.written(), b"abc");
        assert_eq!(
            engine.on_final(Ok(()), false).map(|r| r.status),
            Some(ResponseStatus::Success)
        );
    }

    #[test]
    fn failed_write_leaves_nothing_pending() {
        let mut tx = MockTransport::default();
        tx.fail_writes(true);
        let mut engine = RequestEngine::default();
        assert!(matches!(
            engine.submit(&mut tx, at(0), csq(1)),
            Err(Error::Transport(_))
        ));
        assert!(!engine.is_busy());
    }

    #[test]
    fn cancel_resolves_once() {
        let mut tx = MockTransport::default();
        let mut engine = RequestEngine::default();
        engine.submit(&mut tx, at(0), csq(5)).unwrap();

        let r = engine.cancel().unwrap();
        assert_eq!((r.origin, r.status), (5, ResponseStatus::Cancelled));
        assert!(engine.cancel().is_none());
        assert!(engine.on_final(Ok(()), false).is_none());
    }

    #[test]
    fn answer_overflow_is_partial() {
        let mut tx = MockTransport::default();
        let mut engine = RequestEngine::default();
        let req = Request::from_text("AT+SQNRXTXSTATS?", RequestKind::GetMultiple, 0).unwrap();
        engine.submit(&mut tx, at(0), req).unwrap();

        let long = "x".repeat(RAW_LEN + 1);
        engine.on_answer(&long, at(1));
        assert_eq!(
            engine.on_final(Ok(()), false).map(|r| r.status),
            Some(ResponseStatus::Partial)
        );

        engine.submit(&mut tx, at(2), csq(1)).unwrap();
        assert_eq!(
            engine.on_final(Ok(()), true).map(|r| r.status),
            Some(ResponseStatus::Partial)
        );
    }
}
