//! Frames the modem byte stream with the `atat` digester.
//!
//! [`Ingress`] buffers received bytes and hands out one [`Frame`] at a time.
//! Unsolicited result codes are recognized at the head of the buffer before
//! any final result code, except for the information text of the outstanding
//! query, which is claimed first by its answer prefix.

use atat::digest::parser::{echo, trim_start_ascii_space, urc_helper};
use atat::digest::ParseError;
use atat::helpers::LossyStr;
use atat::nom::bytes::complete::{tag, take_until};
use atat::nom::character::complete::{digit1, line_ending, space0};
use atat::nom::combinator::recognize;
use atat::nom::sequence::tuple;
use atat::nom::IResult;
use atat::{AtDigester, AtatUrc, ConnectionError, DigestResult, Digester, InternalError};
use heapless::Vec;

use crate::command::Urc;
use crate::request::RequestKind;

/// Receive buffer. A `+SQNSRING` carrying a full 255 byte payload in hex
/// needs a bit more than 520 bytes.
pub const INGRESS_BUF_LEN: usize = 1024;
/// Longest answer text handed out in one frame.
pub const LINE_LEN: usize = 512;

pub type Line = Vec<u8, LINE_LEN>;

const CME_ERROR: &[u8] = b"\r\n+CME ERROR:";
const CMS_ERROR: &[u8] = b"\r\n+CMS ERROR:";

/// Error final result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FinalError {
    Error,
    Cme(u16),
    Cms(u16),
    NoCarrier,
}

impl FinalError {
    /// Decodes a `+CME ERROR: <n>` / `+CMS ERROR: <n>` line.
    fn from_error_line(line: &[u8]) -> Self {
        let code = |rest: &[u8]| {
            core::str::from_utf8(rest)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or_default()
        };
        if let Some(rest) = line.strip_prefix(&CME_ERROR[2..]) {
            Self::Cme(code(rest))
        } else if let Some(rest) = line.strip_prefix(&CMS_ERROR[2..]) {
            Self::Cms(code(rest))
        } else {
            Self::Error
        }
    }
}

impl From<InternalError<'_>> for FinalError {
    fn from(e: InternalError<'_>) -> Self {
        match e {
            InternalError::CmeError(e) => Self::Cme(e as u16),
            InternalError::CmsError(e) => Self::Cms(e as u16),
            InternalError::ConnectionError(ConnectionError::NoCarrier) => Self::NoCarrier,
            InternalError::Custom(line) => Self::from_error_line(line),
            _ => Self::Error,
        }
    }
}

/// Numeric `+CME ERROR` / `+CMS ERROR` results, keeping the Sequans codes
/// that [`atat::CmeError`] does not list.
fn numeric_error(buf: &[u8]) -> Result<(&[u8], usize), ParseError> {
    for token in [CME_ERROR, CMS_ERROR] {
        let parsed: IResult<&[u8], (&[u8], &[u8], &[u8])> = tuple((
            take_until(token),
            recognize(tuple((tag(token), space0, digit1))),
            line_ending,
        ))(buf);
        if let Ok((rest, (_, line, _))) = parsed {
            return Ok((&line[2..], buf.len() - rest.len()));
        }
    }
    Err(ParseError::NoMatch)
}

#[derive(Debug)]
pub enum Frame {
    Urc(Urc),
    /// Information text carrying the answer prefix of the outstanding
    /// command, or the single line of a get-single query
    Answer(Line),
    /// Final result code, with the information text received before it
    Response {
        result: Result<Line, FinalError>,
        truncated: bool,
    },
    /// The modem asks for payload data
    Prompt,
}

/// What the outstanding request expects, see
/// [`RequestEngine::expectation`](crate::request::RequestEngine::expectation).
#[derive(Debug, Clone, Copy)]
pub struct Expectation<'a> {
    pub kind: RequestKind,
    /// `+XXX` prefix of the information text, when the command has one
    pub prefix: Option<&'a [u8]>,
}

pub struct Ingress {
    buf: Vec<u8, INGRESS_BUF_LEN>,
    digester: AtDigester<Urc>,
}

impl Default for Ingress {
    fn default() -> Self {
        Self::new()
    }
}

impl Ingress {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            digester: AtDigester::<Urc>::new().with_custom_error(numeric_error),
        }
    }

    /// Appends as much of `bytes` as fits, returning how many were taken.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let len = bytes.len().min(self.buf.capacity() - self.buf.len());
        // Bounded by the free capacity
        self.buf.extend_from_slice(&bytes[..len]).ok();
        len
    }

    pub fn is_full(&self) -> bool {
        self.buf.is_full()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Takes the next complete frame out of the buffer.
    pub fn next_frame(&mut self, expect: Option<Expectation<'_>>) -> Option<Frame> {
        loop {
            if self.buf.is_empty() {
                return None;
            }
            // Blank lines between frames
            if self.buf.starts_with(b"\r\n\r\n") {
                self.consume(2);
                continue;
            }

            if let Some((line, len)) = self.answer_line(expect) {
                let frame = Frame::Answer(truncate(line).0);
                self.consume(len);
                return Some(frame);
            }

            let (frame, swallowed) = match self.digester.digest(&self.buf) {
                (DigestResult::Urc(line), swallowed) => match <Urc as AtatUrc>::parse(line) {
                    Some(urc) => {
                        debug!("Received URC: {:?}", LossyStr(line));
                        (Some(Frame::Urc(urc)), swallowed)
                    }
                    None => {
                        warn!("Malformed URC: {:?}", LossyStr(line));
                        (None, swallowed)
                    }
                },
                (DigestResult::Response(Ok(data)), swallowed) => {
                    let (data, truncated) = truncate(data);
                    let frame = Frame::Response {
                        result: Ok(data),
                        truncated,
                    };
                    (Some(frame), swallowed)
                }
                (DigestResult::Response(Err(e)), swallowed) => {
                    let frame = Frame::Response {
                        result: Err(FinalError::from(e)),
                        truncated: false,
                    };
                    (Some(frame), swallowed)
                }
                (DigestResult::Prompt(_), swallowed) => (Some(Frame::Prompt), swallowed),
                (DigestResult::None, 0) => match self.stray_line(expect) {
                    Some((Some(line), len)) => (Some(Frame::Answer(line)), len),
                    Some((None, len)) => (None, len),
                    None => return None,
                },
                (DigestResult::None, swallowed) => {
                    trace!("Received echo or space: {:?}", LossyStr(&self.buf[..swallowed]));
                    (None, swallowed)
                }
            };

            self.consume(swallowed);
            if frame.is_some() {
                return frame;
            }
        }
    }

    /// The information text of an outstanding query, matched by its answer
    /// prefix ahead of the unsolicited result codes sharing that prefix.
    fn answer_line(&self, expect: Option<Expectation<'_>>) -> Option<(&[u8], usize)> {
        let expect = expect.filter(|e| e.kind != RequestKind::Set)?;
        let prefix = expect.prefix?;
        let buf = trim_start_ascii_space(&self.buf);
        let buf = echo(buf).map_or(buf, |(rest, _)| rest);
        let skipped = self.buf.len() - buf.len();
        let parsed: IResult<&[u8], (&[u8], usize)> = urc_helper(prefix)(buf);
        parsed.ok().map(|(_, (line, len))| (line, skipped + len))
    }

    /// A complete line nothing else claimed. It is the answer of an
    /// outstanding get-single query without prefix, and is dropped otherwise.
    fn stray_line(&self, expect: Option<Expectation<'_>>) -> Option<(Option<Line>, usize)> {
        let body = self.buf.strip_prefix(b"\r\n")?;
        let end = body.windows(2).position(|w| w == b"\r\n")?;
        let line = &body[..end];
        let len = end + 4;

        match expect {
            Some(e) if e.kind == RequestKind::GetSingle && !line.starts_with(b"+") => {
                Some((Some(truncate(line).0), len))
            }
            Some(_) => None,
            None => {
                debug!("Dropped unsolicited line: {:?}", LossyStr(line));
                Some((None, len))
            }
        }
    }

    fn consume(&mut self, len: usize) {
        let len = len.min(self.buf.len());
        self.buf.copy_within(len.., 0);
        self.buf.truncate(self.buf.len() - len);
    }
}

fn truncate(data: &[u8]) -> (Line, bool) {
    let len = data.len().min(LINE_LEN);
    if len < data.len() {
        warn!("Answer of {} bytes truncated", data.len());
    }
    // Bounded by the capacity
    let line = Line::from_slice(&data[..len]).unwrap_or_default();
    (line, len < data.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Renders frames as `urc`, `answer:<text>`, `ok:<text>`, `error:<code>`
    /// or `>`.
    fn feed(
        ingress: &mut Ingress,
        bytes: &[u8],
        expect: Option<Expectation<'_>>,
    ) -> std::vec::Vec<std::string::String> {
        assert_eq!(ingress.write(bytes), bytes.len());
        let mut frames = std::vec::Vec::new();
        while let Some(frame) = ingress.next_frame(expect) {
            let text = |l: &[u8]| std::string::String::from_utf8(l.to_vec()).unwrap();
            frames.push(match frame {
                Frame::Urc(_) => "urc".into(),
                Frame::Answer(line) => format!("answer:{}", text(&line)),
                Frame::Response { result: Ok(data), .. } => format!("ok:{}", text(&data)),
                Frame::Response { result: Err(e), .. } => format!("error:{:?}", e),
                Frame::Prompt => ">".into(),
            });
        }
        frames
    }

    fn query(prefix: &'static [u8]) -> Option<Expectation<'static>> {
        Some(Expectation {
            kind: RequestKind::GetSet,
            prefix: Some(prefix),
        })
    }

    fn set(prefix: &'static [u8]) -> Option<Expectation<'static>> {
        Some(Expectation {
            kind: RequestKind::Set,
            prefix: Some(prefix),
        })
    }

    #[test]
    fn answer_then_ok() {
        let mut ingress = Ingress::new();
        let frames = feed(&mut ingress, b"\r\n+CSQ: 20,99\r\n\r\nOK\r\n", query(b"+CSQ"));
        assert_eq!(frames, ["answer:+CSQ: 20,99", "ok:"]);
        assert!(ingress.is_empty());
    }

    #[test]
    fn echo_is_skipped() {
        let mut ingress = Ingress::new();
        let frames = feed(&mut ingress, b"AT+CSQ\r\n+CSQ: 20,99\r\n\r\nOK\r\n", query(b"+CSQ"));
        assert_eq!(frames, ["answer:+CSQ: 20,99", "ok:"]);
    }

    #[test]
    fn text_without_prefix_comes_with_ok() {
        let mut ingress = Ingress::new();
        let expect = Some(Expectation {
            kind: RequestKind::GetSet,
            prefix: Some(&b"+CGMR"[..]),
        });
        let frames = feed(&mut ingress, b"\r\nLR8.2.1.0-61488\r\n\r\nOK\r\n", expect);
        assert_eq!(frames, ["ok:LR8.2.1.0-61488"]);
    }

    #[test]
    fn get_single_line_without_ok() {
        let mut ingress = Ingress::new();
        let expect = Some(Expectation {
            kind: RequestKind::GetSingle,
            prefix: None,
        });
        assert_eq!(
            feed(&mut ingress, b"\r\n354616090000000\r\n", expect),
            ["answer:354616090000000"]
        );
        assert!(ingress.is_empty());
    }

    #[test]
    fn urc_wins_during_set_command() {
        let mut ingress = Ingress::new();
        let frames = feed(&mut ingress, b"\r\n+SQNSH: 2\r\n\r\nOK\r\n", set(b"+SQNSH"));
        assert_eq!(frames, ["urc", "ok:"]);

        let frames = feed(&mut ingress, b"\r\n+CEREG: 1,\"00C3\",\"0A1B2C3D\",7\r\n", set(b"+CEREG"));
        assert_eq!(frames, ["urc"]);
    }

    #[test]
    fn query_claims_its_prefix() {
        let mut ingress = Ingress::new();
        let frames = feed(&mut ingress, b"\r\n+CEREG: 4,1\r\n\r\nOK\r\n", query(b"+CEREG"));
        assert_eq!(frames, ["answer:+CEREG: 4,1", "ok:"]);
    }

    #[test]
    fn urc_between_answer_lines() {
        let mut ingress = Ingress::new();
        let frames = feed(
            &mut ingress,
            b"\r\n+SQNSRING: 1,2,\"4142\"\r\n\r\n+CSQ: 20,99\r\n\r\nOK\r\n",
            query(b"+CSQ"),
        );
        assert_eq!(frames, ["urc", "answer:+CSQ: 20,99", "ok:"]);
    }

    #[test]
    fn lines_split_across_chunks() {
        let mut ingress = Ingress::new();
        assert!(feed(&mut ingress, b"\r\n+CEREG: ", None).is_empty());
        assert!(feed(&mut ingress, b"1\r", None).is_empty());
        assert_eq!(feed(&mut ingress, b"\n", None), ["urc"]);
    }

    #[test]
    fn error_result_codes() {
        let mut ingress = Ingress::new();
        assert_eq!(feed(&mut ingress, b"\r\nERROR\r\n", set(b"+CFUN")), ["error:Error"]);
        assert_eq!(
            feed(&mut ingress, b"\r\n+CME ERROR: 149\r\n", set(b"+SQNSD")),
            ["error:Cme(149)"]
        );
        assert_eq!(
            feed(&mut ingress, b"\r\n+CMS ERROR: 500\r\n", set(b"+CMGS")),
            ["error:Cms(500)"]
        );
        assert_eq!(
            feed(&mut ingress, b"\r\nNO CARRIER\r\n", set(b"+SQNSD")),
            ["error:NoCarrier"]
        );
    }

    #[test]
    fn prompt_for_payload() {
        let mut ingress = Ingress::new();
        assert_eq!(feed(&mut ingress, b"\r\n> ", set(b"+SQNSSENDEXT")), [">"]);
        assert_eq!(feed(&mut ingress, b"\r\nOK\r\n", set(b"+SQNSSENDEXT")), ["ok:"]);
    }

    #[test]
    fn unclaimed_lines_dropped_when_idle() {
        let mut ingress = Ingress::new();
        assert!(feed(&mut ingress, b"\r\n+CSQ: 20,99\r\n\r\nRING\r\n", None).is_empty());
        assert!(ingress.is_empty());
    }

    #[test]
    fn error_lines_decode() {
        assert_eq!(FinalError::from_error_line(b"+CME ERROR: 10"), FinalError::Cme(10));
        assert_eq!(FinalError::from_error_line(b"+CMS ERROR:500"), FinalError::Cms(500));
        assert_eq!(FinalError::from_error_line(b"ERROR"), FinalError::Error);
        assert_eq!(
            numeric_error(b"\r\n+CME ERROR: 149\r\n"),
            Ok((&b"+CME ERROR: 149"[..], 19))
        );
        assert_eq!(numeric_error(b"\r\n+CME ERROR: 14"), Err(ParseError::NoMatch));
    }
}
