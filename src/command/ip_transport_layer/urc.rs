//! Unsolicited responses for the socket Commands
use atat::atat_derive::AtatResp;
use atat::heapless_bytes::Bytes;

/// Longest `<data>` field of a ring, a full 255 byte payload in hex plus
/// quotes fits.
pub const RING_DATA_LEN: usize = 600;

/// Socket ring +SQNSRING: `<connId>,<recData>[,<data>]` with hex `<data>`
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct SocketRing {
    #[at_arg(position = 0)]
    pub sid: u8,
    #[at_arg(position = 1)]
    pub len: u16,
    #[at_arg(position = 2)]
    pub data: Option<Bytes<RING_DATA_LEN>>,
}

impl SocketRing {
    /// Hex payload, without the quotes some firmware versions add.
    pub fn hex(&self) -> &[u8] {
        let data = self.data.as_ref().map_or(&[][..], |d| d.as_slice());
        data.strip_prefix(b"\"")
            .and_then(|d| d.strip_suffix(b"\""))
            .unwrap_or(data)
    }
}

/// Socket shutdown +SQNSH, the remote end closed the connection
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct SocketClosed {
    #[at_arg(position = 0)]
    pub sid: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_with_data() {
        let ring: SocketRing = atat::serde_at::from_slice(b"+SQNSRING: 1,5,48656C6C6F").unwrap();
        assert_eq!((ring.sid, ring.len), (1, 5));
        assert_eq!(ring.hex(), b"48656C6C6F");

        let ring: SocketRing = atat::serde_at::from_slice(b"+SQNSRING: 2,2,\"4142\"").unwrap();
        assert_eq!(ring.hex(), b"4142");

        let ring: SocketRing = atat::serde_at::from_slice(b"+SQNSRING: 3,12").unwrap();
        assert_eq!(ring.data, None);
        assert!(ring.hex().is_empty());

        assert!(atat::serde_at::from_slice::<SocketRing>(b"+SQNSRING: x").is_err());
    }

    #[test]
    fn remote_close() {
        assert_eq!(
            atat::serde_at::from_slice(b"+SQNSH: 3"),
            Ok(SocketClosed { sid: 3 })
        );
        assert!(atat::serde_at::from_slice::<SocketClosed>(b"+SQNSH: ").is_err());
    }
}
