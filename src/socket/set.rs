use core::slice;

use heapless::{String, Vec};

use super::{Protocol, SocketConfig, SocketId, SocketState, MAX_SOCKETS, REMOTE_MAX_LEN};
use crate::error::Error;

/// A slot of the socket set.
#[derive(Debug, Clone, Default)]
pub struct Socket {
    state: SocketState,
    protocol: Protocol,
    remote: String<REMOTE_MAX_LEN>,
    remote_port: u16,
    local_port: u16,
}

impl Socket {
    pub fn state(&self) -> SocketState {
        self.state
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn remote(&self) -> (&str, u16) {
        (&self.remote, self.remote_port)
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }
}

/// The fixed set of modem sockets, indexed by [`SocketId`].
///
/// States only move along `Closed -> Opening -> Open -> Closing -> Closed`,
/// plus `Opening -> Closed` for a failed open. [`SocketSet::reset_all`] is
/// the only way around that.
#[derive(Debug, Default)]
pub struct SocketSet {
    sockets: [Socket; MAX_SOCKETS],
}

impl SocketSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SocketId) -> &Socket {
        &self.sockets[id.index()]
    }

    pub fn state(&self, id: SocketId) -> SocketState {
        self.get(id).state
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.sockets.iter().enumerate(),
        }
    }

    /// Whether an open or close is waiting for the modem.
    pub fn in_transition(&self) -> bool {
        self.sockets
            .iter()
            .any(|s| matches!(s.state, SocketState::Opening | SocketState::Closing))
    }

    /// Claims a closed socket for `config`, moving it to `Opening`.
    pub(crate) fn begin_open(&mut self, config: &SocketConfig) -> Result<(), Error> {
        let socket = &mut self.sockets[config.id.index()];
        if socket.state != SocketState::Closed {
            return Err(Error::Busy);
        }
        *socket = Socket {
            state: SocketState::Opening,
            protocol: config.protocol,
            remote: config.remote.clone(),
            remote_port: config.remote_port,
            local_port: config.local_port,
        };
        Ok(())
    }

    pub(crate) fn transition(&mut self, id: SocketId, next: SocketState) -> Result<(), Error> {
        let socket = &mut self.sockets[id.index()];
        if !socket.state.can_become(next) {
            warn!(
                "[{}] Illegal socket transition {:?} -> {:?}",
                id.get(),
                socket.state,
                next
            );
            return Err(Error::InvalidState);
        }
        debug!("[{}] {:?} -> {:?}", id.get(), socket.state, next);
        socket.state = next;
        Ok(())
    }

    /// Forces every socket to `Closed`, returning those that were not.
    pub(crate) fn reset_all(&mut self) -> Vec<SocketId, MAX_SOCKETS> {
        let mut closed = Vec::new();
        for (id, socket) in SocketId::all().zip(self.sockets.iter_mut()) {
            if socket.state != SocketState::Closed {
                socket.state = SocketState::Closed;
                let pushed = closed.push(id).is_ok();
                debug_assert!(pushed, "socket table larger than MAX_SOCKETS");
            }
        }
        closed
    }
}

pub struct Iter<'a> {
    inner: core::iter::Enumerate<slice::Iter<'a, Socket>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (SocketId, &'a Socket);

    fn next(&mut self) -> Option<Self::Item> {
        let (i, socket) = self.inner.next()?;
        Some((SocketId(i as u8 + 1), socket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udp(id: u8) -> SocketConfig {
        SocketConfig {
            id: SocketId::new(id).unwrap(),
            protocol: Protocol::Udp,
            remote: String::try_from("10.0.0.1").unwrap(),
            remote_port: 5000,
            local_port: 0,
        }
    }

    #[test]
    fn open_close_cycle() {
        let mut set = SocketSet::new();
        let cfg = udp(2);
        let id = cfg.id;

        set.begin_open(&cfg).unwrap();
        assert_eq!(set.begin_open(&cfg), Err(Error::Busy));
        assert!(set.in_transition());
        assert_eq!(set.get(id).remote(), ("10.0.0.1", 5000));

        set.transition(id, SocketState::Open).unwrap();
        assert_eq!(
            set.transition(id, SocketState::Opening),
            Err(Error::InvalidState)
        );
        set.transition(id, SocketState::Closing).unwrap();
        set.transition(id, SocketState::Closed).unwrap();
        assert_eq!(set.state(id), SocketState::Closed);
        assert!(!set.in_transition());
    }

    #[test]
    fn reset_reports_non_closed() {
        let mut set = SocketSet::new();
        set.begin_open(&udp(1)).unwrap();
        set.begin_open(&udp(4)).unwrap();
        set.transition(SocketId::new(4).unwrap(), SocketState::Open)
            .unwrap();

        let closed = set.reset_all();
        assert_eq!(
            closed.as_slice(),
            &[SocketId::new(1).unwrap(), SocketId::new(4).unwrap()]
        );
        assert!(set.iter().all(|(_, s)| s.state() == SocketState::Closed));
        assert!(set.reset_all().is_empty());
    }
}
