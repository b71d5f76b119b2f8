//! Face abstraction.
//!
//! A face is a bidirectional packet channel. The forwarder polls faces with
//! the non-blocking [`Face::recv`] during a processing pass, so every face
//! must hand over packets without blocking. Socket-backed faces do their
//! I/O on tokio tasks and talk to the forwarder through a [`ChannelFace`].

use bytes::Bytes;
use log::{debug, trace};
use rust_ndn_lite_common::{types::FaceKind, Error};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// A packet channel the forwarder can poll and send on.
pub trait Face {
    /// Transport behind this face.
    fn kind(&self) -> FaceKind;

    /// Queue one encoded packet for transmission.
    fn send(&mut self, packet: &Bytes) -> Result<(), Error>;

    /// Next received packet, if one is ready.
    fn recv(&mut self) -> Option<Bytes>;

    /// Whether the face can no longer carry packets.
    fn is_closed(&self) -> bool;

    /// Stop the face. Later sends fail and pending receives are discarded.
    fn close(&mut self);
}

/// A face backed by a pair of unbounded channels.
///
/// The channel ends are either wired to transport tasks (UDP, Unix) or to
/// another `ChannelFace` (see [`ChannelFace::pair`]).
#[derive(Debug)]
pub struct ChannelFace {
    kind: FaceKind,
    label: String,
    outbound: Option<UnboundedSender<Bytes>>,
    inbound: UnboundedReceiver<Bytes>,
    closed: bool,
}

impl ChannelFace {
    /// Wrap an outbound sender and an inbound receiver.
    pub fn new(
        kind: FaceKind,
        label: impl Into<String>,
        outbound: UnboundedSender<Bytes>,
        inbound: UnboundedReceiver<Bytes>,
    ) -> Self {
        Self {
            kind,
            label: label.into(),
            outbound: Some(outbound),
            inbound,
            closed: false,
        }
    }

    /// Two in-memory faces wired back to back: what one sends, the other
    /// receives. No runtime is required.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self::new(FaceKind::Memory, "memory:a", a_tx, a_rx),
            Self::new(FaceKind::Memory, "memory:b", b_tx, b_rx),
        )
    }

    /// Human-readable description, e.g. `udp:127.0.0.1:6363`.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Face for ChannelFace {
    fn kind(&self) -> FaceKind {
        self.kind
    }

    fn send(&mut self, packet: &Bytes) -> Result<(), Error> {
        let sent = match &self.outbound {
            Some(tx) if !self.closed => tx.send(packet.clone()).is_ok(),
            _ => return Err(Error::Transport(format!("face {} is closed", self.label))),
        };
        if !sent {
            self.closed = true;
            return Err(Error::Transport(format!("face {} lost its transport", self.label)));
        }
        trace!("[Face {}] Queued {} bytes", self.label, packet.len());
        Ok(())
    }

    fn recv(&mut self) -> Option<Bytes> {
        if self.closed {
            return None;
        }
        match self.inbound.try_recv() {
            Ok(packet) => Some(packet),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                debug!("[Face {}] Transport disconnected", self.label);
                self.closed = true;
                None
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        debug!("[Face {}] Closing", self.label);
        self.closed = true;
        // Dropping the sender ends the transport's writer task.
        self.outbound = None;
        self.inbound.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_delivers_in_order() {
        let (mut a, mut b) = ChannelFace::pair();
        a.send(&Bytes::from_static(b"one")).unwrap();
        a.send(&Bytes::from_static(b"two")).unwrap();

        assert_eq!(b.recv().unwrap(), Bytes::from_static(b"one"));
        assert_eq!(b.recv().unwrap(), Bytes::from_static(b"two"));
        assert!(b.recv().is_none());
        assert!(a.recv().is_none());
        assert_eq!(a.kind(), FaceKind::Memory);
    }

    #[test]
    fn test_close_rejects_send() {
        let (mut a, mut b) = ChannelFace::pair();
        a.close();
        assert!(a.is_closed());
        assert!(matches!(a.send(&Bytes::from_static(b"x")), Err(Error::Transport(_))));

        // The peer notices once its inbound channel drains.
        assert!(b.recv().is_none());
        assert!(b.is_closed());
    }

    #[test]
    fn test_send_to_dropped_peer_fails() {
        let (mut a, b) = ChannelFace::pair();
        drop(b);
        assert!(a.send(&Bytes::from_static(b"x")).is_err());
        assert!(a.is_closed());
    }
}
