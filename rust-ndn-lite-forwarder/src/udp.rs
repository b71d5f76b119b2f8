//! UDP faces.
//!
//! Both variants run a reader and a writer task on the current tokio
//! runtime and expose the socket to the forwarder as a [`ChannelFace`].

use bytes::Bytes;
use log::{debug, info, trace, warn};
use rust_ndn_lite_common::{ndn::MAX_NDN_PACKET_SIZE, types::FaceKind, Error};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};
use tokio::{net::UdpSocket, sync::mpsc};

use crate::face::ChannelFace;

/// Default multicast group used by group producers and consumers.
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 23, 170);

/// Default UDP port for NDN traffic.
pub const DEFAULT_MULTICAST_PORT: u16 = 56363;

/// Open a point-to-point face bound to `local` that exchanges packets with
/// `remote` only.
pub async fn unicast(local: SocketAddr, remote: SocketAddr) -> Result<ChannelFace, Error> {
    let socket = UdpSocket::bind(local).await?;
    socket.connect(remote).await?;
    info!("UDP face {} <-> {}", socket.local_addr()?, remote);
    Ok(spawn(socket, None, FaceKind::UdpUnicast, format!("udp:{}", remote)))
}

/// Open a face bound to `port` and joined to the multicast `group`.
/// Packets are sent to the group and looped back to local listeners. The
/// port is shared, so several group members can run on one host.
pub async fn multicast(group: Ipv4Addr, port: u16) -> Result<ChannelFace, Error> {
    if !group.is_multicast() {
        return Err(Error::Transport(format!("{} is not a multicast address", group)));
    }
    let socket = bind_shared(port)?;
    socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)?;
    socket.set_multicast_loop_v4(true)?;
    info!("UDP multicast face joined {}:{}", group, port);
    let dest = SocketAddr::V4(SocketAddrV4::new(group, port));
    Ok(spawn(socket, Some(dest), FaceKind::UdpMulticast, format!("udp-mcast:{}", dest)))
}

/// Bind a UDP socket on all interfaces with `SO_REUSEADDR` set.
fn bind_shared(port: u16) -> Result<UdpSocket, Error> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)).into())?;
    Ok(UdpSocket::from_std(socket.into())?)
}

/// Unicast sockets are connected and send without a destination.
fn spawn(socket: UdpSocket, dest: Option<SocketAddr>, kind: FaceKind, label: String) -> ChannelFace {
    let socket = Arc::new(socket);
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Bytes>();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();

    let reader = Arc::clone(&socket);
    let reader_label = label.clone();
    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_NDN_PACKET_SIZE];
        loop {
            match reader.recv_from(&mut buf).await {
                Ok((len, from)) => {
                    if inbound_tx.send(Bytes::copy_from_slice(&buf[..len])).is_err() {
                        break;
                    }
                    trace!("[Face {}] {} bytes from {}", reader_label, len, from);
                }
                Err(e) => {
                    // Connected sockets report ICMP errors here; keep reading.
                    warn!("[Face {}] Receive error: {}", reader_label, e);
                    if inbound_tx.is_closed() {
                        break;
                    }
                }
            }
        }
        debug!("[Face {}] Reader stopped", reader_label);
    });

    let writer_label = label.clone();
    tokio::spawn(async move {
        while let Some(packet) = outbound_rx.recv().await {
            let sent = match dest {
                Some(dest) => socket.send_to(&packet, dest).await,
                None => socket.send(&packet).await,
            };
            if let Err(e) = sent {
                warn!("[Face {}] Send error: {}", writer_label, e);
            }
        }
        debug!("[Face {}] Writer stopped", writer_label);
    });

    ChannelFace::new(kind, label, outbound_tx, inbound_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::Face;
    use std::time::Duration;

    async fn recv_within(face: &mut ChannelFace, wait: Duration) -> Option<Bytes> {
        let deadline = tokio::time::Instant::now() + wait;
        while tokio::time::Instant::now() < deadline {
            if let Some(packet) = face.recv() {
                return Some(packet);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_unicast_pair() {
        let a_sock = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let b_sock = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let a_addr = a_sock.local_addr().unwrap();
        let b_addr = b_sock.local_addr().unwrap();
        drop((a_sock, b_sock));

        let mut a = unicast(a_addr, b_addr).await.unwrap();
        let mut b = unicast(b_addr, a_addr).await.unwrap();
        assert_eq!(a.kind(), FaceKind::UdpUnicast);

        a.send(&Bytes::from_static(b"\x05\x00")).unwrap();
        let got = recv_within(&mut b, Duration::from_secs(2)).await;
        assert_eq!(got, Some(Bytes::from_static(b"\x05\x00")));
    }

    #[tokio::test]
    async fn test_group_port_is_shared() {
        let first = bind_shared(0).unwrap();
        let port = first.local_addr().unwrap().port();
        let second = bind_shared(port).unwrap();
        assert_eq!(second.local_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_multicast_rejects_unicast_group() {
        let result = multicast(Ipv4Addr::LOCALHOST, 0).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
