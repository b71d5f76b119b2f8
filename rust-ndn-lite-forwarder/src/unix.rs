//! Unix stream face to a local forwarding daemon.
//!
//! The stream carries back-to-back TLV packets; the reader task splits the
//! byte stream on TLV boundaries before handing packets to the forwarder.

use bytes::{Buf, Bytes, BytesMut};
use log::{debug, info, warn};
use rust_ndn_lite_common::{ndn::MAX_NDN_PACKET_SIZE, tlv, types::FaceKind, Error};
use std::path::Path;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
    sync::mpsc,
};

use crate::face::ChannelFace;

/// Socket path of a stock local forwarding daemon.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/nfd.sock";

/// Connect to the daemon listening on `path`.
pub async fn connect(path: impl AsRef<Path>) -> Result<ChannelFace, Error> {
    let path = path.as_ref();
    let stream = UnixStream::connect(path)
        .await
        .map_err(|e| Error::Transport(format!("cannot connect to {}: {}", path.display(), e)))?;
    info!("Unix face connected to {}", path.display());
    Ok(from_stream(stream, format!("unix:{}", path.display())))
}

/// Wrap an already connected stream.
pub fn from_stream(stream: UnixStream, label: String) -> ChannelFace {
    let (mut read_half, mut write_half) = stream.into_split();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Bytes>();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();

    let reader_label = label.clone();
    tokio::spawn(async move {
        let mut buf = BytesMut::with_capacity(MAX_NDN_PACKET_SIZE);
        'read: loop {
            match read_half.read_buf(&mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("[Face {}] Read error: {}", reader_label, e);
                    break;
                }
            }
            loop {
                match tlv::frame_len(&buf) {
                    Ok(Some(len)) if len > MAX_NDN_PACKET_SIZE => {
                        warn!("[Face {}] Oversized frame of {} bytes, closing", reader_label, len);
                        break 'read;
                    }
                    Ok(Some(len)) if buf.len() >= len => {
                        let packet = buf.split_to(len).freeze();
                        if inbound_tx.send(packet).is_err() {
                            break 'read;
                        }
                    }
                    Ok(_) => break,
                    Err(e) => {
                        warn!("[Face {}] Stream out of sync: {}", reader_label, e);
                        break 'read;
                    }
                }
            }
        }
        debug!("[Face {}] Reader stopped", reader_label);
    });

    let writer_label = label.clone();
    tokio::spawn(async move {
        while let Some(mut packet) = outbound_rx.recv().await {
            while packet.has_remaining() {
                match write_half.write_buf(&mut packet).await {
                    Ok(0) => return,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("[Face {}] Write error: {}", writer_label, e);
                        return;
                    }
                }
            }
        }
        debug!("[Face {}] Writer stopped", writer_label);
    });

    ChannelFace::new(FaceKind::Unix, label, outbound_tx, inbound_rx)
}
