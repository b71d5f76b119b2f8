//! Subcommand implementations.

pub mod consumer;
pub mod light;
pub mod producer;

use anyhow::{Context, Result};
use clap::Args;
use rust_ndn_lite_common::Name;
use rust_ndn_lite_forwarder::{udp, ChannelFace};
use std::net::{Ipv4Addr, SocketAddr};

use crate::utils::{parse_group, parse_name, parse_port, resolve_host};

/// Point-to-point UDP face plus the name to serve or fetch.
#[derive(Args, Debug)]
pub struct UnicastArgs {
    /// Local UDP port
    pub local_port: String,

    /// Remote host name or address
    pub remote_host: String,

    /// Remote UDP port
    pub remote_port: String,

    /// Name prefix (NDN URI format)
    pub name: String,
}

impl UnicastArgs {
    pub async fn open(&self) -> Result<(ChannelFace, Name)> {
        // Hostname, then ports, then name: the first bad one sets the exit code.
        let mut remote = resolve_host(&self.remote_host, 0).await?;
        let local_port = parse_port(&self.local_port)?;
        remote.set_port(parse_port(&self.remote_port)?);
        let name = parse_name(&self.name)?;

        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, local_port));
        let face = udp::unicast(local, remote)
            .await
            .with_context(|| format!("Failed to open UDP face to {}", remote))?;
        Ok((face, name))
    }
}

/// Multicast UDP face plus the name to serve or fetch.
#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Name prefix (NDN URI format)
    pub name: String,

    /// Multicast UDP port
    #[clap(default_value_t = udp::DEFAULT_MULTICAST_PORT.to_string())]
    pub port: String,

    /// Multicast group address
    #[clap(default_value_t = udp::DEFAULT_MULTICAST_GROUP.to_string())]
    pub group: String,
}

impl GroupArgs {
    pub async fn open(&self) -> Result<(ChannelFace, Name)> {
        let name = parse_name(&self.name)?;
        let port = parse_port(&self.port)?;
        let group = parse_group(&self.group)?;
        let face = udp::multicast(group, port)
            .await
            .with_context(|| format!("Failed to join {}:{}", group, port))?;
        Ok((face, name))
    }
}
