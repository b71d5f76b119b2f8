//! Smart light device.
//!
//! Bootstraps into the home with its provisioning file, then obeys LED
//! commands from the controller and publishes a liveness event.

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use log::{info, warn};
use rust_ndn_lite_app::{
    BootstrapConfig, BootstrapState, Bootstrapper, DeviceIdentity, Event, EventContext, PubSub, ServiceDiscovery,
    ServiceId,
};
use rust_ndn_lite_common::Name;
use rust_ndn_lite_forwarder::{udp, unix, ChannelFace, Forwarder, DEFAULT_POLL_INTERVAL_MS};
use std::{
    cell::Cell,
    path::PathBuf,
    rc::Rc,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::time::sleep;

use crate::{
    shared_info::SharedInfo,
    utils::{parse_group, parse_port, print_header},
};

/// Brightness values above this are clamped.
pub const MAX_BRIGHTNESS: u8 = 10;

/// Interval of the liveness publication.
pub const LIVENESS_INTERVAL: Duration = Duration::from_secs(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FaceKind {
    /// Unix socket of a local forwarding daemon
    Unix,
    /// UDP multicast group
    Multicast,
}

#[derive(Args, Debug)]
pub struct LightArgs {
    /// Provisioning file of the device
    pub shared_info: PathBuf,

    /// Face used to reach the home
    #[clap(long, value_enum, default_value = "unix")]
    pub face: FaceKind,

    /// Daemon socket, for the unix face
    #[clap(long, default_value = unix::DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,

    /// Multicast port, for the multicast face
    #[clap(long, default_value_t = udp::DEFAULT_MULTICAST_PORT.to_string())]
    pub port: String,

    /// Multicast group, for the multicast face
    #[clap(long, default_value_t = udp::DEFAULT_MULTICAST_GROUP.to_string())]
    pub group: String,
}

impl LightArgs {
    async fn open(&self) -> Result<ChannelFace> {
        match self.face {
            FaceKind::Unix => Ok(unix::connect(&self.socket).await?),
            FaceKind::Multicast => {
                let port = parse_port(&self.port)?;
                let group = parse_group(&self.group)?;
                Ok(udp::multicast(group, port).await?)
            }
        }
    }
}

/// Leading decimal integer of `payload`, `atoi` style: leading whitespace
/// and one sign are accepted, and anything unparsable reads as 0.
fn leading_int(payload: &[u8]) -> i64 {
    let text = String::from_utf8_lossy(payload);
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));
    if negative {
        -value
    } else {
        value
    }
}

/// Apply a command payload to `current`. An empty payload queries the
/// brightness; any other payload sets it to its leading integer, so
/// non-numeric text turns the light off.
pub fn apply_command(current: u8, payload: &[u8]) -> (u8, String) {
    if payload.is_empty() {
        return (current, format!("Query the brightness = {}", current));
    }
    let requested = leading_int(payload).max(0) as u64;

    let mut lines = Vec::new();
    if (requested > 0) != (current > 0) {
        lines.push(if requested > 0 { "Switch on the light." } else { "Turn off the light." }.to_string());
    }
    let brightness = if requested < u64::from(MAX_BRIGHTNESS) {
        if requested > 0 {
            lines.push(format!("Successfully set the brightness = {}", requested));
        }
        requested as u8
    } else {
        lines.push(format!("Exceeding range. Set the brightness = {}", MAX_BRIGHTNESS));
        MAX_BRIGHTNESS
    };
    (brightness, lines.join("\n"))
}

fn after_bootstrapping(
    fwd: &mut Forwarder,
    identity: &DeviceIdentity,
    discovery: &ServiceDiscovery,
    brightness: Rc<Cell<u8>>,
) -> Result<()> {
    print_header(&format!("Bootstrapped as {}", identity.certificate().name));
    discovery.start(fwd, identity.clone())?;

    let pubsub = PubSub::new(identity.clone());
    pubsub.subscribe_to_command(
        fwd,
        ServiceId::LED,
        &Name::new(),
        move |_, context: &EventContext, event: &Event| {
            println!("RECEIVED NEW COMMAND");
            println!("Command id: {}", event.data_id);
            println!("Command payload: {}", String::from_utf8_lossy(&event.payload));
            println!("Scope: {}", context.scope);
            let (value, message) = apply_command(brightness.get(), &event.payload);
            brightness.set(value);
            println!("{}", message);
        },
    )?;
    pubsub.publish_content_periodically(fwd, ServiceId::LED, Event::new("hello", "liveness"), LIVENESS_INTERVAL)?;
    Ok(())
}

/// Run the light until `running` is cleared or bootstrapping fails.
pub async fn run(fwd: &mut Forwarder, args: &LightArgs, config: BootstrapConfig, running: &AtomicBool) -> Result<()> {
    let shared = SharedInfo::load(&args.shared_info)?;
    print_header("Pre-installed device information");
    println!("Device identifier: {}", shared.device_id);
    println!("Anchor public key: {}", hex::encode_upper(&shared.anchor_public_key));

    let face = args.open().await.context("Failed to open face")?;
    let face_id = fwd.add_face(face).context("Failed to attach face")?;

    let discovery = ServiceDiscovery::new();
    // State code 1 is normal operation.
    discovery.add_or_update_self_service(ServiceId::LED, true, 1);

    let brightness = Rc::new(Cell::new(0u8));
    let info = shared.into_bootstrap_info(vec![ServiceId::LED]);
    let handle = Bootstrapper::new(config, info).start(fwd, face_id, move |fwd, identity| {
        if let Err(e) = after_bootstrapping(fwd, identity, &discovery, brightness) {
            warn!("Post-bootstrapping setup failed: {:#}", e);
        }
    })?;

    while running.load(Ordering::Relaxed) {
        fwd.process();
        if let BootstrapState::Failed(e) = handle.state() {
            return Err(anyhow!(e).context("Security bootstrapping failed"));
        }
        sleep(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)).await;
    }
    info!("Light shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_command() {
        let (value, message) = apply_command(0, b"5");
        assert_eq!(value, 5);
        assert!(message.starts_with("Switch on the light."));

        let (value, message) = apply_command(5, b"42");
        assert_eq!(value, MAX_BRIGHTNESS);
        assert!(message.contains("Exceeding range"));

        let (value, message) = apply_command(7, b"0");
        assert_eq!(value, 0);
        assert_eq!(message, "Turn off the light.");

        let (value, message) = apply_command(3, b"");
        assert_eq!(value, 3);
        assert_eq!(message, "Query the brightness = 3");
    }

    #[test]
    fn test_non_numeric_payload_turns_off() {
        let (value, message) = apply_command(4, b"abc");
        assert_eq!(value, 0);
        assert_eq!(message, "Turn off the light.");

        let (value, _) = apply_command(0, b" 7 lux");
        assert_eq!(value, 7);

        let (value, message) = apply_command(6, b"-3");
        assert_eq!(value, 0);
        assert_eq!(message, "Turn off the light.");
    }
}
