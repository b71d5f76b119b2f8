//! Argument validation and the shared processing loop.

use log::debug;
use rust_ndn_lite_common::Name;
use rust_ndn_lite_forwarder::{Forwarder, DEFAULT_POLL_INTERVAL_MS};
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;
use tokio::{net::lookup_host, time::sleep};

/// Rejected command-line input. Each kind maps to its own exit code.
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("wrong arguments: {0}")]
    Arguments(String),

    #[error("wrong hostname: {0}")]
    Hostname(String),

    #[error("wrong port number: {0}")]
    Port(String),

    #[error("wrong name: {0}")]
    Name(String),
}

impl ArgError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ArgError::Arguments(_) => 1,
            ArgError::Hostname(_) => 2,
            ArgError::Port(_) => 3,
            ArgError::Name(_) => 4,
        }
    }
}

/// Ports below 1024 are refused.
pub fn parse_port(value: &str) -> Result<u16, ArgError> {
    if value.is_empty() {
        return Err(ArgError::Arguments("empty port".into()));
    }
    match value.parse::<u32>() {
        Ok(port) if (1024..65536).contains(&port) => Ok(port as u16),
        _ => Err(ArgError::Port(value.to_string())),
    }
}

pub fn parse_name(value: &str) -> Result<Name, ArgError> {
    value.parse().map_err(|_| ArgError::Name(value.to_string()))
}

pub fn parse_group(value: &str) -> Result<Ipv4Addr, ArgError> {
    match value.parse::<Ipv4Addr>() {
        Ok(group) if group.is_multicast() => Ok(group),
        _ => Err(ArgError::Hostname(value.to_string())),
    }
}

/// Resolve `host` to its first IPv4 address.
pub async fn resolve_host(host: &str, port: u16) -> Result<SocketAddr, ArgError> {
    if host.is_empty() {
        return Err(ArgError::Arguments("empty hostname".into()));
    }
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|_| ArgError::Hostname(host.to_string()))?;
    addrs
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ArgError::Hostname(host.to_string()))
}

/// Drive `fwd` until `running` is cleared, sleeping between passes so the
/// face tasks get to run.
pub async fn run_forwarder(fwd: &mut Forwarder, running: &AtomicBool) {
    while running.load(Ordering::Relaxed) {
        fwd.process();
        sleep(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)).await;
    }
    debug!("Processing loop stopped");
}

/// Clear `running` on Ctrl-C.
pub fn watch_signals(running: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, shutting down");
            running.store(false, Ordering::Relaxed);
        }
    });
}

/// Format a duration as a human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if total_secs < 60 {
        format!("{}.{:03}s", total_secs, duration.subsec_millis())
    } else {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    }
}

/// Print a section header in the CLI output
pub fn print_header(title: &str) {
    let separator = "=".repeat(title.len());
    println!("\n{}", title);
    println!("{}", separator);
}
