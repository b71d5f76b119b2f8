//! Consumer fetching one Data packet.

use anyhow::{Context, Result};
use log::info;
use rust_ndn_lite_common::{Interest, Name};
use rust_ndn_lite_forwarder::{ChannelFace, Forwarder};
use std::{
    cell::Cell,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use crate::utils::{format_duration, run_forwarder};

/// How a fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Data,
    Timeout,
}

/// Express one Interest for `name` on `face` and wait for the answer or
/// the timeout.
pub async fn fetch(
    fwd: &mut Forwarder,
    face: ChannelFace,
    name: Name,
    lifetime_ms: u64,
    running: Arc<AtomicBool>,
) -> Result<Option<Outcome>> {
    let face_id = fwd.add_face(face).context("Failed to attach face")?;
    fwd.add_route(&name, face_id)?;

    let outcome = Rc::new(Cell::new(None));
    let started = Instant::now();
    let interest = Interest::new(name.clone()).with_lifetime(lifetime_ms);
    info!("Expressing Interest {} ({}ms)", name, lifetime_ms);

    let (on_data_flag, on_timeout_flag) = (Arc::clone(&running), Arc::clone(&running));
    let (data_outcome, timeout_outcome) = (Rc::clone(&outcome), Rc::clone(&outcome));
    fwd.express_interest(
        interest,
        move |_, data| {
            println!("On data ({})", format_duration(started.elapsed()));
            println!("It says: {}", String::from_utf8_lossy(&data.content));
            data_outcome.set(Some(Outcome::Data));
            on_data_flag.store(false, Ordering::Relaxed);
        },
        move |_, _| {
            println!("On timeout");
            timeout_outcome.set(Some(Outcome::Timeout));
            on_timeout_flag.store(false, Ordering::Relaxed);
        },
    )
    .context("Failed to express Interest")?;

    run_forwarder(fwd, &running).await;
    Ok(outcome.get())
}
