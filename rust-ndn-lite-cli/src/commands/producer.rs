//! Producer answering every Interest under a prefix with a fixed Data.

use anyhow::{Context, Result};
use log::info;
use rust_ndn_lite_common::{Data, Interest, Name};
use rust_ndn_lite_forwarder::{ChannelFace, Forwarder, Strategy};
use std::sync::atomic::AtomicBool;

use crate::utils::run_forwarder;

/// Content of every Data this producer returns.
pub const CONTENT: &str = "I'm a Data packet.";

/// Serve `prefix` on `face` until `running` is cleared.
pub async fn serve(fwd: &mut Forwarder, face: ChannelFace, prefix: Name, running: &AtomicBool) -> Result<()> {
    fwd.add_face(face).context("Failed to attach face")?;

    let data_name = prefix.clone();
    fwd.register_prefix(&prefix, move |fwd: &mut Forwarder, interest: &Interest| {
        println!("On interest {}", interest.name);
        let mut data = Data::new(data_name.clone(), CONTENT);
        data.encode_digest_sign();
        fwd.put_data(&data);
        Strategy::Suppress
    })
    .with_context(|| format!("Failed to register {}", prefix))?;

    info!("Serving {}", prefix);
    run_forwarder(fwd, running).await;
    Ok(())
}
