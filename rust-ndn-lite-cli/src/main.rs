use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser, Subcommand};
use log::{debug, error};
use rust_ndn_lite_common::Error as NdnError;
use rust_ndn_lite_forwarder::Forwarder;
use std::{
    path::PathBuf,
    process,
    sync::{atomic::AtomicBool, Arc},
};

mod commands;
mod settings;
mod shared_info;
mod utils;

use commands::{light::LightArgs, GroupArgs, UnicastArgs};
use settings::NodeConfig;
use utils::ArgError;

/// Exit code of a failed security bootstrapping.
const EXIT_BOOTSTRAPPING: i32 = 5;

/// rust-ndn-lite example drivers
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Configuration file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print forwarder statistics as JSON on exit
    #[clap(long, global = true)]
    stats: bool,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer Interests under a prefix over a UDP unicast face
    Producer(UnicastArgs),

    /// Fetch one Data packet over a UDP unicast face
    Consumer {
        #[clap(flatten)]
        face: UnicastArgs,

        /// Interest lifetime in milliseconds
        #[clap(short, long, default_value = "4000")]
        lifetime: u64,
    },

    /// Answer Interests under a prefix on a multicast group
    GroupProducer(GroupArgs),

    /// Fetch one Data packet from a multicast group
    GroupConsumer {
        #[clap(flatten)]
        face: GroupArgs,

        /// Interest lifetime in milliseconds
        #[clap(short, long, default_value = "4000")]
        lifetime: u64,
    },

    /// Run the bootstrapped smart light device
    Light(LightArgs),
}

async fn run(cli: Cli) -> Result<()> {
    let config = NodeConfig::load(cli.config.as_deref())?;
    debug!("Configuration: {:?}", config);

    let running = Arc::new(AtomicBool::new(true));
    utils::watch_signals(Arc::clone(&running));

    let mut fwd = Forwarder::new(config.forwarder);
    match cli.command {
        Commands::Producer(args) => {
            let (face, name) = args.open().await?;
            commands::producer::serve(&mut fwd, face, name, &running).await?;
        }
        Commands::Consumer { face, lifetime } => {
            let (face, name) = face.open().await?;
            commands::consumer::fetch(&mut fwd, face, name, lifetime, Arc::clone(&running)).await?;
        }
        Commands::GroupProducer(args) => {
            let (face, name) = args.open().await?;
            commands::producer::serve(&mut fwd, face, name, &running).await?;
        }
        Commands::GroupConsumer { face, lifetime } => {
            let (face, name) = face.open().await?;
            commands::consumer::fetch(&mut fwd, face, name, lifetime, Arc::clone(&running)).await?;
        }
        Commands::Light(args) => {
            commands::light::run(&mut fwd, &args, config.bootstrap, &running).await?;
        }
    }

    if cli.stats {
        let snapshot = serde_json::to_string_pretty(&fwd.metrics().snapshot()).context("Failed to encode statistics")?;
        println!("{}", snapshot);
    }
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(arg) = err.downcast_ref::<ArgError>() {
        return arg.exit_code();
    }
    match err.downcast_ref::<NdnError>() {
        Some(NdnError::BootstrappingFailure(_)) => EXIT_BOOTSTRAPPING,
        Some(NdnError::InvalidName(_)) => 4,
        _ => 1,
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            process::exit(code);
        }
    };

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "info"
    }))
    .init();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("ERROR: {:#}", e);
        process::exit(exit_code(&e));
    }
}
