//! # uplifter
//!
//! Command-line front-end for the watch-and-upload engine.
//!
//! - `config`: `uplifter.toml`
//! - `logging`: tracing subscriber setup
//! - `cli`: clap definitions
//! - `instances`: `uplifter instance add|list|activate`
//! - `daemon`: `uplifter run`
//! - `reload`: settings-file live reload

pub mod cli;
pub mod config;
pub mod daemon;
pub mod instances;
pub mod logging;
pub mod reload;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use config::AppConfig;
use uplift_settings::JsonSettingsStore;

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    logging::init(&config.logging)?;

    match cli.command {
        Command::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?;
            runtime.block_on(daemon::run_until_signal(config, !args.no_reload))
        }
        Command::Instance(command) => {
            let store = JsonSettingsStore::open(&config.store.path);
            instances::execute(&store, command)
        }
    }
}
