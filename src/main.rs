// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! esmd - inspection tool for the ESM CDN build engine.
//!
//! Computes build IDs and runs package resolution against an installed
//! `node_modules` without serving anything.

use clap::Parser;
use esmd_build::Config;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        Config::load()
            .map(|config| config.loglevel)
            .unwrap_or_else(|_| "warn".to_string())
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match &cli.command {
        Commands::Id(args) => commands::id::run(args, &cli).await,
        Commands::Resolve(args) => commands::resolve::run(args, &cli).await,
        Commands::Analyze(args) => commands::analyze::run(args, &cli).await,
        Commands::Lookup(args) => commands::lookup::run(args, &cli).await,
    }
}
