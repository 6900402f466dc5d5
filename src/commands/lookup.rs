// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lookup command implementation.

use anyhow::Result;
use esmd_build::{BuildRecords, FsStore};
use owo_colors::OwoColorize;
use std::sync::Arc;

use crate::cli::{Cli, LookupArgs};
use crate::commands::CommandContext;

/// Run the lookup command.
pub async fn run(args: &LookupArgs, cli: &Cli) -> Result<()> {
    let ctx = CommandContext::new(cli)?;
    let store = Arc::new(FsStore::new(ctx.config.storage_dir())?);
    let records = BuildRecords::new(store.clone(), store, &ctx.config.versioning());

    match records.lookup(&args.id).await? {
        Some(build) => {
            println!("{}", args.id.cyan().bold());
            println!("{}", serde_json::to_string_pretty(&build)?);
        }
        None => {
            println!("{}: {}", "not found".yellow(), args.id);
        }
    }

    Ok(())
}
