// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Id command implementation.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::{Cli, TaskArgs};
use crate::commands::CommandContext;

/// Run the id command.
pub async fn run(args: &TaskArgs, cli: &Cli) -> Result<()> {
    let ctx = CommandContext::new(cli)?;
    let task = ctx.task(args)?;

    println!("{}", task.id().cyan().bold());
    println!("{}: {}", "save path".dimmed(), task.save_path());
    println!("{}: {}", "public path".dimmed(), task.public_path(&ctx.config.base_path));
    if ctx.config.versioning().is_stable(&task.pkg.name) && task.pkg.submodule.is_empty() {
        println!("{}", "stable build: flags do not affect the ID".yellow());
    }

    Ok(())
}
