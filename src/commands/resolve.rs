// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resolve command implementation.

use anyhow::{Context, Result};
use esmd_build::{LexicalEsmValidator, OsFs, PackageJson, ResolveContext, normalize, resolve_submodule};

use crate::cli::{Cli, TaskArgs};
use crate::commands::CommandContext;

/// Run the resolve command.
pub async fn run(args: &TaskArgs, cli: &Cli) -> Result<()> {
    let ctx = CommandContext::new(cli)?;
    let task = ctx.task(args)?;
    let work_dir = ctx.config.work_dir();

    let resolve = ResolveContext::for_task(&task, &OsFs, &LexicalEsmValidator, &work_dir);
    let package_file = resolve.package_dir().join("package.json");
    let raw = PackageJson::read(&OsFs, &package_file)
        .with_context(|| format!("failed to read {}", package_file.display()))?;

    let descriptor = normalize(&resolve, raw, &resolve.package_dir());
    let descriptor = resolve_submodule(&resolve, &descriptor, &task.pkg.submodule)?;

    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}
