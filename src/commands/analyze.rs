// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Analyze command implementation.

use anyhow::Result;
use esmd_build::{InteropClassifier, LexicalEsmValidator, NodeCjsExtractor, OsFs, ResolveContext};
use owo_colors::OwoColorize;

use crate::cli::{Cli, TaskArgs};
use crate::commands::CommandContext;

/// Run the analyze command.
pub async fn run(args: &TaskArgs, cli: &Cli) -> Result<()> {
    let ctx = CommandContext::new(cli)?;
    let task = ctx.task(args)?;
    let work_dir = ctx.config.work_dir();
    let extractor = NodeCjsExtractor::new(ctx.config.node.clone(), ctx.config.cjs_lexer()?);

    let resolve = ResolveContext::for_task(&task, &OsFs, &LexicalEsmValidator, &work_dir);
    let analysis = InteropClassifier::new(resolve, &extractor).analyze()?;

    println!("{}", task.id().cyan().bold());
    match analysis.entry() {
        Ok(entry) => println!("{}: {}", "entry".dimmed(), entry),
        Err(_) => println!("{}: {}", "entry".dimmed(), "none".yellow()),
    }
    if let Some(ref types) = analysis.descriptor.types {
        println!("{}: {}", "types".dimmed(), types);
    }
    if let Some(ref reexport) = analysis.reexport {
        println!("{}: {}", "reexport".dimmed(), reexport.green());
    }
    println!("{}", serde_json::to_string_pretty(&analysis.build)?);

    Ok(())
}
