// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI argument parsing for esmd.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// esmd - inspect package resolution and build identities of the ESM CDN
#[derive(Parser, Debug)]
#[command(name = "esmd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the installed node_modules
    #[arg(long, global = true, env = "ESMD_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Root of the build storage
    #[arg(long, global = true, env = "ESMD_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Base path public URLs are rooted at
    #[arg(long, global = true)]
    pub base_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the build ID, save path and public path of a request
    Id(TaskArgs),

    /// Normalize an installed package and print its descriptor
    Resolve(TaskArgs),

    /// Classify the entry of an installed package and print its exports
    Analyze(TaskArgs),

    /// Look up a build record by ID
    Lookup(LookupArgs),
}

/// A build request.
#[derive(Args, Debug, Clone)]
pub struct TaskArgs {
    /// Package path, e.g. `react@18.2.0`, `lodash@4.17.21/debounce` or `gh/owner/repo@tag`
    pub package: String,

    /// Build target (es2015..es2022, esnext, deno, denonext, node, raw, types)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Pick the target from a User-Agent when --target is not given
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Development build
    #[arg(long)]
    pub dev: bool,

    /// Bundle dependencies
    #[arg(long)]
    pub bundle: bool,

    /// Extra export conditions, highest priority first
    #[arg(long, value_name = "a,b")]
    pub conditions: Option<String>,

    /// Pinned dependencies
    #[arg(long, value_name = "name@version,..")]
    pub deps: Option<String>,

    /// Import aliases
    #[arg(long, value_name = "from:to,..")]
    pub alias: Option<String>,

    /// Specifiers kept external
    #[arg(long, value_name = "a,b")]
    pub external: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    /// Build ID
    pub id: String,
}
