// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command implementations for esmd.

pub mod analyze;
pub mod id;
pub mod lookup;
pub mod resolve;

use anyhow::{Context, Result};
use esmd_build::{BuildArgs, BuildTask, Config, Pkg, Target};
use tracing::debug;

use crate::cli::{Cli, TaskArgs};

/// Common context for command execution.
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    /// Load config and apply CLI overrides.
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::load().context("failed to load config")?;

        if let Some(ref dir) = cli.work_dir {
            config.work_dir = Some(dir.clone());
        }
        if let Some(ref dir) = cli.storage_dir {
            config.storage_dir = Some(dir.clone());
        }
        if let Some(ref base_path) = cli.base_path {
            config.base_path = base_path.clone();
        }

        debug!(
            "work dir {}, storage dir {}",
            config.work_dir().display(),
            config.storage_dir().display()
        );
        Ok(Self { config })
    }

    /// Build task for a request.
    pub fn task(&self, args: &TaskArgs) -> Result<BuildTask> {
        let pkg = Pkg::parse(&args.package)?;
        let target = match args.target {
            Some(ref target) => target.parse::<Target>()?,
            None => Target::from_user_agent(args.user_agent.as_deref()),
        };

        let mut build_args = BuildArgs::default();
        if let Some(ref deps) = args.deps {
            build_args.deps = BuildArgs::parse_deps(deps)?;
        }
        if let Some(ref aliases) = args.alias {
            build_args.aliases = BuildArgs::parse_aliases(aliases)?;
        }
        if let Some(ref externals) = args.external {
            build_args.externals = BuildArgs::parse_list(externals).into_iter().collect();
        }
        if let Some(ref conditions) = args.conditions {
            build_args.conditions = BuildArgs::parse_list(conditions);
        }

        debug!("{} -> target {}", pkg, target);
        Ok(BuildTask::new(pkg, build_args, target, self.config.versioning())
            .with_dev(args.dev)
            .with_bundle(args.bundle))
    }
}
