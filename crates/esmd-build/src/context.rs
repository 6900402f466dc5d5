// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-request resolution inputs.

use std::path::{Path, PathBuf};

use crate::fs::FileSystem;
use crate::identity::BuildTask;
use crate::package::Pkg;
use crate::target::Target;
use crate::validate::EsmValidator;

/// Everything package resolution reads besides the package.json itself.
///
/// Borrowed for the duration of one build task; nothing here is mutated.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub validator: &'a dyn EsmValidator,
    /// Directory holding the installed `node_modules`
    pub work_dir: &'a Path,
    /// The requested package
    pub pkg: &'a Pkg,
    pub target: Target,
    pub dev: bool,
    /// Extra export conditions, highest priority first
    pub conditions: &'a [String],
}

impl<'a> ResolveContext<'a> {
    /// Context for resolving the package of a build task.
    pub fn for_task(
        task: &'a BuildTask,
        fs: &'a dyn FileSystem,
        validator: &'a dyn EsmValidator,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            fs,
            validator,
            work_dir,
            pkg: &task.pkg,
            target: task.target,
            dev: task.dev,
            conditions: &task.args.conditions,
        }
    }

    /// Installed directory of the requested package.
    pub fn package_dir(&self) -> PathBuf {
        self.work_dir.join("node_modules").join(&self.pkg.name)
    }

    /// `NODE_ENV` the build runs under.
    pub fn node_env(&self) -> &'static str {
        if self.dev { "development" } else { "production" }
    }
}
