// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Build identity.
//!
//! A build ID is path shaped:
//!
//! ```text
//! <v{epoch}|stable>[/gh]/<name>@<version>/[X-<args>/]<target>/<stem><ext>
//! ```
//!
//! It is the storage key of the artifact and, rooted at the base path, its
//! public URL. Both renderings are derived here.

use std::collections::HashSet;
use std::sync::Arc;

use crate::args::BuildArgs;
use crate::package::Pkg;
use crate::paths;
use crate::target::Target;

/// Build epochs and the stable allow-list.
#[derive(Debug, Clone)]
pub struct BuildVersioning {
    pub build_version: u32,
    pub stable_version: u32,
    stable_builds: HashSet<String>,
}

impl BuildVersioning {
    pub fn new(
        build_version: u32,
        stable_version: u32,
        stable_builds: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            build_version,
            stable_version,
            stable_builds: stable_builds.into_iter().collect(),
        }
    }

    /// Whether `name` gets a flag-independent stable build.
    pub fn is_stable(&self, name: &str) -> bool {
        self.stable_builds.contains(name)
    }

    /// `stable` or `v<epoch>`.
    pub fn segment(&self, name: &str) -> String {
        if self.is_stable(name) {
            "stable".to_string()
        } else {
            format!("v{}", self.build_version)
        }
    }
}

/// One build request.
#[derive(Debug, Clone)]
pub struct BuildTask {
    pub pkg: Pkg,
    pub args: BuildArgs,
    pub target: Target,
    pub dev: bool,
    pub bundle: bool,
    versioning: Arc<BuildVersioning>,
}

impl BuildTask {
    pub fn new(pkg: Pkg, args: BuildArgs, target: Target, versioning: Arc<BuildVersioning>) -> Self {
        Self {
            pkg,
            args,
            target,
            dev: false,
            bundle: false,
            versioning,
        }
    }

    pub fn with_dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    pub fn with_bundle(mut self, bundle: bool) -> Self {
        self.bundle = bundle;
        self
    }

    pub fn versioning(&self) -> &BuildVersioning {
        &self.versioning
    }

    /// The build ID. Recomputed on every call; it depends only on the task.
    pub fn id(&self) -> String {
        let (mut stem, ext) = self.stem(&self.pkg);
        if self.bundle {
            stem.push_str(".bundle");
        }

        let id = format!(
            "{}{}/{}@{}/{}{}/{}{}",
            self.versioning.segment(&self.pkg.name),
            self.github_prefix(&self.pkg),
            self.pkg.name,
            self.pkg.version,
            self.args_prefix(),
            self.target,
            stem,
            ext,
        );
        self.strip_types_ext(id, ext)
    }

    /// Encoded args segment, empty for stable packages without a submodule.
    pub fn args_prefix(&self) -> String {
        if self.collapses(&self.pkg) {
            return String::new();
        }
        self.args
            .encode_prefix(&self.pkg, self.target == Target::Types)
    }

    /// Storage key of the artifact.
    pub fn save_path(&self) -> String {
        let id = self.id();
        match id.strip_prefix("stable/") {
            Some(rest) if self.versioning.is_stable(&self.pkg.name) => paths::join(&[
                "builds",
                &format!("v{}", self.versioning.stable_version),
                rest,
            ]),
            _ => paths::join(&["builds", &id]),
        }
    }

    /// Public URL path of this build under `base_path`.
    pub fn public_path(&self, base_path: &str) -> String {
        let path = format!("{}/{}", base_path.trim_end_matches('/'), self.id());
        if self.pkg.name == "es5-ext" {
            return path.replace("/#/", "/$$/");
        }
        path
    }

    /// Public URL path of a dependency built with the same target and flags.
    ///
    /// Dependencies are never bundled into their own artifact, so no
    /// `.bundle` suffix appears here.
    pub fn import_path(&self, base_path: &str, pkg: &Pkg, args_prefix: &str) -> String {
        let (mut stem, ext) = self.stem(pkg);
        if pkg.name == "es5-ext" {
            stem = stem.replace("/#/", "/$$/");
        }
        let args_prefix = if self.collapses(pkg) { "" } else { args_prefix };

        let path = format!(
            "{}/{}{}/{}@{}/{}{}/{}{}",
            base_path.trim_end_matches('/'),
            self.versioning.segment(&pkg.name),
            self.github_prefix(pkg),
            pkg.name,
            pkg.version,
            args_prefix,
            self.target,
            stem,
            ext,
        );
        self.strip_types_ext(path, ext)
    }

    fn collapses(&self, pkg: &Pkg) -> bool {
        self.versioning.is_stable(&pkg.name) && pkg.submodule.is_empty()
    }

    fn github_prefix(&self, pkg: &Pkg) -> &'static str {
        if pkg.from_github { "/gh" } else { "" }
    }

    /// File stem with the dev suffix, and the extension.
    fn stem(&self, pkg: &Pkg) -> (String, &'static str) {
        let base = paths::basename(&pkg.name);
        let mut stem = base.strip_suffix(".js").unwrap_or(base).to_string();
        let mut ext = ".mjs";

        if pkg.from_esmsh {
            stem = "mod".to_string();
        }
        if !pkg.submodule.is_empty() {
            stem = pkg.submodule.clone();
            ext = ".js";
        }
        if self.target == Target::Raw {
            ext = "";
        }
        if self.dev {
            stem.push_str(".development");
        }
        (stem, ext)
    }

    fn strip_types_ext(&self, path: String, ext: &str) -> String {
        if self.target == Target::Types && !ext.is_empty() {
            if let Some(stripped) = path.strip_suffix(ext) {
                return stripped.to_string();
            }
        }
        path
    }
}
