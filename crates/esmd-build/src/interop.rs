// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ESM/CJS interop classification.
//!
//! Decides which entry of a resolved package a build starts from and what
//! that entry exports. ES modules are scanned statically; CommonJS entries go
//! through a [`CjsExportExtractor`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

use crate::cjs::CjsExportExtractor;
use crate::context::ResolveContext;
use crate::error::{BuildError, Result};
use crate::normalize::normalize;
use crate::package::{PackageDescriptor, PackageJson};
use crate::paths;
use crate::submodule::resolve_submodule;
use crate::target::Target;

/// Extensions tried when a module entry has none on disk.
const ESM_PROBE_EXTS: [&str; 6] = [".mjs", ".js", ".jsx", ".mts", ".ts", ".tsx"];

/// What a finished build exposes. Persisted in the record store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EsmBuild {
    pub named_exports: BTreeSet<String>,
    pub has_export_default: bool,
    #[serde(rename = "fromCJS")]
    pub from_cjs: bool,
    pub types_only: bool,
}

/// Classification result for one request.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub build: EsmBuild,
    /// Descriptor with the entry the build should use
    pub descriptor: PackageDescriptor,
    /// Module a CommonJS entry re-exports wholesale
    pub reexport: Option<String>,
}

impl Analysis {
    /// Entry file of the build, module first.
    pub fn entry(&self) -> Result<&str> {
        self.descriptor
            .module
            .as_deref()
            .or(self.descriptor.main.as_deref())
            .ok_or_else(|| BuildError::EntryNotFound(self.descriptor.name.clone()))
    }
}

/// Classifies the requested package of a [`ResolveContext`].
pub struct InteropClassifier<'a> {
    ctx: ResolveContext<'a>,
    extractor: &'a dyn CjsExportExtractor,
}

impl<'a> InteropClassifier<'a> {
    pub fn new(ctx: ResolveContext<'a>, extractor: &'a dyn CjsExportExtractor) -> Self {
        Self { ctx, extractor }
    }

    /// Read, normalize and classify the requested package.
    #[instrument(skip(self), fields(pkg = %self.ctx.pkg))]
    pub fn analyze(&self) -> Result<Analysis> {
        let pkg_dir = self.ctx.package_dir();
        let raw = PackageJson::read(self.ctx.fs, &pkg_dir.join("package.json"))?;
        let descriptor = normalize(&self.ctx, raw, &pkg_dir);

        let mut submodule = self.ctx.pkg.submodule.as_str();
        if !submodule.is_empty() && self.is_entry_subpath(&descriptor) {
            debug!("subpath {} is the package entry", self.ctx.pkg.subpath);
            submodule = "";
        }

        let descriptor = resolve_submodule(&self.ctx, &descriptor, submodule)?;
        self.classify(descriptor)
    }

    /// `pkg/dist/index.js` where `dist/index.js` is already `main` or `module`.
    fn is_entry_subpath(&self, p: &PackageDescriptor) -> bool {
        let subpath = paths::dot_slash(&self.ctx.pkg.subpath);
        [p.main.as_deref(), p.module.as_deref()]
            .into_iter()
            .flatten()
            .any(|entry| paths::dot_slash(entry) == subpath)
    }

    /// Classify an already-resolved descriptor.
    pub fn classify(&self, descriptor: PackageDescriptor) -> Result<Analysis> {
        let mut p = descriptor;
        let mut build = EsmBuild::default();
        let mut reexport = None;

        if self.ctx.target == Target::Types || p.is_types_only() || p.is_entry_less() {
            return Ok(finish(p, build, reexport));
        }

        if let Some(module) = p.module.clone() {
            match self.resolve_es_module(&module) {
                Ok((resolved, named_exports)) => {
                    p.module = Some(resolved);
                    build.has_export_default = named_exports.iter().any(|e| e == "default");
                    build.named_exports = named_exports.into_iter().collect();
                }
                Err(BuildError::NotAModule(resolved)) => {
                    let ret = self.extract(&resolved)?;
                    warn!(
                        "fake ES module '{}' of '{}'",
                        resolved,
                        self.ctx.pkg.import_specifier()
                    );
                    build.has_export_default = ret.export_default;
                    build.named_exports = ret.exports.iter().cloned().collect();
                    reexport = ret.reexport().map(str::to_string);
                    p.main = Some(resolved);
                    p.module = None;
                }
                Err(e) => return Err(e),
            }
        } else if let Some(main) = p.main.clone() {
            let ret = self.extract(&main)?;
            build.has_export_default = ret.export_default;
            build.named_exports = ret.exports.iter().cloned().collect();
            reexport = ret.reexport().map(str::to_string);
        }

        Ok(finish(p, build, reexport))
    }

    /// Probe extensions and directory indexes, then scan the file.
    ///
    /// Returns [`BuildError::NotAModule`] carrying the probed path when the
    /// file has no module syntax.
    fn resolve_es_module(&self, module: &str) -> Result<(String, Vec<String>)> {
        let pkg_dir = self.ctx.package_dir();
        let exists = |rel: &str| self.ctx.fs.file_exists(&pkg_dir.join(rel));

        let mut resolved = module.to_string();
        if !exists(&resolved) {
            if let Some(found) = ESM_PROBE_EXTS
                .iter()
                .map(|ext| format!("{}{}", module, ext))
                .find(|candidate| exists(candidate))
            {
                resolved = found;
            }
        }
        if !exists(&resolved) && self.ctx.fs.dir_exists(&pkg_dir.join(module)) {
            if let Some(found) = ESM_PROBE_EXTS
                .iter()
                .map(|ext| paths::dot_slash(&paths::join(&[module, &format!("index{}", ext)])))
                .find(|candidate| exists(candidate))
            {
                resolved = found;
            }
        }
        if !exists(&resolved) {
            for ext in ESM_PROBE_EXTS {
                if let Some(stem) = resolved.strip_suffix(&format!("/index/index{}", ext)) {
                    resolved = format!("{}/index{}", stem, ext);
                    break;
                }
            }
        }

        let scan = self
            .ctx
            .validator
            .validate(self.ctx.fs, &pkg_dir.join(&resolved))?;
        if !scan.is_esm {
            return Err(BuildError::NotAModule(resolved));
        }
        Ok((resolved, scan.named_exports))
    }

    fn extract(&self, entry: &str) -> Result<crate::cjs::CjsExports> {
        let path = self.ctx.package_dir().join(entry);
        let ret = self
            .extractor
            .extract(self.ctx.work_dir, &path, self.ctx.node_env())?;
        if !ret.error.is_empty() {
            return Err(BuildError::Extraction {
                path: entry.to_string(),
                message: ret.error,
            });
        }
        Ok(ret)
    }
}

fn finish(p: PackageDescriptor, mut build: EsmBuild, reexport: Option<String>) -> Analysis {
    build.from_cjs = p.main.is_some() && p.module.is_none();
    build.types_only = p.is_types_only() || p.is_entry_less();
    Analysis {
        build,
        descriptor: p,
        reexport,
    }
}
