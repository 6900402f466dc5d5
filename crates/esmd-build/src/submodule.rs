// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Submodule resolution: `pkg/sub/path` imports.

use std::path::Path;
use tracing::debug;

use crate::context::ResolveContext;
use crate::error::Result;
use crate::normalize::{apply_resolved, normalize, resolve_exports};
use crate::package::{ModuleKind, PackageDescriptor, PackageJson};
use crate::paths;

/// Re-point a normalized descriptor at `submodule`.
///
/// An empty submodule returns the descriptor unchanged.
pub fn resolve_submodule(
    ctx: &ResolveContext<'_>,
    descriptor: &PackageDescriptor,
    submodule: &str,
) -> Result<PackageDescriptor> {
    let mut p = descriptor.clone();
    if submodule.is_empty() {
        return Ok(p);
    }

    let pkg_dir = ctx.package_dir();

    if paths::ends_with_any(submodule, &[".d.ts", ".d.mts"]) {
        match submodule.strip_suffix("~.d.ts") {
            Some(dir) => {
                if let Some(types) = probe_types(ctx, &pkg_dir, dir) {
                    p.types = Some(types);
                }
            }
            None => p.types = Some(paths::dot_slash(submodule)),
        }
        return Ok(p);
    }

    let sub_dir = pkg_dir.join(submodule);
    let package_file = sub_dir.join("package.json");

    if ctx.fs.file_exists(&package_file) {
        let mut raw = PackageJson::read(ctx.fs, &package_file)?;
        if raw.version.as_deref().is_none_or(str::is_empty) {
            raw.version = Some(p.version.clone());
        }
        let nested = normalize(ctx, raw, &sub_dir);
        let reroot = |file: &str| paths::dot_slash(&paths::join(&[submodule, file]));

        p.module = nested.module.as_deref().map(reroot);
        p.main = Some(reroot(nested.main.as_deref().unwrap_or("index.js")));
        p.types = nested
            .types
            .as_deref()
            .map(reroot)
            .or_else(|| probe_types(ctx, &pkg_dir, submodule));
        debug!("submodule {} resolved via nested package.json", submodule);
    } else {
        if p.kind == ModuleKind::Module || p.module.is_some() {
            p.module = Some(paths::dot_slash(submodule));
        } else {
            p.main = Some(paths::dot_slash(submodule));
        }
        p.types = probe_types(ctx, &pkg_dir, submodule);

        if let Some(node) = p
            .defined_exports
            .as_ref()
            .and_then(|exports| exports.match_subpath(submodule))
        {
            let resolved = resolve_exports(ctx, &p, &node);
            apply_resolved(&mut p, resolved);
        }
    }

    Ok(p)
}

/// `<dir>/index.d.ts`, then `<dir>.d.ts`.
fn probe_types(ctx: &ResolveContext<'_>, pkg_dir: &Path, dir: &str) -> Option<String> {
    let index = paths::join(&[dir, "index.d.ts"]);
    if ctx.fs.file_exists(&pkg_dir.join(&index)) {
        return Some(paths::dot_slash(&index));
    }
    let flat = format!("{}.d.ts", dir);
    if ctx.fs.file_exists(&pkg_dir.join(&flat)) {
        return Some(paths::dot_slash(&flat));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFs;
    use crate::normalize::tests::fixture;
    use crate::package::Pkg;
    use crate::target::Target;
    use crate::validate::LexicalEsmValidator;

    fn resolve(dir: &Path, package_json: &str, submodule: &str) -> PackageDescriptor {
        let pkg = Pkg::new("foo", "1.0.0");
        let ctx = ResolveContext {
            fs: &OsFs,
            validator: &LexicalEsmValidator,
            work_dir: dir,
            pkg: &pkg,
            target: Target::EsNext,
            dev: false,
            conditions: &[],
        };
        let descriptor = normalize(&ctx, PackageJson::parse(package_json).unwrap(), &ctx.package_dir());
        resolve_submodule(&ctx, &descriptor, submodule).unwrap()
    }

    #[test]
    fn test_declaration_submodules() {
        let dir = fixture("foo", &[("index.js", ""), ("lib/index.d.ts", ""), ("util.d.ts", "")]);

        let p = resolve(dir.path(), r#"{"name":"foo"}"#, "types/extra.d.ts");
        assert_eq!(p.types.as_deref(), Some("./types/extra.d.ts"));

        let p = resolve(dir.path(), r#"{"name":"foo"}"#, "lib~.d.ts");
        assert_eq!(p.types.as_deref(), Some("./lib/index.d.ts"));

        let p = resolve(dir.path(), r#"{"name":"foo"}"#, "util~.d.ts");
        assert_eq!(p.types.as_deref(), Some("./util.d.ts"));

        let p = resolve(dir.path(), r#"{"name":"foo","types":"./index.d.ts"}"#, "missing~.d.ts");
        assert_eq!(p.types.as_deref(), Some("./index.d.ts"));
    }

    #[test]
    fn test_nested_package_json() {
        let dir = fixture(
            "foo",
            &[
                ("index.js", ""),
                ("server/package.json", r#"{"module":"./esm/index.js","types":"./index.d.ts"}"#),
            ],
        );

        let p = resolve(dir.path(), r#"{"name":"foo","main":"index.js"}"#, "server");
        assert_eq!(p.module.as_deref(), Some("./server/esm/index.js"));
        assert_eq!(p.main.as_deref(), Some("./server/index.js"));
        assert_eq!(p.types.as_deref(), Some("./server/index.d.ts"));
        assert_eq!(p.version, "1.0.0");
    }

    #[test]
    fn test_synthesized_paths() {
        let dir = fixture("foo", &[("index.js", ""), ("lib/add.d.ts", "")]);

        let p = resolve(dir.path(), r#"{"name":"foo","main":"index.js"}"#, "lib/add");
        assert_eq!(p.main.as_deref(), Some("./lib/add"));
        assert_eq!(p.module, None);
        assert_eq!(p.types.as_deref(), Some("./lib/add.d.ts"));

        let p = resolve(dir.path(), r#"{"name":"foo","type":"module","main":"index.js"}"#, "lib/add");
        assert_eq!(p.module.as_deref(), Some("./lib/add"));
    }

    #[test]
    fn test_wildcard_exports() {
        let dir = fixture("foo", &[("index.js", "")]);
        let package_json = r#"{
            "name": "foo",
            "main": "index.js",
            "exports": {
                ".": "./index.js",
                "./*": { "import": "./esm/*.mjs", "require": "./cjs/*.js" },
                "./features/*": { "import": "./esm/features/*/index.mjs" }
            }
        }"#;

        let p = resolve(dir.path(), package_json, "utils/math");
        assert_eq!(p.module.as_deref(), Some("./esm/utils/math.mjs"));
        assert_eq!(p.main.as_deref(), Some("./cjs/utils/math.js"));

        let p = resolve(dir.path(), package_json, "features/a");
        assert_eq!(p.module.as_deref(), Some("./esm/features/a/index.mjs"));
    }
}
