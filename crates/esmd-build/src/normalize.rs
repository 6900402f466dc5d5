// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Package.json normalization.
//!
//! Turns a raw package.json into a [`PackageDescriptor`] whose `main`,
//! `module` and `types` point at the files a build should use. The steps run
//! in a fixed order and are best-effort: a probe that fails leaves the field
//! as it was.

use semver::Version;
use std::path::Path;
use tracing::debug;

use crate::context::ResolveContext;
use crate::exports::{ConditionResolver, ExportsNode, ResolvedExports};
use crate::package::{ModuleKind, PackageDescriptor, PackageJson};
use crate::paths;

/// Normalize a package.json found in `dir`.
pub fn normalize(ctx: &ResolveContext<'_>, raw: PackageJson, dir: &Path) -> PackageDescriptor {
    let mut p = PackageDescriptor::from(raw);
    let probe = |rel: &str| ctx.fs.file_exists(&dir.join(rel));

    if ctx.pkg.from_github {
        p.name = ctx.pkg.name.clone();
        p.version = ctx.pkg.version.clone();
    } else if let Some(stripped) = p.version.strip_prefix('v') {
        p.version = stripped.to_string();
    }

    if p.types.is_none() {
        p.types = p.typings.clone();
    }

    apply_types_versions(&mut p);

    if let Some(exports) = p.defined_exports.clone() {
        let resolved = resolve_exports(ctx, &p, exports.root());
        apply_resolved(&mut p, resolved);
    }

    if p.module.is_none() {
        if let Some(m) = p.jsnext_main.as_ref().filter(|m| probe(m)) {
            p.module = Some(m.clone());
        } else if let Some(m) = p.es2015.as_ref().filter(|m| probe(m)) {
            p.module = Some(m.clone());
        } else if let Some(main) = p
            .main
            .as_ref()
            .filter(|m| p.kind == ModuleKind::Module || m.ends_with(".mjs"))
        {
            p.module = Some(main.clone());
        }
    }

    if p.main.is_none() && p.module.is_none() {
        if probe("index.mjs") {
            p.module = Some("./index.mjs".to_string());
        } else if probe("index.js") {
            p.main = Some("./index.js".to_string());
        } else if probe("index.cjs") {
            p.main = Some("./index.cjs".to_string());
        }
    }

    p.module = p.module.as_deref().map(paths::dot_slash);
    p.main = p.main.as_deref().map(paths::dot_slash);

    if !ctx.target.is_server() {
        apply_browser_override(ctx, &mut p, dir);
    }

    if p.types.is_none() {
        if let Some(main) = p.main.clone() {
            let (types, is_declaration) = derive_types(ctx, dir, &main);
            p.types = types;
            if is_declaration {
                p.main = None;
            }
        }
    }
    if p.types.is_none() {
        if let Some(module) = p.module.clone() {
            let (types, is_declaration) = derive_types(ctx, dir, &module);
            p.types = types;
            if is_declaration {
                p.module = None;
            }
        }
    }

    debug!(
        "normalized {}@{}: main={:?} module={:?} types={:?}",
        p.name, p.version, p.main, p.module, p.types
    );
    p
}

/// Run the condition resolver over an exports subtree for this package.
pub(crate) fn resolve_exports(
    ctx: &ResolveContext<'_>,
    p: &PackageDescriptor,
    node: &ExportsNode,
) -> ResolvedExports {
    ConditionResolver::new(ctx.target, ctx.dev, ctx.conditions, &p.name, &p.version)
        .resolve(node, p.kind)
}

/// Exports are authoritative: resolved entries replace the legacy fields.
pub(crate) fn apply_resolved(p: &mut PackageDescriptor, resolved: ResolvedExports) {
    if let Some(main) = resolved.main {
        p.main = Some(main);
    }
    if let Some(module) = resolved.module {
        p.module = Some(module);
    }
    if let Some(types) = resolved.types {
        p.types = Some(types);
    }
    if let Some(typings) = resolved.typings {
        if p.types.is_none() {
            p.types = Some(typings.clone());
        }
        p.typings = Some(typings);
    }
}

/// Pick the `typesVersions` entry with the greatest version floor.
fn apply_types_versions(p: &mut PackageDescriptor) {
    let mut best: Option<(Version, String)> = None;

    for (range, mapping) in &p.types_versions {
        let Some(floor) = range_floor(range) else {
            continue;
        };
        let template = mapping
            .get("*")
            .or_else(|| mapping.get("."))
            .and_then(|v| v.as_array())
            .and_then(|a| a.first())
            .and_then(|v| v.as_str());
        let Some(template) = template else {
            continue;
        };
        if best.as_ref().is_none_or(|(v, _)| floor > *v) {
            best = Some((floor, template.to_string()));
        }
    }

    if let Some((_, template)) = best {
        p.types = Some(match template.strip_suffix('*') {
            Some(prefix) => {
                let file = p.types.as_deref().unwrap_or("index.d.ts");
                paths::join(&[prefix, file])
            }
            None => template,
        });
    }
}

/// Lower bound of a `typesVersions` key: `*`, `>=x.y` or `>x.y`.
fn range_floor(range: &str) -> Option<Version> {
    let range = range.trim();
    if range == "*" {
        return Some(Version::new(0, 0, 0));
    }
    let bound = range
        .strip_prefix(">=")
        .or_else(|| range.strip_prefix('>'))?
        .trim();
    let mut parts: Vec<&str> = bound.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&parts.join(".")).ok()
}

fn apply_browser_override(ctx: &ResolveContext<'_>, p: &mut PackageDescriptor, dir: &Path) {
    if p.browser.is_empty() {
        return;
    }

    let mut browser_module = None;
    let mut browser_main = None;
    if let Some(module) = &p.module {
        browser_module = p.browser_override(module).cloned();
    } else if let Some(main) = &p.main {
        browser_main = p.browser_override(main).cloned();
    }

    if browser_module.is_none() && browser_main.is_none() {
        if let Some(m) = p.browser.get(".") {
            let path = dir.join(m);
            if ctx.fs.file_exists(&path) {
                let is_esm = ctx
                    .validator
                    .validate(ctx.fs, &path)
                    .map(|scan| scan.is_esm)
                    .unwrap_or(false);
                if is_esm {
                    browser_module = Some(m.clone());
                } else {
                    browser_main = Some(m.clone());
                }
            }
        }
    }

    if let Some(m) = browser_module {
        p.module = Some(paths::dot_slash(&m));
    } else if let Some(m) = browser_main {
        p.main = Some(paths::dot_slash(&m));
    }
}

/// Declarations for an entry: the entry itself when it is one, a sibling
/// `.d.ts`, or the directory's `index.d.ts`.
fn derive_types(ctx: &ResolveContext<'_>, dir: &Path, entry: &str) -> (Option<String>, bool) {
    if entry.ends_with(".d.ts") {
        return (Some(entry.to_string()), true);
    }

    let sibling = format!("{}.d.ts", paths::strip_extension(entry));
    if ctx.fs.file_exists(&dir.join(&sibling)) {
        return (Some(sibling), false);
    }

    let index = paths::dot_slash(&paths::join(&[&paths::dirname(entry), "index.d.ts"]));
    if ctx.fs.file_exists(&dir.join(&index)) {
        return (Some(index), false);
    }

    (None, false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fs::OsFs;
    use crate::package::Pkg;
    use crate::target::Target;
    use crate::validate::LexicalEsmValidator;
    use tempfile::TempDir;

    /// Lay out `node_modules/<name>/` with the given files.
    pub(crate) fn fixture(name: &str, files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let pkg_dir = dir.path().join("node_modules").join(name);
        for (path, content) in files {
            let full = pkg_dir.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        dir
    }

    fn run(dir: &TempDir, pkg: &Pkg, target: Target, package_json: &str) -> PackageDescriptor {
        let ctx = ResolveContext {
            fs: &OsFs,
            validator: &LexicalEsmValidator,
            work_dir: dir.path(),
            pkg,
            target,
            dev: false,
            conditions: &[],
        };
        normalize(&ctx, PackageJson::parse(package_json).unwrap(), &ctx.package_dir())
    }

    #[test]
    fn test_exports_override_main() {
        let dir = fixture("foo", &[]);
        let pkg = Pkg::new("foo", "1.0.0");
        let p = run(
            &dir,
            &pkg,
            Target::Node,
            r#"{
                "name": "foo", "version": "v1.0.0", "main": "index.js",
                "exports": { ".": { "import": "./esm/index.js", "require": "./cjs/index.js" } }
            }"#,
        );

        assert_eq!(p.version, "1.0.0");
        assert_eq!(p.module.as_deref(), Some("./esm/index.js"));
        assert_eq!(p.main.as_deref(), Some("./cjs/index.js"));
    }

    #[test]
    fn test_github_pins_name_and_version() {
        let dir = fixture("owner/repo", &[("index.js", "")]);
        let mut pkg = Pkg::new("owner/repo", "abc123");
        pkg.from_github = true;
        let p = run(&dir, &pkg, Target::EsNext, r#"{"name": "repo", "version": "0.0.0"}"#);

        assert_eq!(p.name, "owner/repo");
        assert_eq!(p.version, "abc123");
        assert_eq!(p.main.as_deref(), Some("./index.js"));
    }

    #[test]
    fn test_module_fallbacks() {
        let dir = fixture("foo", &[("es/index.js", "export default 1")]);
        let pkg = Pkg::new("foo", "1.0.0");

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"lib/index.js","jsnext:main":"es/index.js"}"#);
        assert_eq!(p.module.as_deref(), Some("./es/index.js"));
        assert_eq!(p.main.as_deref(), Some("./lib/index.js"));

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"lib/index.js","jsnext:main":"missing.js"}"#);
        assert_eq!(p.module, None);

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"dist/index.mjs"}"#);
        assert_eq!(p.module.as_deref(), Some("./dist/index.mjs"));

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","type":"module","main":"index.js"}"#);
        assert_eq!(p.module.as_deref(), Some("./index.js"));
    }

    #[test]
    fn test_index_probes() {
        let pkg = Pkg::new("foo", "1.0.0");

        let dir = fixture("foo", &[("index.mjs", ""), ("index.js", "")]);
        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo"}"#);
        assert_eq!(p.module.as_deref(), Some("./index.mjs"));
        assert_eq!(p.main, None);

        let dir = fixture("foo", &[("index.cjs", "")]);
        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo"}"#);
        assert_eq!(p.main.as_deref(), Some("./index.cjs"));

        let dir = fixture("foo", &[]);
        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo"}"#);
        assert!(p.is_entry_less());
    }

    #[test]
    fn test_types_from_sibling_and_directory() {
        let pkg = Pkg::new("foo", "1.0.0");

        let dir = fixture("foo", &[("index.js", ""), ("index.d.ts", "")]);
        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"./index.js"}"#);
        assert_eq!(p.types.as_deref(), Some("./index.d.ts"));

        let dir = fixture("foo", &[("lib/main.js", ""), ("lib/index.d.ts", "")]);
        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"./lib/main.js"}"#);
        assert_eq!(p.types.as_deref(), Some("./lib/index.d.ts"));

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"./types.d.ts"}"#);
        assert_eq!(p.types.as_deref(), Some("./types.d.ts"));
        assert_eq!(p.main, None);
        assert!(p.is_types_only());
    }

    #[test]
    fn test_typings_alias_and_types_versions() {
        let dir = fixture("foo", &[("index.js", "")]);
        let pkg = Pkg::new("foo", "1.0.0");

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","typings":"./foo.d.ts"}"#);
        assert_eq!(p.types.as_deref(), Some("./foo.d.ts"));

        let p = run(
            &dir,
            &pkg,
            Target::EsNext,
            r#"{
                "name": "foo", "types": "index.d.ts",
                "typesVersions": {
                    ">=3.1": { "*": ["ts3.1/*"] },
                    ">=4.2": { "*": ["ts4.2/*"] },
                    "<3.0": { "*": ["old/*"] }
                }
            }"#,
        );
        assert_eq!(p.types.as_deref(), Some("ts4.2/index.d.ts"));
    }

    #[test]
    fn test_browser_override() {
        let pkg = Pkg::new("foo", "1.0.0");
        let dir = fixture(
            "foo",
            &[("browser.mjs", "export const env = 'browser';\n"), ("browser.cjs", "module.exports = {};\n")],
        );

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"./node.js","browser":{"./node.js":"./browser.cjs"}}"#);
        assert_eq!(p.main.as_deref(), Some("./browser.cjs"));

        let p = run(&dir, &pkg, Target::Node, r#"{"name":"foo","main":"./node.js","browser":{"./node.js":"./browser.cjs"}}"#);
        assert_eq!(p.main.as_deref(), Some("./node.js"));

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"./node.js","browser":"./browser.mjs"}"#);
        assert_eq!(p.module.as_deref(), Some("./browser.mjs"));
        assert_eq!(p.main.as_deref(), Some("./node.js"));

        let p = run(&dir, &pkg, Target::EsNext, r#"{"name":"foo","main":"./node.js","browser":"./browser.cjs"}"#);
        assert_eq!(p.main.as_deref(), Some("./browser.cjs"));
    }

    #[test]
    fn test_range_floor() {
        assert_eq!(range_floor("*"), Some(Version::new(0, 0, 0)));
        assert_eq!(range_floor(">=4.1"), Some(Version::new(4, 1, 0)));
        assert_eq!(range_floor(">3"), Some(Version::new(3, 0, 0)));
        assert_eq!(range_floor("<3.0"), None);
    }
}
