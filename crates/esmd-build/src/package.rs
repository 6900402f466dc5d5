// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Package.json parsing, normalized descriptors and requested packages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{BuildError, Result};
use crate::exports::ExportsNode;
use crate::fs::{FileSystem, read_json};
use crate::paths;

/// Extensions stripped from a subpath to form a submodule name.
const MODULE_EXTS: &[&str] = &[".mjs", ".cjs", ".js", ".jsx", ".mts", ".ts", ".tsx"];

/// Module system declared by the package `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    #[default]
    CommonJs,
    Module,
}

impl ModuleKind {
    /// Detect module kind from the package.json "type" field
    pub fn from_package_type(type_field: Option<&str>) -> Self {
        match type_field {
            Some("module") => ModuleKind::Module,
            _ => ModuleKind::CommonJs,
        }
    }
}

/// The `browser` field is either a replacement main path or a replacement map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrowserField {
    /// Replacement for the main entry
    Path(String),
    /// Path-to-path replacements; `false` values disable a module
    Map(BTreeMap<String, serde_json::Value>),
}

/// Represents a raw package.json file, limited to the fields resolution reads.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    /// Package name
    pub name: Option<String>,

    /// Package version
    pub version: Option<String>,

    /// Package type (commonjs or module)
    #[serde(rename = "type")]
    pub package_type: Option<String>,

    /// Main entry point
    pub main: Option<String>,

    /// Module entry point (ES modules)
    pub module: Option<String>,

    /// Legacy ES module entry point
    #[serde(rename = "jsnext:main")]
    pub jsnext_main: Option<String>,

    /// Legacy ES2015 entry point
    pub es2015: Option<String>,

    /// TypeScript types entry point
    pub types: Option<String>,

    /// Alias of `types`
    pub typings: Option<String>,

    /// Browser overrides
    pub browser: Option<BrowserField>,

    /// Exports field (package exports)
    pub exports: Option<serde_json::Value>,

    /// TypeScript version-dependent type redirects
    pub types_versions: Option<BTreeMap<String, serde_json::Value>>,

    /// Production dependencies
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Peer dependencies
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
}

impl PackageJson {
    /// Read package.json from a file path.
    pub fn read(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        read_json(fs, path).map_err(|e| match e {
            BuildError::Json(e) => BuildError::InvalidPackageJson(format!("{}: {}", path.display(), e)),
            other => other,
        })
    }

    /// Parse package.json from a string.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| BuildError::InvalidPackageJson(e.to_string()))
    }
}

/// A normalized package.json.
///
/// Paths are package-relative. After normalization `main` and `module` are
/// `./`-rooted and at most one of them is the entry for a given runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    pub main: Option<String>,
    pub module: Option<String>,
    pub jsnext_main: Option<String>,
    pub es2015: Option<String>,
    pub types: Option<String>,
    pub typings: Option<String>,
    pub browser: BTreeMap<String, String>,
    pub defined_exports: Option<ExportsNode>,
    pub types_versions: BTreeMap<String, serde_json::Value>,
    pub dependencies: BTreeMap<String, String>,
    pub peer_dependencies: BTreeMap<String, String>,
}

impl PackageDescriptor {
    /// A package with declarations but no runtime entry.
    pub fn is_types_only(&self) -> bool {
        self.main.is_none() && self.module.is_none() && self.types.is_some()
    }

    /// Neither a runtime entry nor declarations.
    pub fn is_entry_less(&self) -> bool {
        self.main.is_none() && self.module.is_none() && self.types.is_none()
    }

    /// Look up a `browser` replacement, tolerating a missing `./` on either side.
    pub fn browser_override(&self, path: &str) -> Option<&String> {
        if let Some(m) = self.browser.get(path) {
            return Some(m);
        }
        let alt = match path.strip_prefix("./") {
            Some(bare) => bare.to_string(),
            None => format!("./{}", path),
        };
        self.browser.get(&alt)
    }
}

impl From<PackageJson> for PackageDescriptor {
    fn from(p: PackageJson) -> Self {
        let browser = match p.browser {
            Some(BrowserField::Path(s)) => BTreeMap::from([(".".to_string(), s)]),
            Some(BrowserField::Map(m)) => m
                .into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                .collect(),
            None => BTreeMap::new(),
        };
        let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());

        Self {
            name: p.name.unwrap_or_default(),
            version: p.version.unwrap_or_default(),
            kind: ModuleKind::from_package_type(p.package_type.as_deref()),
            main: non_empty(p.main),
            module: non_empty(p.module),
            jsnext_main: non_empty(p.jsnext_main),
            es2015: non_empty(p.es2015),
            types: non_empty(p.types),
            typings: non_empty(p.typings),
            browser,
            defined_exports: p.exports.as_ref().and_then(ExportsNode::from_value),
            types_versions: p.types_versions.unwrap_or_default(),
            dependencies: p.dependencies,
            peer_dependencies: p.peer_dependencies,
        }
    }
}

/// A requested package: pinned version plus optional subpath.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pkg {
    pub name: String,
    pub version: String,
    pub subpath: String,
    /// Derived from `subpath` by [`to_module_name`]
    pub submodule: String,
    pub from_github: bool,
    /// Internal package generated by the service itself
    pub from_esmsh: bool,
}

impl Pkg {
    /// Create a package reference without subpath.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            from_esmsh: name.starts_with('~'),
            name,
            version: version.into(),
            ..Default::default()
        }
    }

    /// Set the subpath and the submodule derived from it.
    pub fn with_subpath(mut self, subpath: impl Into<String>) -> Self {
        self.set_subpath(subpath);
        self
    }

    pub fn set_subpath(&mut self, subpath: impl Into<String>) {
        let subpath = subpath.into();
        self.submodule = to_module_name(&subpath);
        self.subpath = subpath;
    }

    /// Parse `[gh/]name@version[/subpath]`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut spec = spec.trim_start_matches('/');
        let from_github = match spec.strip_prefix("gh/") {
            Some(rest) => {
                spec = rest;
                true
            }
            None => false,
        };

        // GitHub packages are named `owner/repo`
        let (name_version, subpath) = if from_github {
            split_at_segment(spec, 2)
        } else {
            split_pkg_path(spec)
        };
        let (name, version) = match name_version.rfind('@') {
            Some(i) if i > 0 => (&name_version[..i], &name_version[i + 1..]),
            _ => {
                return Err(BuildError::InvalidBuildArgs(format!(
                    "missing version in '{}'",
                    spec
                )));
            }
        };
        if version.is_empty() {
            return Err(BuildError::InvalidBuildArgs(format!(
                "missing version in '{}'",
                spec
            )));
        }

        let mut pkg = Pkg::new(name, version).with_subpath(subpath.unwrap_or_default());
        pkg.from_github = from_github;
        Ok(pkg)
    }

    /// Bare specifier of the requested module, `name[/submodule]`.
    pub fn import_specifier(&self) -> String {
        if self.submodule.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.name, self.submodule)
        }
    }
}

impl fmt::Display for Pkg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        if !self.subpath.is_empty() {
            write!(f, "/{}", self.subpath)?;
        }
        Ok(())
    }
}

/// Split a package path into name and optional subpath, handling scopes.
pub fn split_pkg_path(specifier: &str) -> (&str, Option<&str>) {
    let segments = if specifier.starts_with('@') { 2 } else { 1 };
    split_at_segment(specifier, segments)
}

/// Split after the first `segments` path segments.
fn split_at_segment(specifier: &str, segments: usize) -> (&str, Option<&str>) {
    let name_end = specifier
        .match_indices('/')
        .nth(segments - 1)
        .map(|(i, _)| i);

    match name_end {
        Some(i) => {
            let subpath = &specifier[i + 1..];
            (&specifier[..i], (!subpath.is_empty()).then_some(subpath))
        }
        None => (specifier, None),
    }
}

/// Derive a submodule name from a subpath.
///
/// Declaration paths (`.d.ts`, `.d.mts`) are kept as-is.
pub fn to_module_name(subpath: &str) -> String {
    let mut name = subpath.trim_start_matches('/');
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    if name.is_empty() {
        return String::new();
    }
    if paths::ends_with_any(name, &[".d.ts", ".d.mts"]) {
        return name.to_string();
    }
    for ext in MODULE_EXTS {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped;
            break;
        }
    }
    name.strip_suffix("/index").unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pkg_path() {
        assert_eq!(split_pkg_path("lodash"), ("lodash", None));
        assert_eq!(split_pkg_path("lodash/get"), ("lodash", Some("get")));
        assert_eq!(split_pkg_path("@types/node"), ("@types/node", None));
        assert_eq!(
            split_pkg_path("@babel/core/lib/index"),
            ("@babel/core", Some("lib/index"))
        );
    }

    #[test]
    fn test_to_module_name() {
        assert_eq!(to_module_name("./lib/core.js"), "lib/core");
        assert_eq!(to_module_name("/lib/index.mjs"), "lib");
        assert_eq!(to_module_name("value"), "value");
        assert_eq!(to_module_name("lib/types.d.ts"), "lib/types.d.ts");
        assert_eq!(to_module_name(""), "");
    }

    #[test]
    fn test_parse_pkg() {
        let pkg = Pkg::parse("/@sinclair/typebox@0.28.5/value").unwrap();
        assert_eq!(pkg.name, "@sinclair/typebox");
        assert_eq!(pkg.version, "0.28.5");
        assert_eq!(pkg.submodule, "value");
        assert!(!pkg.from_github);
        assert_eq!(pkg.to_string(), "@sinclair/typebox@0.28.5/value");

        let gh = Pkg::parse("gh/owner/repo@abc123/dist/mod.js").unwrap();
        assert!(gh.from_github);
        assert_eq!(gh.name, "owner/repo");
        assert_eq!(gh.version, "abc123");
        assert_eq!(gh.submodule, "dist/mod");
        assert!(Pkg::parse("react").is_err());
    }

    #[test]
    fn test_import_specifier() {
        assert_eq!(Pkg::new("react", "18.2.0").import_specifier(), "react");
        let pkg = Pkg::new("react", "18.2.0").with_subpath("jsx-runtime");
        assert_eq!(pkg.import_specifier(), "react/jsx-runtime");
    }

    #[test]
    fn test_descriptor_from_package_json() {
        let raw = PackageJson::parse(
            r#"{
                "name": "foo",
                "version": "1.0.0",
                "type": "module",
                "main": "",
                "browser": { "./node.js": "./browser.js", "fs": false },
                "exports": { ".": "./index.js" }
            }"#,
        )
        .unwrap();
        let desc = PackageDescriptor::from(raw);

        assert_eq!(desc.kind, ModuleKind::Module);
        assert_eq!(desc.main, None);
        assert_eq!(desc.browser.len(), 1);
        assert_eq!(desc.browser_override("node.js").map(String::as_str), Some("./browser.js"));
        assert!(desc.defined_exports.is_some());
    }

    #[test]
    fn test_browser_string_field() {
        let raw = PackageJson::parse(r#"{"name":"foo","browser":"./dist/browser.js"}"#).unwrap();
        let desc = PackageDescriptor::from(raw);
        assert_eq!(desc.browser.get(".").map(String::as_str), Some("./dist/browser.js"));
    }

    #[test]
    fn test_invalid_package_json() {
        assert!(matches!(
            PackageJson::parse("{ not json"),
            Err(BuildError::InvalidPackageJson(_))
        ));
    }
}
