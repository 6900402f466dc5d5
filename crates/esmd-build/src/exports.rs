// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Conditional exports resolution.
//!
//! A package's `exports` field is a tree of strings and condition (or
//! subpath) maps. Resolution walks a map twice: once with an ESM-oriented
//! condition priority list to find the module entry, once with a CommonJS
//! list to find the main entry. Both walks go through [`ConditionResolver::apply`];
//! only the priority list differs.
//!
//! See <https://nodejs.org/api/packages.html#conditional-exports>.

use semver::Version;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::package::ModuleKind;
use crate::target::Target;

/// Packages that must resolve with the `node` condition under Deno when older
/// than the given version.
const DENO_NODE_CONDITION: &[(&str, &str)] = &[("solid-js", "1.5.6")];

/// A node of the `exports` tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportsNode {
    /// A target path
    Leaf(String),
    /// Condition or subpath keys, in declaration order
    Conditions(Vec<(String, ExportsNode)>),
    /// An explicit `null` target: matched, but exports nothing
    Null,
}

impl ExportsNode {
    /// Build the tree from raw JSON.
    ///
    /// Fallback arrays collapse to their first usable element; numbers and
    /// booleans are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ExportsNode::Leaf(s.clone())),
            Value::Object(map) => Some(ExportsNode::Conditions(
                map.iter()
                    .filter_map(|(k, v)| ExportsNode::from_value(v).map(|n| (k.clone(), n)))
                    .collect(),
            )),
            Value::Array(items) => items.iter().find_map(ExportsNode::from_value),
            Value::Null => Some(ExportsNode::Null),
            _ => None,
        }
    }

    /// Convert back to JSON.
    pub fn to_value(&self) -> Value {
        match self {
            ExportsNode::Leaf(s) => Value::String(s.clone()),
            ExportsNode::Conditions(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
            ExportsNode::Null => Value::Null,
        }
    }

    /// Child under `key` of a condition map.
    pub fn get(&self, key: &str) -> Option<&ExportsNode> {
        match self {
            ExportsNode::Conditions(entries) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// First child matching a condition, in priority order.
    pub fn first_match<'a>(&'a self, priority: &[&str]) -> Option<&'a ExportsNode> {
        priority.iter().find_map(|condition| self.get(condition))
    }

    /// The subtree describing the package root: the `"."` entry when present,
    /// otherwise the node itself (a string or a flat condition map).
    pub fn root(&self) -> &ExportsNode {
        self.get(".").unwrap_or(self)
    }

    /// Replace every `*` in every leaf of the subtree.
    pub fn substitute(&self, captured: &str) -> ExportsNode {
        match self {
            ExportsNode::Leaf(s) => ExportsNode::Leaf(s.replace('*', captured)),
            ExportsNode::Conditions(entries) => ExportsNode::Conditions(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.substitute(captured)))
                    .collect(),
            ),
            ExportsNode::Null => ExportsNode::Null,
        }
    }

    /// Find the subtree exported for `./<submodule>`.
    ///
    /// Exact keys (optionally with `.js`/`.mjs`) win over patterns; among
    /// patterns the longest prefix wins. The captured `*` part is substituted
    /// into the returned subtree.
    pub fn match_subpath(&self, submodule: &str) -> Option<ExportsNode> {
        let ExportsNode::Conditions(entries) = self else {
            return None;
        };

        let request = format!("./{}", submodule);
        let exact = [
            request.clone(),
            format!("{}.js", request),
            format!("{}.mjs", request),
        ];
        if let Some((_, node)) = entries.iter().find(|(k, _)| exact.contains(k)) {
            return Some(node.clone());
        }

        let mut best: Option<(usize, ExportsNode)> = None;
        for (key, node) in entries {
            let Some((prefix, suffix)) = key.split_once('*') else {
                continue;
            };
            if suffix.contains('*')
                || request.len() < prefix.len() + suffix.len()
                || !request.starts_with(prefix)
                || !request.ends_with(suffix)
            {
                continue;
            }
            if best.as_ref().is_some_and(|(len, _)| *len >= prefix.len()) {
                continue;
            }
            let captured = &request[prefix.len()..request.len() - suffix.len()];
            best = Some((prefix.len(), node.substitute(captured)));
        }
        best.map(|(_, node)| node)
    }
}

impl Serialize for ExportsNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Entry paths picked out of an `exports` tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedExports {
    pub main: Option<String>,
    pub module: Option<String>,
    /// Last `types` string seen in any visited condition map
    pub types: Option<String>,
    /// Last `typings` string seen in any visited condition map
    pub typings: Option<String>,
}

/// Evaluates `exports` trees against the conditions of one build.
#[derive(Debug, Clone)]
pub struct ConditionResolver<'a> {
    target: Target,
    dev: bool,
    extra_conditions: &'a [String],
    package_name: &'a str,
    package_version: &'a str,
}

impl<'a> ConditionResolver<'a> {
    /// Create a resolver. `extra_conditions` outrank the target's own, in order.
    pub fn new(
        target: Target,
        dev: bool,
        extra_conditions: &'a [String],
        package_name: &'a str,
        package_version: &'a str,
    ) -> Self {
        Self {
            target,
            dev,
            extra_conditions,
            package_name,
            package_version,
        }
    }

    /// Resolve a tree, starting in the package's declared module kind.
    pub fn resolve(&self, node: &ExportsNode, kind: ModuleKind) -> ResolvedExports {
        let mut out = ResolvedExports::default();
        self.apply(node, kind, &mut out);
        out
    }

    /// Caller conditions, then the runtime's, then `development` in dev mode.
    pub fn target_conditions(&self) -> Vec<&str> {
        let mut conditions: Vec<&str> = self.extra_conditions.iter().map(String::as_str).collect();
        match self.target {
            Target::Deno | Target::DenoNext if self.prefers_node_in_deno() => {
                conditions.push("node");
            }
            Target::Deno | Target::DenoNext => conditions.extend(["deno", "worker"]),
            Target::Node => conditions.push("node"),
            _ => conditions.push("browser"),
        }
        if self.dev {
            conditions.push("development");
        }
        conditions
    }

    fn apply(&self, node: &ExportsNode, kind: ModuleKind, out: &mut ResolvedExports) {
        match node {
            ExportsNode::Leaf(s) if s.is_empty() => {}
            ExportsNode::Leaf(s) => match kind {
                ModuleKind::Module => out.module = Some(s.clone()),
                ModuleKind::CommonJs => out.main = Some(s.clone()),
            },
            ExportsNode::Null => {}
            ExportsNode::Conditions(entries) => {
                let targets = self.target_conditions();

                let mut esm_order = targets.clone();
                esm_order.extend(["module", "import", "es2015"]);
                if self.target.is_deno() {
                    esm_order.push("browser");
                }
                let has_cjs_branch = node.get("require").is_some() || node.get("node").is_some();
                if kind == ModuleKind::Module || has_cjs_branch {
                    esm_order.push("default");
                }
                if let Some(next) = node.first_match(&esm_order) {
                    self.apply(next, ModuleKind::Module, out);
                }

                let mut cjs_order = targets;
                cjs_order.extend(["require", "node", "default"]);
                if let Some(next) = node.first_match(&cjs_order) {
                    self.apply(next, ModuleKind::CommonJs, out);
                }

                for (key, value) in entries {
                    if let ExportsNode::Leaf(s) = value {
                        if s.is_empty() {
                            continue;
                        }
                        match key.as_str() {
                            "types" => out.types = Some(s.clone()),
                            "typings" => out.typings = Some(s.clone()),
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    fn prefers_node_in_deno(&self) -> bool {
        DENO_NODE_CONDITION.iter().any(|(name, below)| {
            let matches_name = self.package_name == *name
                || self
                    .package_name
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('/'));
            matches_name && semver_less_than(self.package_version, below)
        })
    }
}

/// `a < b`, false when either side does not parse.
fn semver_less_than(a: &str, b: &str) -> bool {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a < b,
        _ => false,
    }
}
