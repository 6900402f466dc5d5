// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Build arguments and their path-safe encoding.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{BuildError, Result};
use crate::package::Pkg;

/// Per-request options that change build output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs {
    /// Import aliases, `from -> to`
    pub aliases: BTreeMap<String, String>,
    /// Pinned dependency versions, `name -> version`
    pub deps: BTreeMap<String, String>,
    /// Specifiers left unresolved in the output
    pub externals: BTreeSet<String>,
    /// Extra export conditions, highest priority first
    pub conditions: Vec<String>,
}

impl BuildArgs {
    /// Parse `name@version,name@version` into pinned deps.
    pub fn parse_deps(list: &str) -> Result<BTreeMap<String, String>> {
        split_list(list)
            .map(|dep| Pkg::parse(dep).map(|pkg| (pkg.name, pkg.version)))
            .collect()
    }

    /// Parse `from:to,from:to` into aliases.
    pub fn parse_aliases(list: &str) -> Result<BTreeMap<String, String>> {
        split_list(list)
            .map(|pair| {
                pair.split_once(':')
                    .filter(|(from, to)| !from.is_empty() && !to.is_empty())
                    .map(|(from, to)| (from.to_string(), to.to_string()))
                    .ok_or_else(|| BuildError::InvalidBuildArgs(format!("invalid alias '{}'", pair)))
            })
            .collect()
    }

    /// Split a comma separated list, dropping empty items.
    pub fn parse_list(list: &str) -> Vec<String> {
        split_list(list).map(str::to_string).collect()
    }

    /// Whether nothing would be encoded for `pkg`.
    pub fn is_empty_for(&self, pkg: &Pkg, is_types: bool) -> bool {
        self.lines(pkg, is_types).is_empty()
    }

    fn lines(&self, pkg: &Pkg, is_types: bool) -> Vec<String> {
        let mut lines = Vec::new();

        let aliases: Vec<String> = self
            .aliases
            .iter()
            .filter(|(from, _)| **from != pkg.name)
            .map(|(from, to)| format!("{}:{}", from, to))
            .collect();
        if !aliases.is_empty() {
            lines.push(format!("a/{}", aliases.join(",")));
        }

        let deps: Vec<String> = self
            .deps
            .iter()
            .filter(|(name, _)| **name != pkg.name)
            .map(|(name, version)| format!("{}@{}", name, version))
            .collect();
        if !deps.is_empty() {
            lines.push(format!("d/{}", deps.join(",")));
        }

        if !self.externals.is_empty() {
            let externals: Vec<&str> = self.externals.iter().map(String::as_str).collect();
            lines.push(format!("e/{}", externals.join(",")));
        }

        if !is_types && !self.conditions.is_empty() {
            lines.push(format!("c/{}", self.conditions.join(",")));
        }

        lines
    }

    /// Deterministic base64url encoding; empty when there is nothing to encode.
    pub fn encode(&self, pkg: &Pkg, is_types: bool) -> String {
        let lines = self.lines(pkg, is_types);
        if lines.is_empty() {
            return String::new();
        }
        URL_SAFE_NO_PAD.encode(lines.join("\n"))
    }

    /// `X-<encoded>/`, or empty.
    pub fn encode_prefix(&self, pkg: &Pkg, is_types: bool) -> String {
        let encoded = self.encode(pkg, is_types);
        if encoded.is_empty() {
            return encoded;
        }
        format!("X-{}/", encoded)
    }

    /// Parse an `X-<encoded>` path segment.
    pub fn decode_prefix(segment: &str) -> Result<Self> {
        let encoded = segment
            .trim_end_matches('/')
            .strip_prefix("X-")
            .ok_or_else(|| BuildError::InvalidBuildArgs(format!("missing 'X-' in '{}'", segment)))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| BuildError::InvalidBuildArgs(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| BuildError::InvalidBuildArgs(e.to_string()))?;

        let mut args = BuildArgs::default();
        for line in text.lines() {
            let (kind, list) = line
                .split_once('/')
                .ok_or_else(|| BuildError::InvalidBuildArgs(format!("invalid line '{}'", line)))?;
            match kind {
                "a" => args.aliases = Self::parse_aliases(list)?,
                "d" => args.deps = Self::parse_deps(list)?,
                "e" => args.externals = split_list(list).map(str::to_string).collect(),
                "c" => args.conditions = Self::parse_list(list),
                _ => {
                    return Err(BuildError::InvalidBuildArgs(format!("unknown arg kind '{}'", kind)));
                }
            }
        }
        Ok(args)
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}
