// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Build targets.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;

/// Deno releases before this one get the `deno` target, later ones `denonext`.
const DENO_NEXT_SINCE: Version = Version::new(1, 33, 2);

/// Runtime a build is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Es2015,
    Es2016,
    Es2017,
    Es2018,
    Es2019,
    Es2020,
    Es2021,
    Es2022,
    #[serde(rename = "esnext")]
    EsNext,
    Deno,
    #[serde(rename = "denonext")]
    DenoNext,
    Node,
    /// Unbuilt source files
    Raw,
    /// Type declarations
    Types,
}

/// Targets a build path segment may name.
pub const TARGETS: &[Target] = &[
    Target::Es2015,
    Target::Es2016,
    Target::Es2017,
    Target::Es2018,
    Target::Es2019,
    Target::Es2020,
    Target::Es2021,
    Target::Es2022,
    Target::EsNext,
    Target::Deno,
    Target::DenoNext,
    Target::Node,
];

impl Target {
    /// The target's path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Es2015 => "es2015",
            Target::Es2016 => "es2016",
            Target::Es2017 => "es2017",
            Target::Es2018 => "es2018",
            Target::Es2019 => "es2019",
            Target::Es2020 => "es2020",
            Target::Es2021 => "es2021",
            Target::Es2022 => "es2022",
            Target::EsNext => "esnext",
            Target::Deno => "deno",
            Target::DenoNext => "denonext",
            Target::Node => "node",
            Target::Raw => "raw",
            Target::Types => "types",
        }
    }

    /// Server runtimes ignore the `browser` field.
    pub fn is_server(&self) -> bool {
        matches!(self, Target::Deno | Target::DenoNext | Target::Node)
    }

    pub fn is_deno(&self) -> bool {
        matches!(self, Target::Deno | Target::DenoNext)
    }

    /// Pick a target from a `User-Agent` header.
    ///
    /// Browsers are not feature-detected and get `esnext`.
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent else {
            return Target::EsNext;
        };
        if ua.starts_with("curl/") {
            return Target::EsNext;
        }
        if let Some(version) = ua.strip_prefix("Deno/") {
            return match Version::parse(version.split_whitespace().next().unwrap_or_default()) {
                Ok(v) if v < DENO_NEXT_SINCE => Target::Deno,
                _ => Target::DenoNext,
            };
        }
        if ua.starts_with("Node/") || ua.starts_with("Bun/") {
            return Target::Node;
        }
        Target::EsNext
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::EsNext
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TARGETS
            .iter()
            .chain([Target::Raw, Target::Types].iter())
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| BuildError::InvalidTarget(s.to_string()))
    }
}

/// Check whether a request path already names a build target, e.g.
/// `/v136/react@18.2.0/es2022/react.mjs`.
pub fn has_target_segment(path: &str) -> bool {
    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    parts.len() >= 2
        && parts
            .iter()
            .any(|p| TARGETS.iter().any(|t| t.as_str() == *p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!("es2022".parse::<Target>().unwrap(), Target::Es2022);
        assert_eq!("denonext".parse::<Target>().unwrap(), Target::DenoNext);
        assert_eq!("types".parse::<Target>().unwrap(), Target::Types);
        assert!("es5".parse::<Target>().is_err());
    }

    #[test]
    fn test_server_targets() {
        assert!(Target::Node.is_server());
        assert!(Target::Deno.is_server());
        assert!(!Target::EsNext.is_server());
        assert!(Target::DenoNext.is_deno());
    }

    #[test]
    fn test_from_user_agent() {
        assert_eq!(Target::from_user_agent(None), Target::EsNext);
        assert_eq!(Target::from_user_agent(Some("curl/8.0.1")), Target::EsNext);
        assert_eq!(Target::from_user_agent(Some("Deno/1.30.0")), Target::Deno);
        assert_eq!(Target::from_user_agent(Some("Deno/1.40.1")), Target::DenoNext);
        assert_eq!(Target::from_user_agent(Some("Bun/1.0.0")), Target::Node);
        assert_eq!(Target::from_user_agent(Some("Mozilla/5.0")), Target::EsNext);
    }

    #[test]
    fn test_has_target_segment() {
        assert!(has_target_segment("/v136/react@18.2.0/es2022/react.mjs"));
        assert!(!has_target_segment("/react@18.2.0"));
        assert!(!has_target_segment("/node"));
    }
}
