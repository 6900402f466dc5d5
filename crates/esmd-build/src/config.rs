// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration management for esmd.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BuildError, Result};
use crate::graph::{BuildOptions, HttpFetcher};
use crate::identity::{BuildTask, BuildVersioning};

/// Current build epoch. Bump when resolver changes invalidate cached builds.
pub const BUILD_VERSION: u32 = 136;

/// Epoch that `stable/` build IDs are stored under.
pub const STABLE_VERSION: u32 = 135;

/// Packages served from a flag-independent stable build by default.
pub const DEFAULT_STABLE_BUILDS: &[&str] = &["preact", "react", "vue"];

/// Configuration for esmd.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base path the public import URLs are rooted at
    pub base_path: String,

    /// Service origin prepended to root-relative specifiers when bundling
    pub origin: String,

    /// Build epoch
    pub build_version: u32,

    /// Epoch backing `stable/` IDs
    pub stable_version: u32,

    /// Packages with a stable build identity
    pub stable_builds: Vec<String>,

    /// Directory holding the installed `node_modules`
    pub work_dir: Option<PathBuf>,

    /// Root of the metadata and blob storage
    pub storage_dir: Option<PathBuf>,

    /// Node.js binary used by the CommonJS export extractor
    pub node: String,

    /// Script that prints the CommonJS exports of a module as JSON
    pub cjs_lexer: Option<PathBuf>,

    /// Minify build output
    pub minify: bool,

    /// Log level
    pub loglevel: String,

    /// Fetch timeout in seconds
    pub timeout: u64,

    /// Custom config values
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            origin: "http://localhost:8080".to_string(),
            build_version: BUILD_VERSION,
            stable_version: STABLE_VERSION,
            stable_builds: DEFAULT_STABLE_BUILDS.iter().map(|s| s.to_string()).collect(),
            work_dir: None,
            storage_dir: None,
            node: "node".to_string(),
            cjs_lexer: None,
            minify: true,
            loglevel: "info".to_string(),
            timeout: 60,
            extra: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        let global = PathBuf::from("/etc/esmd.conf");
        if global.exists() {
            config.merge_from_file(&global)?;
        }

        if let Some(user) = user_config_path() {
            if user.exists() {
                config.merge_from_file(&user)?;
            }
        }

        let project = PathBuf::from(".esmdrc");
        if project.exists() {
            config.merge_from_file(&project)?;
        }

        config.load_from_env();

        Ok(config)
    }

    /// Merge configuration from a file.
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.merge_from_str(&content);
        Ok(())
    }

    /// Merge `key=value` lines.
    pub fn merge_from_str(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                self.set(key.trim(), value.trim());
            }
        }
    }

    /// Load configuration from `ESMD_*` environment variables.
    fn load_from_env(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("ESMD_") {
                let config_key = config_key.to_lowercase().replace('_', "-");
                self.set(&config_key, &value);
            }
        }
    }

    /// Set a configuration value.
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "base-path" => self.base_path = value.trim_end_matches('/').to_string(),
            "origin" => self.origin = value.trim_end_matches('/').to_string(),
            "build-version" => {
                if let Ok(n) = value.parse() {
                    self.build_version = n;
                }
            }
            "stable-version" => {
                if let Ok(n) = value.parse() {
                    self.stable_version = n;
                }
            }
            "stable-builds" => {
                self.stable_builds = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            "work-dir" => self.work_dir = Some(PathBuf::from(value)),
            "storage-dir" => self.storage_dir = Some(PathBuf::from(value)),
            "node" => self.node = value.to_string(),
            "cjs-lexer" => self.cjs_lexer = Some(PathBuf::from(value)),
            "minify" => self.minify = value == "true",
            "loglevel" => self.loglevel = value.to_string(),
            "timeout" => {
                if let Ok(n) = value.parse() {
                    self.timeout = n;
                }
            }
            _ => {
                self.extra.insert(
                    key.to_string(),
                    serde_json::Value::String(value.to_string()),
                );
            }
        }
    }

    /// Get a configuration value.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "base-path" => Some(self.base_path.clone()),
            "origin" => Some(self.origin.clone()),
            "build-version" => Some(self.build_version.to_string()),
            "stable-version" => Some(self.stable_version.to_string()),
            "stable-builds" => Some(self.stable_builds.join(",")),
            "work-dir" => Some(self.work_dir().display().to_string()),
            "storage-dir" => Some(self.storage_dir().display().to_string()),
            "node" => Some(self.node.clone()),
            "cjs-lexer" => self.cjs_lexer.as_ref().map(|p| p.display().to_string()),
            "minify" => Some(self.minify.to_string()),
            "loglevel" => Some(self.loglevel.clone()),
            "timeout" => Some(self.timeout.to_string()),
            _ => self.extra.get(key).and_then(|v| v.as_str().map(String::from)),
        }
    }

    /// Get the work directory.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the storage directory.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(default_storage_dir)
    }

    /// Get the CommonJS lexer script, which has no default.
    pub fn cjs_lexer(&self) -> Result<&Path> {
        self.cjs_lexer
            .as_deref()
            .ok_or_else(|| BuildError::Config("cjs-lexer is not set".into()))
    }

    /// Build epoch and stable allow-list shared by every build task.
    pub fn versioning(&self) -> Arc<BuildVersioning> {
        Arc::new(BuildVersioning::new(
            self.build_version,
            self.stable_version,
            self.stable_builds.iter().cloned(),
        ))
    }

    /// Bundler options for `task`, with `origin` and `minify` taken from here.
    pub fn build_options(&self, task: &BuildTask) -> BuildOptions {
        BuildOptions {
            jsx: None,
            target: task.target,
            minify: self.minify,
            cache: true,
            bundle: task.bundle,
            origin: self.origin.clone(),
        }
    }

    /// HTTP fetcher for remote imports, bounded by `timeout` seconds.
    pub fn fetcher(&self) -> Result<HttpFetcher> {
        HttpFetcher::new(Duration::from_secs(self.timeout))
    }
}

/// Get the user config path.
fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".esmdrc"))
}

/// Get the default storage directory.
fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("esmd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_from_str() {
        let mut config = Config::default();
        config.merge_from_str(
            "# comment\n\
             origin=https://cdn.example.com/\n\
             build-version = 140\n\
             stable-builds=react, vue\n\
             ; another comment\n\
             custom=1\n",
        );

        assert_eq!(config.origin, "https://cdn.example.com");
        assert_eq!(config.build_version, 140);
        assert_eq!(config.stable_builds, vec!["react", "vue"]);
        assert_eq!(config.get("custom").as_deref(), Some("1"));
    }

    #[test]
    fn test_invalid_number_is_ignored() {
        let mut config = Config::default();
        config.set("build-version", "latest");
        assert_eq!(config.build_version, BUILD_VERSION);
    }

    #[test]
    fn test_cjs_lexer_required() {
        let config = Config::default();
        assert!(matches!(config.cjs_lexer(), Err(BuildError::Config(_))));
    }

    #[test]
    fn test_versioning() {
        let versioning = Config::default().versioning();
        assert!(versioning.is_stable("react"));
        assert!(!versioning.is_stable("lodash"));
    }

    #[test]
    fn test_build_options() {
        use crate::args::BuildArgs;
        use crate::package::Pkg;
        use crate::target::Target;

        let mut config = Config::default();
        config.merge_from_str("origin=https://cdn.example.com/\nminify=false\n");

        let task = BuildTask::new(
            Pkg::new("react", "18.2.0"),
            BuildArgs::default(),
            Target::Es2022,
            config.versioning(),
        )
        .with_bundle(true);
        let options = config.build_options(&task);

        assert_eq!(options.origin, "https://cdn.example.com");
        assert!(!options.minify);
        assert!(options.bundle);
        assert!(options.cache);
        assert_eq!(options.target, Target::Es2022);
        assert_eq!(options.jsx, None);
    }

    #[test]
    fn test_fetcher() {
        let mut config = Config::default();
        config.set("timeout", "5");
        assert_eq!(config.timeout, 5);
        assert!(config.fetcher().is_ok());
    }
}
