// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS export extraction.
//!
//! Static export analysis of CommonJS code runs out of process, in a Node.js
//! script. The script receives the entry file as its only argument, runs with
//! `NODE_ENV` set and prints one JSON object on stdout:
//!
//! ```json
//! { "exports": ["a", "b"], "exportDefault": true, "reexport": "", "error": "" }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, instrument};

use crate::error::{BuildError, Result};

/// Result reported by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CjsExports {
    /// Named exports
    pub exports: Vec<String>,
    /// Whether `module.exports` carries a default export
    pub export_default: bool,
    /// Specifier of a module re-exported as a whole (`module.exports = require("x")`)
    pub reexport: String,
    /// Analyzer-internal failure
    pub error: String,
}

impl CjsExports {
    /// The re-exported specifier, if any.
    pub fn reexport(&self) -> Option<&str> {
        (!self.reexport.is_empty()).then_some(self.reexport.as_str())
    }
}

/// Extracts the export names of a CommonJS module.
///
/// Callers own timeouts and retries; a failure is terminal for the build.
pub trait CjsExportExtractor: Send + Sync {
    fn extract(&self, work_dir: &Path, entry: &Path, node_env: &str) -> Result<CjsExports>;
}

/// Runs the extraction script with a Node.js binary.
#[derive(Debug, Clone)]
pub struct NodeCjsExtractor {
    node: String,
    script: PathBuf,
}

impl NodeCjsExtractor {
    pub fn new(node: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            script: script.into(),
        }
    }
}

impl CjsExportExtractor for NodeCjsExtractor {
    #[instrument(skip(self))]
    fn extract(&self, work_dir: &Path, entry: &Path, node_env: &str) -> Result<CjsExports> {
        let output = Command::new(&self.node)
            .arg(&self.script)
            .arg(entry)
            .current_dir(work_dir)
            .env("NODE_ENV", node_env)
            .output()?;

        if !output.status.success() {
            return Err(BuildError::Extraction {
                path: entry.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let ret = parse_output(&output.stdout)?;
        debug!(
            "extracted {} CommonJS exports from {}",
            ret.exports.len(),
            entry.display()
        );
        Ok(ret)
    }
}

/// Parse the extractor's stdout. Only the last non-empty line is JSON; the
/// analyzed module may log before it.
fn parse_output(stdout: &[u8]) -> Result<CjsExports> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default();
    Ok(serde_json::from_str(line)?)
}
