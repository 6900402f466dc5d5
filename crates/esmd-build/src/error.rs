// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for esmd-build.

use thiserror::Error;

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type for package resolution and builds.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A file expected to be an ES module has no import/export syntax.
    ///
    /// The classifier recovers from this by falling back to CommonJS.
    #[error("not a module: {0}")]
    NotAModule(String),

    /// The CommonJS export extractor reported a failure
    #[error("failed to extract CommonJS exports of '{path}': {message}")]
    Extraction { path: String, message: String },

    /// A remote module could not be fetched while bundling
    #[error("bad gateway: {0}")]
    BadGateway(String),

    /// No usable entry point
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Invalid package.json
    #[error("Invalid package.json: {0}")]
    InvalidPackageJson(String),

    /// The bundler rejected the input
    #[error("Bundle error: {0}")]
    Bundle(String),

    /// Metadata or blob storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown build target
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Malformed package path or build args segment
    #[error("Invalid build args: {0}")]
    InvalidBuildArgs(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Semver parsing error
    #[error("Invalid version: {0}")]
    Semver(#[from] semver::Error),

    /// General error with message
    #[error("{0}")]
    Other(String),
}

impl BuildError {
    /// Whether this error is the recoverable "not a module" signal.
    pub fn is_not_a_module(&self) -> bool {
        matches!(self, BuildError::NotAModule(_))
    }
}

impl From<&str> for BuildError {
    fn from(s: &str) -> Self {
        BuildError::Other(s.to_string())
    }
}

impl From<String> for BuildError {
    fn from(s: String) -> Self {
        BuildError::Other(s)
    }
}
