// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Read-only filesystem probes used during resolution.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::Result;

/// Existence probes and reads over an installed package tree.
///
/// Probe errors of any kind, permission errors included, read as absence.
pub trait FileSystem: Send + Sync {
    /// Whether `path` is an existing regular file.
    fn file_exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing directory.
    fn dir_exists(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(fs: &dyn FileSystem, path: &Path) -> Result<T> {
    let content = fs.read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn file_exists(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
    }

    fn dir_exists(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_probes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.js"), "").unwrap();

        assert!(OsFs.file_exists(&dir.path().join("index.js")));
        assert!(!OsFs.file_exists(&dir.path().join("missing.js")));
        assert!(!OsFs.file_exists(dir.path()));
        assert!(OsFs.dir_exists(dir.path()));
    }

    #[test]
    fn test_read_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, r#"{"name":"foo"}"#).unwrap();

        let value: serde_json::Value = read_json(&OsFs, &path).unwrap();
        assert_eq!(value["name"], "foo");
        assert!(read_json::<serde_json::Value>(&OsFs, &dir.path().join("nope.json")).is_err());
    }
}
