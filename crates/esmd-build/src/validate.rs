// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static ES module detection.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::Result;
use crate::fs::FileSystem;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|[\s;])//[^\n]*").expect("valid regex"));

static IMPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(?:^|[;}\s])import\s*(?:[\w*{][^;]*?\s*from\s*)?['"][^'"]+['"]"#).expect("valid regex")
});

static IMPORT_META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimport\.meta\b").expect("valid regex"));

static EXPORT_STMT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(?:^|[;}\s])export\s*(?:default\b|\{|\*|(?:async\s+)?function\b|class\b|const\b|let\b|var\b)",
    )
    .expect("valid regex")
});

static EXPORT_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^|[;}\s])export\s+default\b").expect("valid regex"));

static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(?:^|[;}\s])export\s+(?:(?:async\s+)?function\s*\*?\s*|class\s+|(?:const|let|var)\s+)([A-Za-z_$][\w$]*)",
    )
    .expect("valid regex")
});

static EXPORT_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^|[;}\s])export\s*\{([^}]*)\}").expect("valid regex"));

static EXPORT_ALL_AS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(?:^|[;}\s])export\s*\*\s*as\s+([A-Za-z_$][\w$]*)\s+from\s*['"]"#).expect("valid regex")
});

/// Outcome of a static scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsmScan {
    /// Whether the source uses ES module syntax
    pub is_esm: bool,
    /// Names exported by `export` statements, `default` included
    pub named_exports: Vec<String>,
}

/// Decides whether a file is an ES module and lists its exports.
pub trait EsmValidator: Send + Sync {
    /// Scan `path`, read through `fs`.
    fn validate(&self, fs: &dyn FileSystem, path: &Path) -> Result<EsmScan>;
}

/// Regex-based scanner over import/export statements.
///
/// It does not parse; comments are stripped first so commented-out syntax
/// does not count. Statements may start a line or follow `;`, `}` or
/// whitespace, which covers minified bundles.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalEsmValidator;

impl LexicalEsmValidator {
    pub fn new() -> Self {
        Self
    }

    /// Scan source text.
    pub fn scan(&self, source: &str) -> EsmScan {
        let source = BLOCK_COMMENT.replace_all(source, "");
        let source = LINE_COMMENT.replace_all(&source, "$1");

        let is_esm = IMPORT_DECL.is_match(&source)
            || IMPORT_META.is_match(&source)
            || EXPORT_STMT.is_match(&source);
        if !is_esm {
            return EsmScan::default();
        }

        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        };

        if EXPORT_DEFAULT.is_match(&source) {
            push("default");
        }
        for cap in EXPORT_DECL.captures_iter(&source) {
            push(&cap[1]);
        }
        for cap in EXPORT_LIST.captures_iter(&source) {
            for part in cap[1].split(',') {
                let part = part.trim();
                if part.is_empty() || part.starts_with("type ") {
                    continue;
                }
                let exported = match part.split_once(" as ") {
                    Some((_, alias)) => alias.trim(),
                    None => part,
                };
                push(exported.trim_matches(|c| c == '"' || c == '\''));
            }
        }
        for cap in EXPORT_ALL_AS.captures_iter(&source) {
            push(&cap[1]);
        }

        EsmScan {
            is_esm,
            named_exports: names,
        }
    }
}

impl EsmValidator for LexicalEsmValidator {
    fn validate(&self, fs: &dyn FileSystem, path: &Path) -> Result<EsmScan> {
        let source = fs.read_to_string(path)?;
        Ok(self.scan(&source))
    }
}
