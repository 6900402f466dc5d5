// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Slash-separated path helpers.
//!
//! Package-relative paths and build IDs always use `/`, whatever the host
//! platform, so these never go through `std::path`.

/// Normalize a path, resolving `.` and `..` segments.
pub fn normalize(path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    let is_absolute = path.starts_with('/');

    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                if !components.is_empty() && components.last() != Some(&"..") {
                    components.pop();
                } else if !is_absolute {
                    components.push("..");
                }
            }
            c => components.push(c),
        }
    }

    let result = components.join("/");

    if is_absolute {
        format!("/{}", result)
    } else if result.is_empty() {
        ".".to_string()
    } else {
        result
    }
}

/// Join path segments, skipping empty ones, and normalize.
pub fn join(paths: &[&str]) -> String {
    let joined = paths
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return String::new();
    }
    normalize(&joined)
}

/// Directory part of a path.
pub fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(i) => normalize(&path[..i]),
        None => ".".to_string(),
    }
}

/// Last segment of a path.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Extension of the last segment, including the dot.
pub fn extname(path: &str) -> &str {
    let base = basename(path);
    match base.rfind('.') {
        Some(i) if i > 0 => &base[i..],
        _ => "",
    }
}

/// Render a package-relative path as `./`-rooted.
pub fn dot_slash(path: &str) -> String {
    if path.starts_with("./") || path.starts_with("../") {
        return path.to_string();
    }
    let cleaned = normalize(&format!("/{}", path));
    format!(".{}", cleaned)
}

/// Strip the last `.ext` from a path, keeping directories intact.
pub fn strip_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(i) if !path[i..].contains('/') => &path[..i],
        _ => path,
    }
}

/// Whether a path ends with any of the given suffixes.
pub fn ends_with_any(path: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| path.ends_with(s))
}
