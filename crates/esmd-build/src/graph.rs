// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module graph resolution for the bundler.
//!
//! [`GraphResolver`] supplies the resolve and load hooks a [`Bundler`] calls
//! while compiling one entry file. Stylesheets and (unless bundling) every
//! import stay external; bundled imports are fetched over HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::error::{BuildError, Result};
use crate::paths;
use crate::target::Target;

/// Namespace of modules loaded over HTTP.
pub const HTTP_NAMESPACE: &str = "http";

/// How a source file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
}

impl Loader {
    /// Loader for a file name's extension.
    pub fn from_path(path: &str) -> Option<Self> {
        match paths::extname(path) {
            ".js" => Some(Loader::Js),
            ".jsx" => Some(Loader::Jsx),
            ".ts" => Some(Loader::Ts),
            ".tsx" => Some(Loader::Tsx),
            _ => None,
        }
    }
}

/// Options for one bundler run.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// JSX import source handed to the bundler as-is
    pub jsx: Option<String>,
    pub target: Target,
    pub minify: bool,
    /// Use the process-wide [`BuildCache`]
    pub cache: bool,
    pub bundle: bool,
    /// Origin prefixed to root-relative imports when bundling
    pub origin: String,
}

/// Outcome of the resolve hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Let the bundler resolve it
    Default,
    /// Leave the import in the output, pointing at this path
    External(String),
    /// Load through [`GraphResolver::on_load`]
    Namespaced { path: String, namespace: &'static str },
}

/// Contents handed back by the load hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub contents: String,
    pub loader: Option<Loader>,
}

/// HTTP response as seen by the load hook.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Fetches remote modules.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(20)
            .user_agent(format!("esmd/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(FetchResponse { status, body })
    }
}

/// Resolve and load hooks for one entry file.
pub struct GraphResolver<'a> {
    filename: &'a str,
    options: &'a BuildOptions,
    fetcher: &'a dyn Fetcher,
}

impl<'a> GraphResolver<'a> {
    pub fn new(filename: &'a str, options: &'a BuildOptions, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            filename,
            options,
            fetcher,
        }
    }

    pub fn filename(&self) -> &str {
        self.filename
    }

    /// Resolve hook. Pure: the same specifier always resolves the same way.
    pub fn on_resolve(&self, specifier: &str) -> Resolution {
        let (pathname, query) = match specifier.split_once('?') {
            Some((pathname, query)) => (pathname, query),
            None => (specifier, ""),
        };

        if specifier == self.filename
            || (self.filename.ends_with(".css") && specifier.ends_with(".css"))
            || (self.filename.ends_with("?css") && specifier.ends_with("?css"))
        {
            return Resolution::Default;
        }

        if pathname.ends_with(".css") {
            let mut path = format!("{}?module", pathname);
            if !query.is_empty() {
                path.push('&');
                path.push_str(query);
            }
            return Resolution::External(path);
        }

        if query == "css" {
            return Resolution::External(format!("{}?css&module", pathname));
        }

        if !self.options.bundle {
            return Resolution::External(specifier.to_string());
        }

        let path = if pathname.starts_with("http://") || pathname.starts_with("https://") {
            pathname.to_string()
        } else if pathname.starts_with('/') {
            format!("{}{}", self.options.origin.trim_end_matches('/'), pathname)
        } else {
            let joined = paths::join(&[&paths::dirname(self.filename), pathname]);
            format!(
                "{}/{}",
                self.options.origin.trim_end_matches('/'),
                joined.trim_start_matches('/')
            )
        };
        Resolution::Namespaced {
            path,
            namespace: HTTP_NAMESPACE,
        }
    }

    /// Load hook for the `http` namespace.
    ///
    /// Any failure to get a 200 response is a [`BuildError::BadGateway`].
    #[instrument(skip(self))]
    pub async fn on_load(&self, url: &str) -> Result<LoadResult> {
        let response = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| BuildError::BadGateway(format!("{}: {}", url, e)))?;
        if response.status != 200 {
            return Err(BuildError::BadGateway(format!(
                "{}: HTTP {}",
                url, response.status
            )));
        }
        Ok(LoadResult {
            contents: String::from_utf8_lossy(&response.body).into_owned(),
            loader: Loader::from_path(self.filename),
        })
    }
}

/// Entry file handed to the bundler.
#[derive(Debug, Clone)]
pub struct BundleInput<'a> {
    pub filename: &'a str,
    pub source: &'a str,
    pub loader: Option<Loader>,
    pub options: &'a BuildOptions,
}

/// A file produced by the bundler.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: String,
    pub contents: Bytes,
}

/// External bundler driven through [`GraphResolver`] hooks.
///
/// Output is in-memory ES module format.
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn bundle(
        &self,
        input: BundleInput<'_>,
        resolver: &GraphResolver<'_>,
    ) -> Result<Vec<OutputFile>>;
}

/// Process-wide build output cache keyed by entry filename.
///
/// Entries are never evicted; a changed build gets a new filename.
#[derive(Debug, Default)]
pub struct BuildCache {
    entries: DashMap<String, Bytes>,
}

impl BuildCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<Bytes> {
        self.entries.get(filename).map(|v| v.value().clone())
    }

    pub fn set(&self, filename: &str, contents: Bytes) {
        self.entries.insert(filename.to_string(), contents);
    }

    pub fn has(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build one entry file and return its JavaScript output.
pub async fn build_module(
    filename: &str,
    source: &str,
    options: &BuildOptions,
    bundler: &dyn Bundler,
    fetcher: &dyn Fetcher,
    cache: &BuildCache,
) -> Result<Bytes> {
    if options.cache {
        if let Some(contents) = cache.get(filename) {
            debug!("Build cache hit for {}", filename);
            return Ok(contents);
        }
    }

    let resolver = GraphResolver::new(filename, options, fetcher);
    let input = BundleInput {
        filename,
        source,
        loader: Loader::from_path(filename),
        options,
    };
    let outputs = bundler.bundle(input, &resolver).await.inspect_err(|e| {
        error!("Failed to build {}: {}", filename, e);
    })?;

    let js = outputs
        .into_iter()
        .find(|file| file.path.ends_with(".js"))
        .ok_or_else(|| BuildError::Bundle("JS not found".to_string()))?;

    if options.cache {
        cache.set(filename, js.contents.clone());
    }
    Ok(js.contents)
}
