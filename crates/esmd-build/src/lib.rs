// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # esmd-build
//!
//! Package resolution and build identity for a CDN that serves npm packages
//! as ES modules.
//!
//! A request names a package, an optional subpath and build flags. This crate:
//!
//! - resolves the entry file under Node.js conditional-exports rules
//!   ([`normalize`], [`resolve_submodule`], [`ConditionResolver`])
//! - classifies the entry as ESM or CommonJS and collects its exports
//!   ([`InteropClassifier`])
//! - derives the deterministic build ID used as storage key and public URL
//!   ([`BuildTask`])
//! - serves cached build records, dropping stale ones ([`BuildRecords`])
//! - drives a bundler through resolve/load hooks ([`build_module`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use esmd_build::{BuildArgs, BuildTask, Config, Pkg, Target};
//!
//! let config = Config::load()?;
//! let task = BuildTask::new(
//!     Pkg::parse("react@18.2.0")?,
//!     BuildArgs::default(),
//!     Target::Es2022,
//!     config.versioning(),
//! );
//! assert_eq!(task.id(), "stable/react@18.2.0/es2022/react.mjs");
//! ```

pub mod args;
pub mod cjs;
pub mod config;
pub mod context;
pub mod error;
pub mod exports;
pub mod fs;
pub mod graph;
pub mod identity;
pub mod interop;
pub mod normalize;
pub mod package;
pub mod paths;
pub mod records;
pub mod storage;
pub mod submodule;
pub mod target;
pub mod validate;

pub use args::BuildArgs;
pub use cjs::{CjsExportExtractor, CjsExports, NodeCjsExtractor};
pub use config::Config;
pub use context::ResolveContext;
pub use error::{BuildError, Result};
pub use exports::{ConditionResolver, ExportsNode, ResolvedExports};
pub use fs::{FileSystem, OsFs};
pub use graph::{
    BuildCache, BuildOptions, Bundler, Fetcher, GraphResolver, HttpFetcher, Loader, Resolution,
    build_module,
};
pub use identity::{BuildTask, BuildVersioning};
pub use interop::{Analysis, EsmBuild, InteropClassifier};
pub use normalize::normalize;
pub use package::{ModuleKind, PackageDescriptor, PackageJson, Pkg};
pub use records::BuildRecords;
pub use storage::{BlobStorage, FsStore, MemoryStore, MetadataStore};
pub use submodule::resolve_submodule;
pub use target::Target;
pub use validate::{EsmScan, EsmValidator, LexicalEsmValidator};
