// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end: request -> identity -> resolution -> build -> record.

use async_trait::async_trait;
use bytes::Bytes;
use esmd_build::graph::{BundleInput, FetchResponse, OutputFile};
use esmd_build::{
    BlobStorage, BuildArgs, BuildCache, BuildError, BuildRecords, BuildTask,
    BuildVersioning, Bundler, CjsExportExtractor, CjsExports, Config, Fetcher, GraphResolver,
    InteropClassifier, LexicalEsmValidator, MemoryStore, MetadataStore, OsFs, Pkg, Resolution, ResolveContext,
    Result, Target, build_module,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct NoCjs;

impl CjsExportExtractor for NoCjs {
    fn extract(&self, _work_dir: &Path, entry: &Path, _node_env: &str) -> Result<CjsExports> {
        Err(BuildError::Other(format!("unexpected CommonJS entry {}", entry.display())))
    }
}

struct FixedCjs {
    exports: CjsExports,
    node_env: &'static str,
}

impl CjsExportExtractor for FixedCjs {
    fn extract(&self, _work_dir: &Path, _entry: &Path, node_env: &str) -> Result<CjsExports> {
        if node_env != self.node_env {
            return Err(BuildError::Other(format!("expected NODE_ENV={}, got {}", self.node_env, node_env)));
        }
        Ok(self.exports.clone())
    }
}

struct Offline;

#[async_trait]
impl Fetcher for Offline {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        Err(BuildError::Other(format!("offline: {}", url)))
    }
}

/// Rewrites each `import "<specifier>"` line through the resolve hook.
struct LineBundler;

#[async_trait]
impl Bundler for LineBundler {
    async fn bundle(&self, input: BundleInput<'_>, resolver: &GraphResolver<'_>) -> Result<Vec<OutputFile>> {
        let mut out = String::new();
        for line in input.source.lines() {
            let specifier = line
                .strip_prefix("import \"")
                .and_then(|rest| rest.strip_suffix("\";"));
            match specifier.map(|s| resolver.on_resolve(s)) {
                Some(Resolution::External(path)) => out.push_str(&format!("import \"{}\";\n", path)),
                Some(other) => return Err(BuildError::Bundle(format!("unexpected {:?}", other))),
                None => {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        Ok(vec![OutputFile {
            path: "/esbuild/stdin.js".into(),
            contents: Bytes::from(out),
        }])
    }
}

fn install(root: &Path, name: &str, files: &[(&str, &str)]) {
    let dir = root.join("node_modules").join(name);
    for (path, content) in files {
        let full = dir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }
}

fn versioning() -> Arc<BuildVersioning> {
    Arc::new(BuildVersioning::new(136, 135, ["react".to_string()]))
}

#[tokio::test]
async fn test_esm_package_pipeline() {
    let work = TempDir::new().unwrap();
    install(
        work.path(),
        "pretty",
        &[
            (
                "package.json",
                r#"{
                    "name": "pretty",
                    "version": "2.1.0",
                    "type": "module",
                    "exports": {
                        ".": { "types": "./index.d.ts", "import": "./dist/index.js", "require": "./dist/index.cjs" },
                        "./colors/*": { "import": "./dist/colors/*.js" }
                    }
                }"#,
            ),
            ("index.d.ts", "export declare const red: string;\n"),
            (
                "dist/colors/red.js",
                "import \"./base.css\";\nexport const red = '#f00';\nexport default red;\n",
            ),
            ("dist/index.js", "export * from './colors/red.js';\n"),
        ],
    );

    let task = BuildTask::new(
        Pkg::parse("pretty@2.1.0/colors/red").unwrap(),
        BuildArgs::default(),
        Target::Es2022,
        versioning(),
    );
    assert_eq!(task.id(), "v136/pretty@2.1.0/es2022/colors/red.js");

    let metadata = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryStore::new());
    let records = BuildRecords::new(metadata.clone(), blobs.clone(), task.versioning());
    assert!(records.lookup(&task.id()).await.unwrap().is_none());

    let ctx = ResolveContext::for_task(&task, &OsFs, &LexicalEsmValidator, work.path());
    let analysis = InteropClassifier::new(ctx, &NoCjs).analyze().unwrap();
    assert_eq!(analysis.descriptor.module.as_deref(), Some("./dist/colors/red.js"));
    assert!(!analysis.build.from_cjs);
    assert!(analysis.build.has_export_default);
    assert!(analysis.build.named_exports.contains("red"));

    let entry = analysis.entry().unwrap().to_string();
    let source = std::fs::read_to_string(ctx.package_dir().join(&entry)).unwrap();
    let options = Config::default().build_options(&task);
    assert_eq!(options.target, Target::Es2022);
    assert!(options.cache);
    let filename = format!("/{}/{}", task.pkg, entry.trim_start_matches("./"));
    let output = build_module(&filename, &source, &options, &LineBundler, &Offline, &BuildCache::new())
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&output).contains("import \"./base.css?module\";"));

    BlobStorage::put(blobs.as_ref(), &task.save_path(), &output).await.unwrap();
    records.store(&task.id(), &analysis.build).await.unwrap();
    assert_eq!(records.lookup(&task.id()).await.unwrap(), Some(analysis.build.clone()));

    // A record whose artifact disappeared is dropped on the next lookup.
    blobs.delete(&task.save_path()).await.unwrap();
    assert!(records.lookup(&task.id()).await.unwrap().is_none());
    assert!(!metadata.contains(&task.id()));
}

#[tokio::test]
async fn test_cjs_reexport_pipeline() {
    let work = TempDir::new().unwrap();
    install(
        work.path(),
        "shim",
        &[
            ("package.json", r#"{"name":"shim","version":"1.0.0","main":"index.js"}"#),
            ("index.js", "module.exports = require('other-pkg');\n"),
        ],
    );

    let task = BuildTask::new(
        Pkg::parse("shim@1.0.0").unwrap(),
        BuildArgs::default(),
        Target::Node,
        versioning(),
    )
    .with_dev(true);
    assert_eq!(task.id(), "v136/shim@1.0.0/node/shim.development.mjs");

    let extractor = FixedCjs {
        exports: CjsExports {
            reexport: "other-pkg".into(),
            ..Default::default()
        },
        node_env: "development",
    };
    let ctx = ResolveContext::for_task(&task, &OsFs, &LexicalEsmValidator, work.path());
    let analysis = InteropClassifier::new(ctx, &extractor).analyze().unwrap();

    assert!(analysis.build.from_cjs);
    assert!(analysis.build.named_exports.is_empty());
    assert_eq!(analysis.reexport.as_deref(), Some("other-pkg"));
    assert_eq!(analysis.descriptor.main.as_deref(), Some("./index.js"));
}

#[test]
fn test_stable_builds_ignore_flags() {
    let plain = BuildTask::new(Pkg::parse("react@18.2.0").unwrap(), BuildArgs::default(), Target::Es2022, versioning());
    let args = BuildArgs {
        conditions: vec!["react-server".into()],
        deps: [("scheduler".to_string(), "0.23.0".to_string())].into(),
        ..Default::default()
    };
    let flagged = BuildTask::new(Pkg::parse("react@18.2.0").unwrap(), args, Target::Es2022, versioning());
    assert_eq!(plain.id(), flagged.id());
    assert_eq!(plain.save_path(), "builds/v135/react@18.2.0/es2022/react.mjs");
}
