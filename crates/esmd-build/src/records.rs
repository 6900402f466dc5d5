// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Build record cache.
//!
//! Maps a build ID to its [`EsmBuild`] metadata. A record is only served when
//! the artifact it describes still exists; stale records are deleted on read.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::identity::BuildVersioning;
use crate::interop::EsmBuild;
use crate::paths;
use crate::storage::{BlobStorage, MetadataStore};

pub struct BuildRecords {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStorage>,
    stable_version: u32,
}

impl BuildRecords {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStorage>,
        versioning: &BuildVersioning,
    ) -> Self {
        Self {
            metadata,
            blobs,
            stable_version: versioning.stable_version,
        }
    }

    /// Metadata for `id`, or `None` on a miss.
    ///
    /// Undecodable records and records whose artifact is gone count as misses
    /// and are removed.
    pub async fn lookup(&self, id: &str) -> Result<Option<EsmBuild>> {
        let Some(data) = self.metadata.get(id).await? else {
            return Ok(None);
        };

        let build: EsmBuild = match serde_json::from_slice(&data) {
            Ok(build) => build,
            Err(e) => {
                warn!("dropping undecodable build record {}: {}", id, e);
                self.metadata.delete(id).await?;
                return Ok(None);
            }
        };

        if !build.types_only {
            let save_path = self.blob_path(id);
            if !self.blobs.stat(&save_path).await? {
                debug!("dropping stale build record {} (missing {})", id, save_path);
                self.metadata.delete(id).await?;
                return Ok(None);
            }
        }

        Ok(Some(build))
    }

    /// Record a finished build.
    pub async fn store(&self, id: &str, build: &EsmBuild) -> Result<()> {
        let data = serde_json::to_vec(build)?;
        self.metadata.put(id, &data).await
    }

    /// Artifact location of `id`; `stable/` IDs live under their concrete epoch.
    pub fn blob_path(&self, id: &str) -> String {
        match id.strip_prefix("stable/") {
            Some(rest) => paths::join(&["builds", &format!("v{}", self.stable_version), rest]),
            None => paths::join(&["builds", id]),
        }
    }
}
