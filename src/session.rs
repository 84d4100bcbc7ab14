//! One drag-and-drop batch, from collection to a (re)paired result.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::collector::{CollectedFile, DirectoryCollector};
use crate::config::Config;
use crate::engine::PairingEngine;
use crate::metadata::{self, MetadataService};
use crate::model::{DiscoveredFile, FileError, PairingResult};

/// State of a single upload batch. Dropped when the batch is uploaded or reset.
pub struct UploadSession {
    started_at: DateTime<Utc>,
    engine: PairingEngine,
    collector: DirectoryCollector,
    files: Vec<CollectedFile>,
    errors: Vec<FileError>,
    result: Option<PairingResult>,
}

impl UploadSession {
    pub fn new(config: &Config) -> Self {
        Self {
            started_at: Utc::now(),
            engine: PairingEngine::new(config.pairing.clone()),
            collector: DirectoryCollector::new(config.collector.clone()),
            files: Vec::new(),
            errors: Vec::new(),
            result: None,
        }
    }

    /// Time since the batch was opened
    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.started_at
    }

    pub fn files(&self) -> &[CollectedFile] {
        &self.files
    }

    /// Collector and metadata problems, kept apart from match decisions
    pub fn errors(&self) -> &[FileError] {
        &self.errors
    }

    pub fn result(&self) -> Option<&PairingResult> {
        self.result.as_ref()
    }

    /// Add dropped paths to the batch and return how many files joined it.
    /// Any previous result is discarded.
    pub fn collect(&mut self, roots: &[PathBuf]) -> usize {
        let collection = self.collector.collect(roots);
        let mut added = 0;

        let known: std::collections::HashSet<String> =
            self.files.iter().map(|c| c.file.full_path.clone()).collect();
        for collected in collection.files {
            if known.contains(&collected.file.full_path) {
                self.errors.push(FileError::new(
                    collected.file.full_path,
                    "Already part of this batch; skipped",
                ));
            } else {
                self.files.push(collected);
                added += 1;
            }
        }
        self.errors.extend(collection.errors);
        self.result = None;

        debug!("Session now holds {} files", self.files.len());
        added
    }

    /// Pair everything collected so far
    pub fn pair(&mut self) -> Result<&PairingResult> {
        let discovered: Vec<DiscoveredFile> = self.files.iter().map(|c| c.file.clone()).collect();
        debug!(
            "Pairing {} files at threshold {}",
            discovered.len(),
            self.engine.options().min_similarity
        );
        let result = self
            .engine
            .pair(&discovered)
            .context("Pairing rejected the collected files")?;

        info!(
            "Paired {} videos: {} subtitles matched, {} orphaned",
            result.pairs.len(),
            result.matched_subtitle_count(),
            result.orphans.len()
        );
        Ok(&*self.result.insert(result))
    }

    /// Fold enriched files back in and re-score the current result
    pub fn apply_enrichment(&mut self, updated: &[DiscoveredFile]) -> Result<&PairingResult> {
        for file in updated {
            if let Some(collected) = self
                .files
                .iter_mut()
                .find(|c| c.file.full_path == file.full_path)
            {
                collected.file = file.clone();
            }
        }

        let Some(existing) = self.result.as_ref() else {
            return self.pair();
        };
        let repaired = self
            .engine
            .repair(existing, updated)
            .context("Re-scoring with metadata failed")?;

        info!(
            "Re-paired with metadata: {} subtitles matched, {} orphaned",
            repaired.matched_subtitle_count(),
            repaired.orphans.len()
        );
        Ok(&*self.result.insert(repaired))
    }

    /// Run a metadata service over the batch and re-score with what it found
    pub async fn enrich(&mut self, service: Arc<dyn MetadataService>) -> Result<&PairingResult> {
        let (updated, errors) = metadata::enrich_all(service, &self.files).await;
        self.errors.extend(errors);
        self.apply_enrichment(&updated)
    }
}
