//! Turn dropped files and folders into a flat, session-relative file list.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::CollectorConfig;
use crate::model::{DiscoveredFile, FileError, FileKind};

/// Where the bytes of a collected file live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Origin {
    Disk { path: PathBuf },
    ZipEntry { archive: PathBuf, entry: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedFile {
    pub file: DiscoveredFile,
    pub origin: Origin,
}

/// Everything found in one drop, plus what could not be read
#[derive(Debug, Clone, Default, Serialize)]
pub struct Collection {
    pub files: Vec<CollectedFile>,
    pub errors: Vec<FileError>,
}

impl Collection {
    /// The files in the form the pairing engine takes
    pub fn discovered(&self) -> Vec<DiscoveredFile> {
        self.files.iter().map(|c| c.file.clone()).collect()
    }

    pub fn count(&self, kind: FileKind) -> usize {
        self.files.iter().filter(|c| c.file.kind == kind).count()
    }
}

pub struct DirectoryCollector {
    config: CollectorConfig,
}

impl DirectoryCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Classify a file name by its extension
    pub fn classify(&self, name: &str) -> FileKind {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return FileKind::Other;
        };
        if self.config.is_video(ext) {
            FileKind::Video
        } else if self.config.is_subtitle(ext) {
            FileKind::Subtitle
        } else if self.config.is_archive(ext) {
            FileKind::Archive
        } else {
            FileKind::Other
        }
    }

    /// Collect every file under the given roots.
    ///
    /// A dropped folder `.../A` contributes paths `A/...`; a dropped file
    /// contributes its bare name. Problems with single entries are recorded
    /// in `errors` and never abort the drop.
    pub fn collect(&self, roots: &[PathBuf]) -> Collection {
        let mut collection = Collection::default();
        let mut seen = HashSet::new();

        for root in roots {
            if let Err(e) = self.collect_root(root, &mut collection, &mut seen) {
                warn!("Failed to collect {}: {:#}", root.display(), e);
                collection
                    .errors
                    .push(FileError::new(root.display().to_string(), format!("{:#}", e)));
            }
        }

        info!(
            "Collected {} files ({} videos, {} subtitles, {} archives), {} errors",
            collection.files.len(),
            collection.count(FileKind::Video),
            collection.count(FileKind::Subtitle),
            collection.count(FileKind::Archive),
            collection.errors.len()
        );
        collection
    }

    fn collect_root(
        &self,
        root: &Path,
        collection: &mut Collection,
        seen: &mut HashSet<String>,
    ) -> Result<()> {
        let metadata = std::fs::metadata(root)
            .with_context(|| format!("Cannot read {}", root.display()))?;
        let base = root_name(root)?;

        if metadata.is_file() {
            self.add_file(root, base, metadata.len(), collection, seen);
            return Ok(());
        }

        debug!("Walking {} as {}", root.display(), base);

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.config.follow_links)
            .sort_by_file_name();
        if self.config.max_depth > 0 {
            walker = walker.max_depth(self.config.max_depth);
        }

        for entry in walker.into_iter().filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name())) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    collection.errors.push(FileError::new(path, e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let session_path = format!("{}/{}", base, join_components(relative));
            match entry.metadata() {
                Ok(meta) => self.add_file(entry.path(), session_path, meta.len(), collection, seen),
                Err(e) => collection.errors.push(FileError::new(session_path, e.to_string())),
            }
        }
        Ok(())
    }

    fn add_file(
        &self,
        disk_path: &Path,
        session_path: String,
        size: u64,
        collection: &mut Collection,
        seen: &mut HashSet<String>,
    ) {
        if !seen.insert(session_path.clone()) {
            collection.errors.push(FileError::new(
                session_path,
                "Another dropped item already uses this path; skipped",
            ));
            return;
        }

        let file = DiscoveredFile::new(session_path, size, FileKind::Other);
        let kind = self.classify(&file.name);
        let file = DiscoveredFile { kind, ..file };

        let expand = kind == FileKind::Archive
            && self.config.expand_archives
            && file.name.to_ascii_lowercase().ends_with(".zip");
        let archive_path = file.full_path.clone();

        collection.files.push(CollectedFile {
            file,
            origin: Origin::Disk {
                path: disk_path.to_path_buf(),
            },
        });

        if expand {
            if let Err(e) = self.expand_zip(disk_path, &archive_path, collection, seen) {
                warn!("Could not open archive {}: {:#}", disk_path.display(), e);
                collection
                    .errors
                    .push(FileError::new(archive_path, format!("{:#}", e)));
            }
        }
    }

    /// Add the entries of a zip archive as if the archive were a folder
    fn expand_zip(
        &self,
        disk_path: &Path,
        archive_path: &str,
        collection: &mut Collection,
        seen: &mut HashSet<String>,
    ) -> Result<()> {
        let file = File::open(disk_path)
            .with_context(|| format!("Failed to open archive: {}", disk_path.display()))?;
        let mut archive = zip::ZipArchive::new(file).context("Invalid zip archive")?;

        let mut added = 0;
        for i in 0..archive.len() {
            let entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    collection
                        .errors
                        .push(FileError::new(archive_path, format!("Zip entry {}: {}", i, e)));
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            let Some(inner) = entry.enclosed_name() else {
                collection.errors.push(FileError::new(
                    archive_path,
                    format!("Unsafe entry name in archive: {}", entry.name()),
                ));
                continue;
            };
            let inner = join_components(&inner);
            if inner.is_empty() || inner.split('/').any(is_hidden_str) {
                continue;
            }

            let session_path = format!("{}/{}", archive_path, inner);
            if !seen.insert(session_path.clone()) {
                collection
                    .errors
                    .push(FileError::new(session_path, "Duplicate archive entry; skipped"));
                continue;
            }

            let discovered = DiscoveredFile::new(session_path, entry.size(), FileKind::Other);
            let kind = self.classify(&discovered.name);
            collection.files.push(CollectedFile {
                file: DiscoveredFile { kind, ..discovered },
                origin: Origin::ZipEntry {
                    archive: disk_path.to_path_buf(),
                    entry: entry.name().to_string(),
                },
            });
            added += 1;
        }

        debug!("Expanded {} entries from {}", added, archive_path);
        Ok(())
    }
}

/// Name a dropped root contributes to session paths
fn root_name(root: &Path) -> Result<String> {
    if let Some(name) = root.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }
    let canonical = root
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", root.display()))?;
    Ok(canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string()))
}

/// `/`-joined normal components of a relative path
fn join_components(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    is_hidden_str(&name.to_string_lossy())
}

fn is_hidden_str(name: &str) -> bool {
    name.starts_with('.') || name == "__MACOSX"
}
