//! Optional enrichment of collected files: content hashes, language and
//! movie guesses. Runs off the pairing path and feeds back through
//! `PairingEngine::repair`.

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use std::any::Any;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::collector::{CollectedFile, Origin};
use crate::config::MetadataConfig;
use crate::model::{DiscoveredFile, FileError, FileKind};
use crate::normalize::{self, NameKey};

/// Bytes hashed at each end of a video
const MOVIE_HASH_CHUNK: u64 = 64 * 1024;

/// What a metadata service learned about one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub content_hash: Option<String>,
    pub language_guess: Option<String>,
    pub movie_guess: Option<String>,
}

impl Enrichment {
    /// Copy known values onto a file, keeping what it already had otherwise
    pub fn apply(self, file: DiscoveredFile) -> DiscoveredFile {
        DiscoveredFile {
            content_hash: self.content_hash.or(file.content_hash),
            language_guess: self.language_guess.or(file.language_guess),
            movie_guess: self.movie_guess.or(file.movie_guess),
            ..file
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content_hash.is_none() && self.language_guess.is_none() && self.movie_guess.is_none()
    }
}

/// Source of per-file metadata. Implementations may block.
pub trait MetadataService: Send + Sync {
    fn enrich(&self, file: &CollectedFile) -> Result<Enrichment>;
}

/// Metadata from the file itself and its name, without network access
pub struct LocalMetadataService {
    config: MetadataConfig,
}

impl LocalMetadataService {
    pub fn new(config: MetadataConfig) -> Self {
        Self { config }
    }

    fn content_hash(&self, collected: &CollectedFile) -> Result<Option<String>> {
        let file = &collected.file;
        match (&collected.origin, file.kind) {
            (Origin::Disk { path }, FileKind::Video) => {
                let mut reader = File::open(path)
                    .with_context(|| format!("Failed to open file: {}", path.display()))?;
                movie_hash(&mut reader, file.size)
            }
            (Origin::Disk { path }, FileKind::Subtitle) => {
                let reader = File::open(path)
                    .with_context(|| format!("Failed to open file: {}", path.display()))?;
                sha256_hex(BufReader::new(reader)).map(Some)
            }
            (Origin::ZipEntry { archive, entry }, FileKind::Subtitle) => {
                let reader = File::open(archive)
                    .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
                let mut zip_archive =
                    zip::ZipArchive::new(reader).context("Invalid zip archive")?;
                let entry = zip_archive
                    .by_name(entry)
                    .with_context(|| format!("Missing archive entry: {}", entry))?;
                sha256_hex(entry).map(Some)
            }
            // Compressed entries cannot be seeked, so videos inside archives go unhashed
            _ => Ok(None),
        }
    }
}

impl MetadataService for LocalMetadataService {
    fn enrich(&self, collected: &CollectedFile) -> Result<Enrichment> {
        let file = &collected.file;
        let key = match file.kind {
            FileKind::Video => NameKey::for_video(&file.name),
            FileKind::Subtitle => NameKey::for_subtitle(&file.name),
            _ => return Ok(Enrichment::default()),
        };

        let content_hash = if self.config.compute_hashes {
            self.content_hash(collected)?
        } else {
            None
        };
        let language_guess = if self.config.guess_language && file.kind == FileKind::Subtitle {
            key.language.map(str::to_string)
        } else {
            None
        };
        let movie_guess = if self.config.guess_movie {
            guess_movie(&key)
        } else {
            None
        };

        debug!(
            "Enriched {}: hash={:?} language={:?} movie={:?}",
            file.full_path, content_hash, language_guess, movie_guess
        );

        Ok(Enrichment {
            content_hash,
            language_guess,
            movie_guess,
        })
    }
}

/// OpenSubtitles-style movie hash: file size plus the wrapping sum of the
/// little-endian 64-bit words in the first and last 64 KiB.
///
/// Files shorter than two chunks have no hash.
pub fn movie_hash<R: Read + Seek>(reader: &mut R, size: u64) -> Result<Option<String>> {
    if size < MOVIE_HASH_CHUNK * 2 {
        return Ok(None);
    }

    let mut buffer = vec![0u8; MOVIE_HASH_CHUNK as usize];
    let mut hash = size;

    reader.seek(SeekFrom::Start(0))?;
    reader.read_exact(&mut buffer).context("Failed to read head of file")?;
    hash = hash.wrapping_add(sum_words(&buffer));

    reader.seek(SeekFrom::Start(size - MOVIE_HASH_CHUNK))?;
    reader.read_exact(&mut buffer).context("Failed to read tail of file")?;
    hash = hash.wrapping_add(sum_words(&buffer));

    Ok(Some(format!("{:016x}", hash)))
}

fn sum_words(buffer: &[u8]) -> u64 {
    buffer.chunks_exact(8).fold(0u64, |acc, chunk| {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        acc.wrapping_add(u64::from_le_bytes(word))
    })
}

/// SHA-256 of everything the reader yields, hex encoded
pub fn sha256_hex<R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192]; // 8KB buffer

    loop {
        let bytes_read = reader.read(&mut buffer).context("Failed to read file")?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Opaque movie/episode identity from release naming, e.g. `movie:2020`
/// or `show:s01e02`
pub fn guess_movie(key: &NameKey) -> Option<String> {
    let year = key.year.map(|y| y.to_string());
    let title: Vec<&str> = key
        .tokens
        .iter()
        .map(String::as_str)
        .take_while(|t| Some(*t) != year.as_deref() && normalize::episode_marker(t).is_none())
        .collect();
    if title.is_empty() {
        return None;
    }

    let title = title.join(" ");
    Some(match (key.episode, key.year) {
        (Some((season, episode)), _) => format!("{}:s{:02}e{:02}", title, season, episode),
        (None, Some(year)) => format!("{}:{}", title, year),
        (None, None) => title,
    })
}

/// Enrich all videos and subtitles concurrently on the blocking pool.
///
/// Returns the enriched files in input order, and the files that failed.
/// A service that panics fails only the file it was working on.
pub async fn enrich_all(
    service: Arc<dyn MetadataService>,
    files: &[CollectedFile],
) -> (Vec<DiscoveredFile>, Vec<FileError>) {
    let mut tasks = JoinSet::new();
    let mut pending = HashSet::new();
    for (index, collected) in files.iter().enumerate() {
        if !matches!(collected.file.kind, FileKind::Video | FileKind::Subtitle) {
            continue;
        }
        let service = Arc::clone(&service);
        let collected = collected.clone();
        pending.insert(index);
        tasks.spawn_blocking(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| service.enrich(&collected)))
                .unwrap_or_else(|payload| {
                    Err(anyhow!(
                        "Metadata service panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                });
            (index, collected.file, result)
        });
    }

    let mut enriched = Vec::new();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, file, Ok(enrichment))) => {
                pending.remove(&index);
                if !enrichment.is_empty() {
                    enriched.push((index, enrichment.apply(file)));
                }
            }
            Ok((index, file, Err(e))) => {
                pending.remove(&index);
                warn!("Metadata failed for {}: {:#}", file.full_path, e);
                errors.push(FileError::new(file.full_path, format!("{:#}", e)));
            }
            Err(e) => {
                warn!("Metadata task failed: {}", e);
            }
        }
    }

    // Tasks that never reported back, e.g. cancelled at shutdown
    for index in pending {
        let path = &files[index].file.full_path;
        errors.push(FileError::new(path.clone(), "Metadata lookup did not finish"));
    }

    enriched.sort_by_key(|(index, _)| *index);
    errors.sort_by(|a, b| a.path.cmp(&b.path));
    info!("Enriched {} files, {} failures", enriched.len(), errors.len());

    (enriched.into_iter().map(|(_, file)| file).collect(), errors)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown cause".to_string()
    }
}
