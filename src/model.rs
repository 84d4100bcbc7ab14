use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a dropped file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Video,
    Subtitle,
    Archive,
    Other,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileKind::Video => "video",
            FileKind::Subtitle => "subtitle",
            FileKind::Archive => "archive",
            FileKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// A file found in one upload batch.
///
/// `full_path` is `/`-separated and unique within the batch; `name` is its
/// last component. The optional fields are filled in by a metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub full_path: String,
    pub name: String,
    pub size: u64,
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_guess: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_guess: Option<String>,
}

impl DiscoveredFile {
    /// Build an un-enriched file; `name` is taken from the last path component
    pub fn new(full_path: impl Into<String>, size: u64, kind: FileKind) -> Self {
        let full_path = full_path.into();
        let name = full_path
            .rsplit('/')
            .next()
            .unwrap_or(full_path.as_str())
            .to_string();
        Self {
            full_path,
            name,
            size,
            kind,
            content_hash: None,
            language_guess: None,
            movie_guess: None,
        }
    }

    /// Parent directory of `full_path`, empty for top-level files
    pub fn directory(&self) -> &str {
        self.full_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }

    pub fn with_movie_guess(mut self, guess: impl Into<String>) -> Self {
        self.movie_guess = Some(guess.into());
        self
    }

    pub fn with_language_guess(mut self, language: impl Into<String>) -> Self {
        self.language_guess = Some(language.into());
        self
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}

/// A video together with the subtitles assigned to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub video: DiscoveredFile,
    pub subtitles: Vec<DiscoveredFile>,
}

/// Why a subtitle ended up where it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchReason {
    /// Stems are identical apart from extension and language tags
    ExactName,
    /// Normalized names scored at or above the threshold
    SimilarName,
    /// Best candidate scored under the threshold
    BelowThreshold,
    /// No video in the same or a nearby directory
    NoCandidate,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchReason::ExactName => "exact name match",
            MatchReason::SimilarName => "similar name",
            MatchReason::BelowThreshold => "best candidate below threshold",
            MatchReason::NoCandidate => "no video nearby",
        };
        f.write_str(label)
    }
}

/// The rule that settled a choice between near-equal candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    Score,
    ExactName,
    MovieGuess,
    Proximity,
    FileSize,
    PathOrder,
}

/// Two candidate videos scored within epsilon of each other
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbiguousMatch {
    pub runner_up: String,
    pub runner_up_score: f64,
    pub resolved_by: TieBreak,
}

/// Diagnostic record for one subtitle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchDecision {
    pub subtitle: DiscoveredFile,
    pub candidate_video: Option<DiscoveredFile>,
    pub score: f64,
    pub reason: MatchReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiguity: Option<AmbiguousMatch>,
}

impl MatchDecision {
    /// True when the subtitle was attached to `candidate_video`
    pub fn is_matched(&self) -> bool {
        matches!(self.reason, MatchReason::ExactName | MatchReason::SimilarName)
    }

    pub fn is_ambiguous(&self) -> bool {
        self.ambiguity.is_some()
    }
}

/// Output of one pairing run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PairingResult {
    pub pairs: Vec<MatchedPair>,
    pub orphans: Vec<DiscoveredFile>,
    pub decisions: Vec<MatchDecision>,
    /// Inputs in their original order, kept for re-scoring
    #[serde(skip)]
    pub(crate) inputs: Vec<DiscoveredFile>,
}

impl PairingResult {
    pub fn inputs(&self) -> &[DiscoveredFile] {
        &self.inputs
    }

    pub fn matched_subtitle_count(&self) -> usize {
        self.pairs.iter().map(|p| p.subtitles.len()).sum()
    }

    /// Pair holding the given video path
    pub fn pair_for(&self, video_path: &str) -> Option<&MatchedPair> {
        self.pairs.iter().find(|p| p.video.full_path == video_path)
    }

    /// Decision recorded for the given subtitle path
    pub fn decision_for(&self, subtitle_path: &str) -> Option<&MatchDecision> {
        self.decisions
            .iter()
            .find(|d| d.subtitle.full_path == subtitle_path)
    }
}

/// A per-file problem from collection or enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: String,
    pub message: String,
}

impl FileError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
