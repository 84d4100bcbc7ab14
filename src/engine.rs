//! Video/subtitle pairing.
//!
//! Pure and synchronous: takes the files of one batch and returns pairs,
//! orphans and one decision per subtitle. Callers own logging and I/O.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::error::ValidationError;
use crate::model::{
    AmbiguousMatch, DiscoveredFile, FileKind, MatchDecision, MatchReason, MatchedPair,
    PairingResult, TieBreak,
};
use crate::normalize::NameKey;
use crate::similarity;

/// Tuning knobs for the pairing heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingOptions {
    /// Candidates scoring below this are never assigned
    pub min_similarity: f64,
    /// Runner-up within this distance of the winner marks the match ambiguous
    pub ambiguity_epsilon: f64,
    /// How many directory levels up the search may widen when a
    /// subtitle's own directory has no video
    pub fallback_depth: usize,
}

impl Default for PairingOptions {
    fn default() -> Self {
        PairingOptions {
            min_similarity: 0.6,
            ambiguity_epsilon: 0.02,
            fallback_depth: 1,
        }
    }
}

impl PairingOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.min_similarity.is_finite() || !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(ValidationError::InvalidOption(format!(
                "min_similarity must be within 0..=1, got {}",
                self.min_similarity
            )));
        }
        if !self.ambiguity_epsilon.is_finite() || self.ambiguity_epsilon < 0.0 {
            return Err(ValidationError::InvalidOption(format!(
                "ambiguity_epsilon must be non-negative, got {}",
                self.ambiguity_epsilon
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PairingEngine {
    options: PairingOptions,
}

/// A video or subtitle with its precomputed comparison data
struct Entry<'a> {
    file: &'a DiscoveredFile,
    dir: Vec<&'a str>,
    key: NameKey,
    /// No file of the other kind shares this directory
    alone: bool,
}

/// One scored (subtitle, video) option
#[derive(Debug, Clone)]
struct Candidate<'a> {
    subtitle: usize,
    video: usize,
    score: f64,
    exact: bool,
    guess_match: bool,
    distance: usize,
    size: u64,
    path: &'a str,
}

impl PairingEngine {
    pub fn new(options: PairingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PairingOptions {
        &self.options
    }

    /// Pair the videos and subtitles of one batch.
    ///
    /// Every subtitle lands in exactly one pair or in `orphans`; every video
    /// gets a pair, possibly with no subtitles. Archives and other files are
    /// ignored. The outcome for a given subtitle does not depend on the
    /// order of `files`.
    pub fn pair(&self, files: &[DiscoveredFile]) -> Result<PairingResult, ValidationError> {
        self.options.validate()?;
        validate_files(files)?;

        let archives: HashSet<&str> = files
            .iter()
            .filter(|f| f.kind == FileKind::Archive)
            .map(|f| f.full_path.as_str())
            .collect();

        let mut videos: Vec<Entry> = files
            .iter()
            .filter(|f| f.kind == FileKind::Video)
            .map(|f| Entry {
                file: f,
                dir: dir_components(f, &archives),
                key: NameKey::for_video(&f.name),
                alone: false,
            })
            .collect();
        let mut subtitles: Vec<Entry> = files
            .iter()
            .filter(|f| f.kind == FileKind::Subtitle)
            .map(|f| Entry {
                file: f,
                dir: dir_components(f, &archives),
                key: NameKey::for_subtitle(&f.name),
                alone: false,
            })
            .collect();
        for video in videos.iter_mut() {
            video.alone = !subtitles.iter().any(|s| s.dir == video.dir);
        }
        for subtitle in subtitles.iter_mut() {
            subtitle.alone = !videos.iter().any(|v| v.dir == subtitle.dir);
        }

        let ranked: Vec<Vec<Candidate>> = subtitles
            .iter()
            .enumerate()
            .map(|(index, subtitle)| {
                let mut candidates = self.candidates(index, subtitle, &videos);
                candidates.sort_by(rank);
                candidates
            })
            .collect();

        let assignment = self.assign(&ranked, subtitles.len());

        let pairs = videos
            .iter()
            .enumerate()
            .map(|(video_index, video)| MatchedPair {
                video: video.file.clone(),
                subtitles: subtitles
                    .iter()
                    .enumerate()
                    .filter(|(sub_index, _)| assignment[*sub_index] == Some(video_index))
                    .map(|(_, sub)| sub.file.clone())
                    .collect(),
            })
            .collect();

        let orphans = subtitles
            .iter()
            .enumerate()
            .filter(|(index, _)| assignment[*index].is_none())
            .map(|(_, sub)| sub.file.clone())
            .collect();

        let decisions = subtitles
            .iter()
            .zip(ranked.iter())
            .zip(assignment.iter())
            .map(|((subtitle, candidates), assigned)| {
                self.decide(subtitle, candidates, assigned.is_some(), &videos)
            })
            .collect();

        Ok(PairingResult {
            pairs,
            orphans,
            decisions,
            inputs: files.to_vec(),
        })
    }

    /// Re-score an earlier result after some of its files were enriched.
    ///
    /// Each updated file replaces the input with the same `full_path`; the
    /// batch is then paired again in its original order, so the result is
    /// the same as calling [`PairingEngine::pair`] on the updated batch.
    pub fn repair(
        &self,
        existing: &PairingResult,
        updated_files: &[DiscoveredFile],
    ) -> Result<PairingResult, ValidationError> {
        let positions: HashMap<&str, usize> = existing
            .inputs
            .iter()
            .enumerate()
            .map(|(index, file)| (file.full_path.as_str(), index))
            .collect();

        let mut files = existing.inputs.clone();
        let mut replaced = HashSet::new();
        for file in updated_files {
            let index = *positions
                .get(file.full_path.as_str())
                .ok_or_else(|| ValidationError::UnknownFile(file.full_path.clone()))?;
            if !replaced.insert(index) {
                return Err(ValidationError::DuplicatePath(file.full_path.clone()));
            }
            files[index] = file.clone();
        }

        self.pair(&files)
    }

    /// Videos a subtitle may be paired with.
    ///
    /// Co-located videos always qualify. A pair in different directories
    /// qualifies when either side has no file of the other kind next to it
    /// and the two are within `fallback_depth` (parents, children, siblings).
    /// Closer candidates only win ties; a better name further away still wins.
    fn candidates<'a>(
        &self,
        index: usize,
        subtitle: &Entry,
        videos: &[Entry<'a>],
    ) -> Vec<Candidate<'a>> {
        videos
            .iter()
            .enumerate()
            .filter_map(|(video_index, video)| {
                let distance = if video.dir == subtitle.dir {
                    0
                } else if subtitle.alone || video.alone {
                    directory_distance(&subtitle.dir, &video.dir, self.options.fallback_depth)?
                } else {
                    return None;
                };
                let similarity = similarity::compare(&video.key, &subtitle.key);
                Some(Candidate {
                    subtitle: index,
                    video: video_index,
                    score: quantize(similarity.score),
                    exact: similarity.exact,
                    guess_match: guesses_agree(subtitle.file, video.file),
                    distance,
                    size: video.file.size,
                    path: video.file.full_path.as_str(),
                })
            })
            .collect()
    }

    /// Greedy assignment: best candidates first, each subtitle taken once.
    /// Videos have no capacity limit.
    fn assign(&self, ranked: &[Vec<Candidate>], subtitle_count: usize) -> Vec<Option<usize>> {
        let mut all: Vec<&Candidate> = ranked.iter().flatten().collect();
        all.sort_by(|a, b| rank(a, b).then(a.subtitle.cmp(&b.subtitle)));

        let mut assignment = vec![None; subtitle_count];
        for candidate in all {
            if assignment[candidate.subtitle].is_some() {
                continue;
            }
            if candidate.score < self.options.min_similarity {
                continue;
            }
            assignment[candidate.subtitle] = Some(candidate.video);
        }
        assignment
    }

    fn decide(
        &self,
        subtitle: &Entry,
        candidates: &[Candidate],
        assigned: bool,
        videos: &[Entry],
    ) -> MatchDecision {
        let Some(best) = candidates.first() else {
            return MatchDecision {
                subtitle: subtitle.file.clone(),
                candidate_video: None,
                score: 0.0,
                reason: MatchReason::NoCandidate,
                ambiguity: None,
            };
        };

        let reason = match (assigned, best.exact) {
            (true, true) => MatchReason::ExactName,
            (true, false) => MatchReason::SimilarName,
            (false, _) => MatchReason::BelowThreshold,
        };

        let ambiguity = candidates.get(1).and_then(|runner_up| {
            let close = best.score - runner_up.score <= self.options.ambiguity_epsilon;
            let settled_by_name = best.exact && !runner_up.exact;
            (close && !settled_by_name).then(|| AmbiguousMatch {
                runner_up: runner_up.path.to_string(),
                runner_up_score: runner_up.score,
                resolved_by: tie_break(best, runner_up),
            })
        });

        MatchDecision {
            subtitle: subtitle.file.clone(),
            candidate_video: Some(videos[best.video].file.clone()),
            score: best.score,
            reason,
            ambiguity,
        }
    }
}

/// Pair with default options
pub fn pair(files: &[DiscoveredFile]) -> Result<PairingResult, ValidationError> {
    PairingEngine::default().pair(files)
}

/// Ordering of candidates for one subtitle, best first
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(b.exact.cmp(&a.exact))
        .then(b.guess_match.cmp(&a.guess_match))
        .then(a.distance.cmp(&b.distance))
        .then(b.size.cmp(&a.size))
        .then(a.path.cmp(b.path))
}

/// First rule in `rank` that separates two candidates
fn tie_break(best: &Candidate, runner_up: &Candidate) -> TieBreak {
    if best.score != runner_up.score {
        TieBreak::Score
    } else if best.exact != runner_up.exact {
        TieBreak::ExactName
    } else if best.guess_match != runner_up.guess_match {
        TieBreak::MovieGuess
    } else if best.distance != runner_up.distance {
        TieBreak::Proximity
    } else if best.size != runner_up.size {
        TieBreak::FileSize
    } else {
        TieBreak::PathOrder
    }
}

fn guesses_agree(subtitle: &DiscoveredFile, video: &DiscoveredFile) -> bool {
    match (&subtitle.movie_guess, &video.movie_guess) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Round to six decimals so that float noise never decides a tie
fn quantize(score: f64) -> f64 {
    (score * 1_000_000.0).round() / 1_000_000.0
}

/// Directory of a file as path components. An archive listed as a folder
/// does not count as a level of its own, so `A/pack.zip/Subs` is `A/Subs`.
fn dir_components<'a>(file: &'a DiscoveredFile, archives: &HashSet<&str>) -> Vec<&'a str> {
    let directory = file.directory();
    let mut components = Vec::new();
    let mut offset = 0;
    for component in directory.split('/') {
        let prefix = &directory[..offset + component.len()];
        offset += component.len() + 1;
        if component.is_empty()
            || archives.contains(prefix)
            || component.to_ascii_lowercase().ends_with(".zip")
        {
            continue;
        }
        components.push(component);
    }
    components
}

/// Steps between two directories through their common ancestor, if
/// neither side is more than `max_depth` levels below it.
fn directory_distance(a: &[&str], b: &[&str], max_depth: usize) -> Option<usize> {
    let common = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let up_a = a.len() - common;
    let up_b = b.len() - common;
    (up_a <= max_depth && up_b <= max_depth).then_some(up_a + up_b)
}

fn validate_files(files: &[DiscoveredFile]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        validate_path(file)?;
        // `/A/x.mkv` and `A/x.mkv` name the same file
        let path = file.full_path.as_str();
        if !seen.insert(path.strip_prefix('/').unwrap_or(path)) {
            return Err(ValidationError::DuplicatePath(file.full_path.clone()));
        }
    }
    Ok(())
}

fn validate_path(file: &DiscoveredFile) -> Result<(), ValidationError> {
    let path = file.full_path.as_str();
    if path.is_empty() {
        return Err(ValidationError::malformed(path, "empty path"));
    }
    if path.contains('\\') {
        return Err(ValidationError::malformed(path, "backslash separator"));
    }
    if path.contains('\0') {
        return Err(ValidationError::malformed(path, "NUL byte"));
    }

    let relative = path.strip_prefix('/').unwrap_or(path);
    for component in relative.split('/') {
        match component {
            "" => return Err(ValidationError::malformed(path, "empty path component")),
            "." | ".." => return Err(ValidationError::malformed(path, "relative path component")),
            _ => {}
        }
    }

    if relative.rsplit('/').next() != Some(file.name.as_str()) {
        return Err(ValidationError::NameMismatch {
            path: path.to_string(),
            name: file.name.clone(),
        });
    }
    Ok(())
}
