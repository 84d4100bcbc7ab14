//! Name similarity between a video and a subtitle.

use crate::normalize::NameKey;

/// Score for stems that differ only in extension and language tags
pub const EXACT_SCORE: f64 = 1.0;
/// Score for names whose significant tokens are identical
pub const NORMALIZED_SCORE: f64 = 0.95;
/// Floor for a name whose tokens all appear, in order, in the other name
pub const CONTAINMENT_BASE: f64 = 0.7;
/// Multiplier when both names carry different episode markers
pub const EPISODE_CONFLICT_PENALTY: f64 = 0.25;
/// Multiplier when both names carry different release years
pub const YEAR_CONFLICT_PENALTY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub score: f64,
    pub exact: bool,
}

/// Compare a video key with a subtitle key. The result is in `[0, 1]`.
pub fn compare(video: &NameKey, subtitle: &NameKey) -> Similarity {
    if video.stem == subtitle.stem {
        return Similarity {
            score: EXACT_SCORE,
            exact: true,
        };
    }

    let mut score = if video.tokens == subtitle.tokens {
        NORMALIZED_SCORE
    } else {
        token_similarity(&video.tokens, &subtitle.tokens)
            .max(containment_similarity(&video.tokens, &subtitle.tokens))
    };

    if let (Some(a), Some(b)) = (video.episode, subtitle.episode) {
        if a != b {
            score *= EPISODE_CONFLICT_PENALTY;
        }
    }
    if let (Some(a), Some(b)) = (video.year, subtitle.year) {
        if a != b {
            score *= YEAR_CONFLICT_PENALTY;
        }
    }

    Similarity {
        score: score.clamp(0.0, 1.0),
        exact: false,
    }
}

/// Longest common token prefix, then edit distance over what remains.
///
/// The shared prefix counts fully; the tails count in proportion to how
/// close they are.
pub fn token_similarity(a: &[String], b: &[String]) -> f64 {
    let joined_a = a.join(" ");
    let joined_b = b.join(" ");
    let total = joined_a.chars().count().max(joined_b.chars().count());
    if total == 0 {
        return 1.0;
    }

    let shared = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let prefix_chars = a[..shared].join(" ").chars().count();

    let tail_a = a[shared..].join(" ");
    let tail_b = b[shared..].join(" ");
    let tail_len = tail_a.chars().count().max(tail_b.chars().count());
    let tail_similarity = if tail_len == 0 {
        1.0
    } else {
        1.0 - levenshtein(&tail_a, &tail_b) as f64 / tail_len as f64
    };

    let remaining = total.saturating_sub(prefix_chars) as f64;
    (prefix_chars as f64 + tail_similarity * remaining) / total as f64
}

/// Score for one token list appearing in order inside the other.
///
/// Covers subtitles named after the title alone, such as `Movie.srt`
/// next to `Movie.2020.mkv`. Zero when neither contains the other.
pub fn containment_similarity(a: &[String], b: &[String]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() || !is_subsequence(short, long) {
        return 0.0;
    }
    let short_chars: usize = short.iter().map(|t| t.chars().count()).sum();
    let long_chars: usize = long.iter().map(|t| t.chars().count()).sum();
    CONTAINMENT_BASE + (1.0 - CONTAINMENT_BASE) * short_chars as f64 / long_chars.max(1) as f64
}

fn is_subsequence(short: &[String], long: &[String]) -> bool {
    let mut rest = long.iter();
    short.iter().all(|token| rest.any(|t| t == token))
}

/// Character edit distance
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
