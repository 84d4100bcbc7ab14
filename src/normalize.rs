//! Reduce release filenames to comparable keys.

use regex::Regex;
use std::sync::OnceLock;

use crate::language;

/// Comparable form of a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameKey {
    /// Lowercased stem without extension or subtitle language tags
    pub stem: String,
    /// Lowercased tokens with release-tag noise removed
    pub tokens: Vec<String>,
    /// (season, episode) when the name carries an episode marker
    pub episode: Option<(u32, u32)>,
    pub year: Option<u16>,
    pub language: Option<&'static str>,
}

impl NameKey {
    /// Key for a video file name
    pub fn for_video(name: &str) -> Self {
        Self::build(strip_extension(name), None)
    }

    /// Key for a subtitle file name; trailing language and variant tags are dropped
    pub fn for_subtitle(name: &str) -> Self {
        let (stem, language) = language::strip_tags(strip_extension(name));
        Self::build(stem, language)
    }

    fn build(stem: &str, language: Option<&'static str>) -> Self {
        NameKey {
            stem: stem.to_lowercase(),
            tokens: significant_tokens(stem),
            episode: episode_marker(stem),
            year: release_year(stem),
            language,
        }
    }

}

/// File name without its last extension
pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn episode_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|[^a-z0-9])(?:s(\d{1,2})[ ._-]?e(\d{1,3})|(\d{1,2})x(\d{2,3}))(?:[^0-9]|$)")
            .expect("episode pattern is valid")
    })
}

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9])((?:19|20)\d{2})(?:[^0-9]|$)").expect("year pattern is valid")
    })
}

fn leading_group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[[^\]]*\]\s*").expect("group pattern is valid"))
}

fn channel_layout_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:dd|ddp|dd\+|dts|aac|ac3|eac3|truehd|atmos)?[ .]?[2567]\.[01](?:[^0-9]|$)")
            .expect("channel pattern is valid")
    })
}

/// Season and episode numbers from markers like `S01E02`, `s1.e2` or `1x02`
pub fn episode_marker(stem: &str) -> Option<(u32, u32)> {
    let caps = episode_regex().captures(stem)?;
    let season = caps.get(1).or_else(|| caps.get(3))?.as_str().parse().ok()?;
    let episode = caps.get(2).or_else(|| caps.get(4))?.as_str().parse().ok()?;
    Some((season, episode))
}

/// First plausible release year in the name
pub fn release_year(stem: &str) -> Option<u16> {
    year_regex()
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// True for tokens that describe the encode rather than the content
pub fn is_noise_token(token: &str) -> bool {
    const WORDS: &[&str] = &[
        "4k", "8k", "uhd", "fhd", "hd", "sd", "hdr", "hdr10", "dv", "sdr", "bluray", "blu", "ray",
        "bdrip", "brrip", "bdremux", "remux", "web", "webrip", "webdl", "dl", "hdtv", "pdtv",
        "dvdrip", "dvd", "dvdscr", "hdrip", "hdcam", "cam", "ts", "x264", "x265", "h264", "h265",
        "hevc", "avc", "xvid", "divx", "vp9", "av1", "aac", "ac3", "eac3", "dts", "dtshd", "dd",
        "ddp", "truehd", "atmos", "flac", "mp3", "opus", "proper", "repack", "internal",
        "limited", "extended", "unrated", "remastered", "amzn", "nf", "dsnp", "hmax", "atvp",
        "hulu", "multi", "dubbed", "subbed",
    ];

    let token = token.to_ascii_lowercase();
    if WORDS.contains(&token.as_str()) {
        return true;
    }
    let digits = token.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let suffix = &token[digits.len()..];
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        // 1080p, 720i, 10bit
        if (suffix == "p" || suffix == "i") && (3..=4).contains(&digits.len()) {
            return true;
        }
        if suffix == "bit" {
            return true;
        }
    }
    false
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Drop a trailing `-GROUP` when it follows encode noise, as in `x264-GROUP`
fn strip_release_group(stem: &str) -> &str {
    if let Some((head, group)) = stem.rsplit_once('-') {
        let group_like = !group.is_empty() && group.chars().all(|c| c.is_ascii_alphanumeric());
        let after_noise = tokenize(head).last().map(|t| is_noise_token(t)).unwrap_or(false);
        if group_like && after_noise {
            return head;
        }
    }
    stem
}

/// Lowercased tokens of a stem with release-tag noise removed.
///
/// Falls back to the raw tokens when the whole name is noise.
pub fn significant_tokens(stem: &str) -> Vec<String> {
    let without_group = leading_group_regex().replace(stem, "");
    let without_group = strip_release_group(&without_group);
    let without_channels = channel_layout_regex().replace_all(without_group, " ");

    let tokens: Vec<String> = tokenize(&without_channels)
        .into_iter()
        .filter(|t| !is_noise_token(t))
        .collect();

    if tokens.is_empty() {
        tokenize(stem)
    } else {
        tokens
    }
}
