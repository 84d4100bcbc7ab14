//! Subtitle language tags as they appear in release filenames.

/// (ISO 639-1 code, spellings seen in filenames)
const LANGUAGES: &[(&str, &[&str])] = &[
    ("en", &["en", "eng", "english"]),
    ("fr", &["fr", "fre", "fra", "french", "francais"]),
    ("es", &["es", "spa", "spanish", "espanol", "esp"]),
    ("de", &["de", "ger", "deu", "german", "deutsch"]),
    ("it", &["it", "ita", "italian", "italiano"]),
    ("pt", &["pt", "por", "portuguese", "pb", "pob", "ptbr", "brazilian"]),
    ("nl", &["nl", "dut", "nld", "dutch"]),
    ("ru", &["ru", "rus", "russian"]),
    ("pl", &["pl", "pol", "polish"]),
    ("sv", &["sv", "swe", "swedish"]),
    ("no", &["no", "nor", "nob", "norwegian"]),
    ("da", &["da", "dan", "danish"]),
    ("fi", &["fi", "fin", "finnish"]),
    ("cs", &["cs", "cze", "ces", "czech"]),
    ("sk", &["sk", "slo", "slk", "slovak"]),
    ("sl", &["sl", "slv", "slovenian"]),
    ("hu", &["hu", "hun", "hungarian"]),
    ("ro", &["ro", "rum", "ron", "romanian"]),
    ("el", &["el", "gre", "ell", "greek"]),
    ("tr", &["tr", "tur", "turkish"]),
    ("ar", &["ar", "ara", "arabic"]),
    ("he", &["he", "heb", "hebrew"]),
    ("fa", &["fa", "per", "fas", "persian", "farsi"]),
    ("ja", &["ja", "jpn", "japanese"]),
    ("ko", &["ko", "kor", "korean"]),
    ("zh", &["zh", "chi", "zho", "chinese", "chs", "cht"]),
    ("hr", &["hr", "hrv", "croatian"]),
    ("sr", &["sr", "srp", "serbian"]),
    ("bg", &["bg", "bul", "bulgarian"]),
    ("uk", &["uk", "ukr", "ukrainian"]),
    ("vi", &["vi", "vie", "vietnamese"]),
    ("th", &["th", "tha", "thai"]),
    ("id", &["id", "ind", "indonesian"]),
    ("ms", &["ms", "may", "msa", "malay"]),
    ("hi", &["hin", "hindi"]),
    ("et", &["et", "est", "estonian"]),
    ("lv", &["lv", "lav", "latvian"]),
    ("lt", &["lt", "lit", "lithuanian"]),
    ("is", &["is", "ice", "isl", "icelandic"]),
    ("ca", &["ca", "cat", "catalan"]),
    ("eu", &["eu", "baq", "eus", "basque"]),
];

/// Tags that describe a subtitle variant rather than its language.
/// `hi` here means hearing impaired, which is why Hindi is only matched by longer spellings.
const FLAGS: &[&str] = &["forced", "sdh", "hi", "cc", "default", "full", "signs"];

/// ISO 639-1 code for a filename token, if it names a language
pub fn lookup(token: &str) -> Option<&'static str> {
    let token = token.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(_, spellings)| spellings.contains(&token.as_str()))
        .map(|(code, _)| *code)
}

/// True for variant tags such as `forced` or `sdh`
pub fn is_flag(token: &str) -> bool {
    let token = token.to_ascii_lowercase();
    FLAGS.contains(&token.as_str())
}

/// Split trailing language and variant tags off a subtitle stem.
///
/// Returns the remaining stem and the language of the left-most tag removed.
/// A stem is never reduced to nothing, so `It.srt` keeps its title.
pub fn strip_tags(stem: &str) -> (&str, Option<&'static str>) {
    let mut rest = stem;
    let mut language = None;

    while let Some(pos) = rest.rfind(is_separator) {
        let tag = &rest[pos + 1..];
        let head = &rest[..pos];
        if head.trim_matches(|c: char| !c.is_alphanumeric()).is_empty() {
            break;
        }
        if let Some(code) = lookup(tag) {
            language = Some(code);
        } else if !is_flag(tag) && !is_region(rest, pos) {
            break;
        }
        rest = head;
    }

    (rest, language)
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-' | ' ')
}

/// Two-letter region after a hyphenated language, as in `pt-BR`
fn is_region(stem: &str, pos: usize) -> bool {
    let tag = &stem[pos + 1..];
    let head = &stem[..pos];
    stem[pos..].starts_with('-')
        && tag.len() == 2
        && tag.chars().all(|c| c.is_ascii_alphabetic())
        && head
            .rsplit(is_separator)
            .next()
            .and_then(lookup)
            .is_some()
}
