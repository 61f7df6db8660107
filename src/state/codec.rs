/// File name codec
///
/// All metadata lives in the file name, in this fixed order:
///
/// `name[tag, tag]{actor, actor}(series)~release@rating%feature.ext`
///
/// Every group is optional. Decoding never fails: a name that does not
/// fit the grammar simply becomes the title with default metadata.
use regex::Regex;
use std::fmt::Write;
use std::path::Path;
use std::sync::LazyLock;

use super::data::{dedup_preserving, Metadata, Rating, ReleaseDate};

/// Characters that carry meaning in the grammar
pub const RESERVED: &[char] = &['[', ']', '{', '}', '(', ')', '~', '@', '%', ','];

/// Lazy title prefix, then each group in order with surrounding whitespace trimmed
static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(.*?)(?:\[\s*(.*?)\s*\])?(?:\{\s*(.*?)\s*\})?(?:\(\s*(.*?)\s*\))?(?:~\s*(.*?)\s*)?(?:@\s*([0-9]+)\s*)?(?:%\s*(.*?)\s*)?$",
    )
    .expect("file name grammar is a valid regex")
});

/// Decode a base name (no extension) into metadata
pub fn decode(base: &str) -> Metadata {
    let Some(caps) = GRAMMAR.captures(base) else {
        // Only reachable for names the grammar cannot span (e.g. embedded newlines)
        return Metadata {
            name: base.to_string(),
            ..Metadata::default()
        };
    };

    let group = |i: usize| caps.get(i).map(|m| m.as_str().trim()).unwrap_or("");
    let optional = |i: usize| Some(group(i)).filter(|s| !s.is_empty()).map(str::to_string);

    Metadata {
        name: group(1).to_string(),
        tags: split_list(group(2)),
        actors: split_list(group(3)),
        series: optional(4),
        release: optional(5).map(|raw| ReleaseDate::parse(&raw)),
        rating: parse_rating(group(6)),
        feature: optional(7),
    }
}

/// Decode a full file name, dropping its extension first
pub fn decode_file_name(file_name: &str) -> Metadata {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    decode(&stem)
}

/// Encode metadata back into a base name (no extension)
pub fn encode(meta: &Metadata) -> String {
    let mut base = meta.name.clone();

    let tags = dedup_preserving(meta.tags.iter().cloned());
    if !tags.is_empty() {
        let _ = write!(base, "[{}]", tags.join(", "));
    }

    let actors = dedup_preserving(meta.actors.iter().cloned());
    if !actors.is_empty() {
        let _ = write!(base, "{{{}}}", actors.join(", "));
    }

    if !meta.series_str().is_empty() {
        let _ = write!(base, "({})", meta.series_str());
    }

    if !meta.release_str().is_empty() {
        let _ = write!(base, "~{}", meta.release_str());
    }

    // The rating is always written, even when it is the default
    let _ = write!(base, "@{}", meta.rating);

    if !meta.feature_str().is_empty() {
        let _ = write!(base, "%{}", meta.feature_str());
    }

    base
}

/// Encode metadata into a full file name with the given extension
pub fn encode_file_name(meta: &Metadata, extension: &str) -> String {
    let base = encode(meta);
    if extension.is_empty() {
        base
    } else {
        format!("{}.{}", base, extension)
    }
}

/// Split a comma separated list, trimming entries and dropping empties and repeats
pub fn split_list(raw: &str) -> Vec<String> {
    dedup_preserving(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    )
}

/// True if a value would survive an encode/decode cycle unchanged
pub fn is_plain(value: &str) -> bool {
    !value.contains(RESERVED) && value.trim() == value
}

fn parse_rating(digits: &str) -> Rating {
    if digits.is_empty() {
        return Rating::default();
    }
    match digits.parse::<u64>() {
        Ok(value) => Rating::clamped(value.min(i64::MAX as u64) as i64),
        // Only overflow can fail here, the grammar admits digits alone
        Err(_) => Rating::clamped(i64::MAX),
    }
}
