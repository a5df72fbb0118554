//! Centralized filename parsing for gallery photos.
//!
//! Photo filenames carry two kinds of information:
//!
//! - **Category tags**: `#`-prefixed words anywhere in the stem
//!   (`DSC001 #bw #street.jpg`). A photo with tags belongs to exactly those
//!   categories, regardless of which folder it was found in.
//! - **Identity**: the stem with every tag removed and trimmed. Two files with
//!   the same identity are the same photo, even if they live in different
//!   category folders or carry different tag combinations.
//!
//! ## Derived names
//!
//! ```text
//! stem               identity     label        sequence   rendition
//! DSC_0042#bw        DSC_0042     DSC 0042     42         DSC_0042.avif
//! golden-hour #sky   golden-hour  Golden Hour  0          golden-hour.avif
//! #bw                #bw          Bw           0          bw.avif
//! ```
//!
//! The last row shows the fallback: when stripping leaves nothing, the raw
//! stem is the identity.

/// Result of splitting a filename stem into tags and a clean name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTags {
    /// Tag words in left-to-right order, marker removed, not deduplicated.
    pub tags: Vec<String>,
    /// Stem with every tag occurrence removed, then trimmed.
    pub clean_name: String,
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Extract marker-prefixed tags from a filename stem.
///
/// A tag is the marker followed by one or more `[A-Za-z0-9_]` characters.
/// A marker with no word after it is left in place as ordinary text.
///
/// - `"DSC001#bw"` → tags `["bw"]`, clean `"DSC001"`
/// - `"a #x b #y"` → tags `["x", "y"]`, clean `"a  b"`
/// - `"plain"` → tags `[]`, clean `"plain"`
pub fn parse_tags(stem: &str, marker: char) -> ParsedTags {
    let mut tags = Vec::new();
    let mut clean = String::with_capacity(stem.len());
    let mut chars = stem.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c == marker {
            let mut word = String::new();
            while let Some(&(_, next)) = chars.peek() {
                if !is_tag_char(next) {
                    break;
                }
                word.push(next);
                chars.next();
            }
            if word.is_empty() {
                clean.push(c);
            } else {
                tags.push(word);
            }
        } else {
            clean.push(c);
        }
    }

    ParsedTags {
        tags,
        clean_name: clean.trim().to_string(),
    }
}

/// Deduplication key for a photo: the tag-stripped stem, or the raw stem when
/// stripping leaves nothing.
pub fn photo_identity(stem: &str, parsed: &ParsedTags) -> String {
    if parsed.clean_name.is_empty() {
        stem.to_string()
    } else {
        parsed.clean_name.clone()
    }
}

/// Human-readable label derived from an identity.
///
/// Tags are stripped, `-` and `_` become spaces, runs of whitespace collapse,
/// and the first letter of each word is upper-cased. The rest of each word
/// keeps its case, so camera prefixes like `DSC` survive.
pub fn display_label(identity: &str, marker: char) -> String {
    let parsed = parse_tags(identity, marker);
    let base = if parsed.clean_name.is_empty() {
        identity.trim_start_matches(marker)
    } else {
        parsed.clean_name.as_str()
    };

    base.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars)
            .collect(),
        None => String::new(),
    }
}

/// Capture-sequence number: the first run of ASCII digits in a label.
///
/// Returns 0 when the label contains no digits. Saturates at `u64::MAX`
/// for absurdly long digit runs.
pub fn sequence_number(label: &str) -> u64 {
    label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .fold(0u64, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(c.to_digit(10).unwrap_or(0)))
        })
}

/// Sanitize an identity into a rendition filename stem.
///
/// - Whitespace becomes `-`
/// - Characters outside `[A-Za-z0-9_-]` are removed
/// - Consecutive dashes collapse into one
/// - Leading and trailing dashes are stripped
/// - An empty result becomes `"photo"`
pub fn rendition_stem(identity: &str) -> String {
    let mut out = String::with_capacity(identity.len());
    let mut prev_dash = false;
    for c in identity.chars() {
        let mapped = if c.is_whitespace() {
            '-'
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            continue;
        };
        if mapped == '-' {
            if !prev_dash {
                out.push('-');
            }
            prev_dash = true;
        } else {
            out.push(mapped);
            prev_dash = false;
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "photo".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether an identity looks like a numbered variant copy (`DSC1234-2`).
///
/// Pattern: ASCII letters, then digits, then `-`, then digits, nothing else.
pub fn is_variant_copy(identity: &str) -> bool {
    let rest = identity.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    if rest.len() == identity.len() {
        return false;
    }
    let Some((number, copy)) = rest.split_once('-') else {
        return false;
    };
    !number.is_empty()
        && !copy.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
        && copy.chars().all(|c| c.is_ascii_digit())
}
