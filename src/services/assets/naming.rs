//! Asset Filename Contract
//!
//! `image_{unixSeconds}_{subjectSlug}_{styleId}_{modelId}_{paddedBatch}.{ext}`
//! with a parse function that is the exact inverse for well-formed names.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Maximum subject slug length after sanitization.
pub const MAX_SLUG_LEN: usize = 50;

/// The components encoded in an asset filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameParts {
    pub timestamp: i64,
    pub subject_slug: String,
    pub style_id: String,
    pub model_id: String,
    /// 0-based; rendered 1-based and zero-padded to two digits
    pub batch_index: u32,
    pub ext: String,
}

/// Sanitize a free-text filename component.
///
/// Lowercased, NFKD-folded with combining marks and remaining non-ASCII
/// stripped, whitespace converted to hyphens, anything outside `[a-z0-9-]`
/// removed, consecutive hyphens collapsed, edge hyphens trimmed. An empty
/// result becomes the literal `unknown`.
pub fn sanitize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_hyphen = true; // suppresses leading hyphens
    for c in raw.nfkd() {
        if c.is_whitespace() || c == '-' {
            if !prev_hyphen {
                out.push('-');
                prev_hyphen = true;
            }
            continue;
        }
        if !c.is_ascii() {
            continue;
        }
        for lc in c.to_lowercase() {
            if lc.is_ascii_alphanumeric() {
                out.push(lc);
                prev_hyphen = false;
            }
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "unknown".to_string()
    } else {
        out
    }
}

/// Sanitize a subject into its slug, truncating to `MAX_SLUG_LEN` characters
/// at a hyphen boundary.
pub fn slugify_subject(raw: &str) -> String {
    let slug = sanitize_component(raw);
    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }
    // Slug is pure ASCII at this point, so byte indexing is safe.
    let prefix = &slug[..MAX_SLUG_LEN];
    match prefix.rfind('-') {
        Some(pos) if pos > 0 => prefix[..pos].to_string(),
        _ => prefix.to_string(),
    }
}

/// Map a content type to the filename extension.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

/// Render the canonical asset filename for a parameter set.
///
/// Free-text components are sanitized on the way in; the batch index is
/// rendered 1-based, zero-padded to two digits.
pub fn generate_filename(parts: &FilenameParts) -> String {
    format!(
        "image_{}_{}_{}_{}_{:02}.{}",
        parts.timestamp,
        slugify_subject(&parts.subject_slug),
        sanitize_component(&parts.style_id),
        sanitize_component(&parts.model_id),
        parts.batch_index + 1,
        parts.ext
    )
}

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^image_(\d+)_([a-z0-9-]+)_([a-z0-9-]+)_([a-z0-9-]+)_(\d{2})\.([a-z0-9]+)$")
            .expect("static filename pattern compiles")
    })
}

/// Parse a well-formed asset filename back into its components.
///
/// Returns `None` (never panics) for malformed input.
pub fn parse_filename(name: &str) -> Option<FilenameParts> {
    let caps = filename_re().captures(name)?;
    let timestamp: i64 = caps[1].parse().ok()?;
    let padded: u32 = caps[5].parse().ok()?;
    if padded == 0 {
        return None;
    }
    Some(FilenameParts {
        timestamp,
        subject_slug: caps[2].to_string(),
        style_id: caps[3].to_string(),
        model_id: caps[4].to_string(),
        batch_index: padded - 1,
        ext: caps[6].to_string(),
    })
}
