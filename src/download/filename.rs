//! Filename extraction, sanitization, and path resolution for downloads.
//!
//! Names come from three places in increasing priority for the captured
//! name: the URL's last path segment, then a `Content-Disposition`
//! attachment header. An explicit caller-supplied name beats both.

use std::path::{Component, Path, PathBuf};

/// Parses a `Content-Disposition` header to extract the attachment filename.
///
/// Only `attachment` dispositions are honored. Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf;`
/// - `attachment; filename*=UTF-8''example%20file.pdf` (RFC 5987)
///
/// The returned name is already sanitized.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    let mut parts = header.split(';');
    let disposition = parts.next()?.trim();
    if !disposition.eq_ignore_ascii_case("attachment") {
        return None;
    }

    let params: Vec<(String, &str)> = parts
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), value.trim()))
        })
        .collect();

    // filename* wins over filename when both are present
    if let Some((_, value)) = params.iter().find(|(key, _)| key == "filename*")
        && let Some(quote_pos) = value.find("''")
        && let Ok(decoded) = urlencoding::decode(value[quote_pos + 2..].trim_matches('"'))
        && !decoded.trim().is_empty()
    {
        return Some(sanitize_filename(decoded.trim()));
    }

    let (_, value) = params.iter().find(|(key, _)| key == "filename")?;
    let name = value.trim_matches('"').trim();
    (!name.is_empty()).then(|| sanitize_filename(name))
}

/// Sanitizes a filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems with `_`:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Resolves the destination path for a download.
///
/// An explicit name wins outright; otherwise the captured name (URL segment
/// or `Content-Disposition`) is used. Returns `None` when neither exists.
pub(crate) fn resolve_target_path(
    dest_dir: &Path,
    explicit: Option<&str>,
    captured: Option<&str>,
) -> Option<PathBuf> {
    let name = explicit
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or_else(|| captured.map(str::trim).filter(|n| !n.is_empty()))?;
    Some(dest_dir.join(sanitize_filename(name)))
}
