//! Filename discovery and sanitization for downloaded artifacts.

use url::Url;

/// Longest extension accepted when deriving a name from the URL path.
const MAX_EXTENSION_LEN: usize = 12;

/// Picks the on-disk filename for a download response.
///
/// The `Content-Disposition` filename wins. Otherwise the last segment of the
/// final URL is used, but only when it carries an extension.
#[must_use]
pub fn resolve_filename(content_disposition: Option<&str>, final_url: &Url) -> Option<String> {
    content_disposition
        .and_then(parse_content_disposition)
        .or_else(|| filename_from_url(final_url))
        .map(|name| sanitize_filename(&name))
        .filter(|name| is_usable(name))
}

/// Parses Content-Disposition header to extract filename.
///
/// Handles both:
/// - `attachment; filename="demo-1.0.zip"`
/// - `attachment; filename=demo-1.0.zip`
/// - `attachment; filename*=UTF-8''demo%20plugin.zip` (RFC 5987)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        // charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded_name) {
                if !decoded.is_empty() {
                    return Some(decoded.into_owned());
                }
            }
        }
    }

    let pos = find_plain_filename(header)?;
    let value = header[pos + 9..].trim();

    if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped.find('"').unwrap_or(stripped.len());
        let filename = stripped[..end].trim();
        return (!filename.is_empty()).then(|| filename.to_string());
    }

    let end = value.find(';').unwrap_or(value.len());
    let filename = value[..end].trim().trim_matches('\'');
    (!filename.is_empty()).then(|| filename.to_string())
}

/// Finds `filename=` that is not the tail of `filename*=`.
fn find_plain_filename(header: &str) -> Option<usize> {
    header
        .match_indices("filename=")
        .map(|(pos, _)| pos)
        .find(|&pos| pos == 0 || !header[..pos].ends_with('*'))
}

/// Last path segment of `url`, when it has a short extension.
pub(crate) fn filename_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment).ok()?;
    let dot = decoded.rfind('.')?;
    let extension_len = decoded.len() - dot - 1;
    if dot == 0 || extension_len == 0 || extension_len > MAX_EXTENSION_LEN {
        return None;
    }
    Some(decoded.into_owned())
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
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

    // "." and ".." would resolve outside the version directory
    if sanitized.chars().all(|c| c == '.') {
        return sanitized.replace('.', "_");
    }
    sanitized
}

fn is_usable(name: &str) -> bool {
    !name.trim_matches('_').is_empty()
}
