//! Local file names for cached resources

use std::collections::HashSet;
use url::Url;

const MAX_FILE_NAME_LEN: usize = 100;

/// Derives a file name from the last path segment of a URL
///
/// Characters outside `[A-Za-z0-9._-]` become `_` and leading dots are
/// dropped. URLs without a usable segment get `resource`.
pub fn base_file_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("");

    let sanitized: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() {
        return "resource".to_string();
    }

    // Keep the extension when truncating
    if sanitized.len() > MAX_FILE_NAME_LEN {
        let (stem, ext) = split_extension(sanitized);
        if ext.len() >= MAX_FILE_NAME_LEN {
            return sanitized[..MAX_FILE_NAME_LEN].to_string();
        }
        let keep = MAX_FILE_NAME_LEN - ext.len();
        return format!("{}{}", &stem[..keep.min(stem.len())], ext);
    }
    sanitized.to_string()
}

/// Splits `name.ext` into (`name`, `.ext`); names without an extension get an empty one
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}

/// Assigns distinct file names in first-come order
///
/// The first URL to claim a name gets it as is; later URLs with the same
/// base name get `-1`, `-2`, ... before the extension. Names are compared
/// case-insensitively so the result is safe on case-folding filesystems.
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a file name for `url`
    pub fn assign(&mut self, url: &Url) -> String {
        let base = base_file_name(url);
        if self.claim(&base) {
            return base;
        }

        let (stem, ext) = split_extension(&base);
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}{}", stem, n, ext);
            if self.claim(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn claim(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_ascii_lowercase())
    }
}
