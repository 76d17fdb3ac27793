//! Blob key conventions for uploaded originals and their derived media.
//!
//! Derived keys are the original key plus a fixed suffix, so every derived
//! object can be located from the original key alone.

use chrono::{DateTime, Utc};

pub const ANIMATED_THUMBNAIL_SUFFIX: &str = "_thumb.gif";
pub const STATIC_THUMBNAIL_SUFFIX: &str = "_thumb.jpg";
pub const RENDITION_720P_SUFFIX: &str = "_720p.mp4";
pub const RENDITION_480P_SUFFIX: &str = "_480p.mp4";

const MAX_FILENAME_CHARS: usize = 120;

/// Key for a freshly uploaded original: `{user_id}_{unix_millis}_{filename}`.
pub fn original_key(user_id: i32, uploaded_at: DateTime<Utc>, filename: &str) -> String {
    format!(
        "{user_id}_{}_{}",
        uploaded_at.timestamp_millis(),
        sanitize_filename(filename)
    )
}

/// Reduce a client-supplied filename to a key-safe ASCII form.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Content type for a key, guessed from its extension.
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .to_string()
}

/// Keys of every object derived from one original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKeys {
    pub animated_thumbnail: String,
    pub static_thumbnail: String,
    pub rendition_720p: String,
    pub rendition_480p: String,
}

impl DerivedKeys {
    pub fn for_original(original_key: &str) -> Self {
        Self {
            animated_thumbnail: format!("{original_key}{ANIMATED_THUMBNAIL_SUFFIX}"),
            static_thumbnail: format!("{original_key}{STATIC_THUMBNAIL_SUFFIX}"),
            rendition_720p: format!("{original_key}{RENDITION_720P_SUFFIX}"),
            rendition_480p: format!("{original_key}{RENDITION_480P_SUFFIX}"),
        }
    }

    pub fn thumbnails(&self) -> [&str; 2] {
        [&self.animated_thumbnail, &self.static_thumbnail]
    }

    pub fn renditions(&self) -> [&str; 2] {
        [&self.rendition_720p, &self.rendition_480p]
    }
}
