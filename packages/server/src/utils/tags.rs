//! Hashtag normalization shared by upload, edit, filtering and the banned-tag seed.

const TAG_MARKER: char = '#';

/// Normalize one token to `#lowercase`. Returns `None` for blank tokens or a
/// bare marker.
pub fn normalize_tag(token: &str) -> Option<String> {
    let body = token.trim().trim_start_matches(TAG_MARKER);
    if body.is_empty() {
        return None;
    }
    Some(format!("{TAG_MARKER}{}", body.to_lowercase()))
}

/// Split free text on commas and whitespace and normalize every token.
/// Order is kept and duplicates are dropped.
pub fn normalize_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if let Some(tag) = normalize_tag(token)
            && !tags.contains(&tag)
        {
            tags.push(tag);
        }
    }
    tags
}

/// Storage form: tags joined by single spaces.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(" ")
}

/// Inverse of [`join_tags`].
pub fn split_stored(stored: &str) -> Vec<String> {
    stored.split_whitespace().map(str::to_string).collect()
}
