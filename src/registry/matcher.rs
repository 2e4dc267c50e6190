//! Keyword matching against registered categories.

use super::store::{CategoryEntry, Registry};
use crate::types::{CategoryKey, WorkRequest};

/// Most keywords kept per registered category.
pub const MAX_KEYWORDS: usize = 5;

/// Tokens shorter than this carry no signal and are dropped.
pub const MIN_KEYWORD_CHARS: usize = 2;

/// Find the first registered category whose keywords match the request.
///
/// The request's title and description are lowercased and categories are
/// scanned in registration order; the first entry with any keyword
/// contained in the text wins. No scoring, no ranking.
pub fn find_match<'r>(
    request: &WorkRequest,
    registry: &'r Registry,
) -> Option<(&'r CategoryKey, &'r CategoryEntry)> {
    let text = request.combined_text().to_lowercase();

    registry.categories.iter().find(|(_, entry)| {
        entry.keywords.iter().any(|keyword| {
            // An empty keyword would match every request.
            !keyword.is_empty() && text.contains(&keyword.to_lowercase())
        })
    })
}

/// Derive match keywords for a new category from the registering request.
///
/// Whitespace tokens of `title + description`, lowercased and trimmed of
/// edge punctuation, at least [`MIN_KEYWORD_CHARS`] characters long,
/// deduplicated preserving first occurrence, capped at [`MAX_KEYWORDS`].
pub fn extract_keywords(request: &WorkRequest) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    for token in request.combined_text().split_whitespace() {
        let cleaned: String = token
            .to_lowercase()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();

        if cleaned.chars().count() < MIN_KEYWORD_CHARS || keywords.contains(&cleaned) {
            continue;
        }

        keywords.push(cleaned);
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }

    keywords
}
