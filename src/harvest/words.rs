// src/harvest/words.rs

//! Text normalization and word event construction.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Fragment, RepoMetadata, WordConfig, WordEvent, WordRepo};

/// Markup-like wrapping, e.g. `<b>` or `</p>`.
fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"))
}

/// Runs of anything outside letters, digits, `_`, `#`, `+`, `-` and
/// whitespace (Unicode-aware).
fn junk_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\p{L}\p{N}_#+\-\s]+").expect("valid junk pattern"))
}

/// Break a raw text into lowercase candidate tokens.
///
/// Strips markup-like wrapping, collapses runs of unwanted characters to
/// single spaces, treats `_` and escaped newlines as separators, then
/// lowercases and splits on whitespace. Control characters fall out with
/// the whitespace split.
pub fn normalize(text: &str) -> Vec<String> {
    let text = tag_pattern().replace_all(text, " ");
    let text = text.replace("\\n", " ");
    let text = junk_pattern().replace_all(&text, " ");
    let text = text.replace('_', " ");
    let text = text.to_lowercase();

    text.split_whitespace().map(str::to_string).collect()
}

/// True if removing every ASCII digit leaves an empty string.
pub fn is_numeric_only(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit())
}

/// Build word events from extracted fragments and a decorated repository.
///
/// Each fragment is normalized; tokens outside the configured length
/// limits and numeric-only tokens are dropped. Every surviving token
/// yields one [`WordEvent`] carrying its fragment's source URL, the
/// originating event's type and timestamp, and the repository summary.
pub fn build_word_events(
    fragments: &[Fragment],
    repo: &RepoMetadata,
    event_type: &str,
    timestamp: i64,
    limits: &WordConfig,
) -> Vec<WordEvent> {
    let word_repo = WordRepo {
        name: repo.name.clone(),
        url: repo.home_url.clone(),
        langs: repo.languages.clone(),
    };

    let mut events = Vec::new();
    for fragment in fragments {
        for word in normalize(&fragment.text) {
            let length = word.chars().count();
            if length < limits.min_length || length > limits.max_length {
                continue;
            }
            if is_numeric_only(&word) {
                continue;
            }

            events.push(WordEvent {
                event_type: event_type.to_string(),
                url: fragment.source_url.clone(),
                word,
                timestamp,
                repo: word_repo.clone(),
            });
        }
    }

    events
}
