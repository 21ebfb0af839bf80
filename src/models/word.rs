//! Word event data structures.

use serde::{Deserialize, Serialize};

/// One normalized word plus its provenance.
///
/// The unit of output: published to subscribers and stored in batch
/// snapshots. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordEvent {
    /// Originating feed event type, e.g. `PushEvent`
    #[serde(rename = "type")]
    pub event_type: String,

    /// URL of the comment, issue, pull request or commit the word came from
    pub url: String,

    /// The normalized token itself
    pub word: String,

    /// Event time as unix seconds
    pub timestamp: i64,

    /// Source repository summary
    pub repo: WordRepo,
}

/// Repository summary attached to each word event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordRepo {
    pub name: String,
    pub url: String,
    pub langs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let event = WordEvent {
            event_type: "PushEvent".to_string(),
            url: "https://github.com/octo/repo/commit/abc".to_string(),
            word: "docker".to_string(),
            timestamp: 1401624000,
            repo: WordRepo {
                name: "octo/repo".to_string(),
                url: "https://github.com/octo/repo".to_string(),
                langs: vec!["Go".to_string()],
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PushEvent");
        assert_eq!(json["word"], "docker");
        assert_eq!(json["repo"]["langs"][0], "Go");

        let back: WordEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
