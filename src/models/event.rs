//! Raw feed event structures.
//!
//! The global events feed mixes many event types with loosely shaped
//! payloads. Only the handful of types that carry human-written text are
//! modeled with their payload fields; everything else collapses into
//! [`EventPayload::Unrecognized`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A single record from the global events feed.
///
/// Received fresh on every poll cycle and never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: String,

    /// Event creation time as reported upstream
    pub created_at: Option<DateTime<Utc>>,

    /// Repository the event belongs to
    pub repo: RepoRef,

    /// Type-specific payload
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl RawEvent {
    /// Unix timestamp of the event, falling back to "now" when the feed
    /// omits `created_at`.
    pub fn timestamp(&self) -> i64 {
        self.created_at.unwrap_or_else(Utc::now).timestamp()
    }
}

/// Repository reference embedded in every feed event.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoRef {
    #[serde(default)]
    pub id: i64,

    /// Repository full name, e.g. `rust-lang/rust`
    #[serde(default)]
    pub name: String,

    /// API URL of the repository
    #[serde(default)]
    pub url: String,
}

/// Closed union of event payloads, tagged by the feed's `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventPayload {
    #[serde(rename = "IssueCommentEvent")]
    IssueComment {
        #[serde(default)]
        action: String,
        comment: Comment,
    },

    #[serde(rename = "IssuesEvent")]
    Issues {
        #[serde(default)]
        action: String,
        issue: Issue,
    },

    #[serde(rename = "PullRequestEvent")]
    PullRequest {
        #[serde(default)]
        action: String,
        pull_request: PullRequest,
    },

    #[serde(rename = "PullRequestReviewCommentEvent")]
    ReviewComment {
        #[serde(default)]
        action: String,
        comment: Comment,
    },

    #[serde(rename = "PushEvent")]
    Push {
        #[serde(default)]
        commits: Vec<Commit>,
    },

    /// Any feed type we do not harvest
    #[serde(other, deserialize_with = "ignore_payload")]
    Unrecognized,
}

/// Discard whatever payload accompanies an unrecognized event type.
fn ignore_payload<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<(), D::Error> {
    serde::de::IgnoredAny::deserialize(deserializer).map(|_| ())
}

impl EventPayload {
    /// The upstream type tag, carried onto every word event built from it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::IssueComment { .. } => "IssueCommentEvent",
            Self::Issues { .. } => "IssuesEvent",
            Self::PullRequest { .. } => "PullRequestEvent",
            Self::ReviewComment { .. } => "PullRequestReviewCommentEvent",
            Self::Push { .. } => "PushEvent",
            Self::Unrecognized => "Unrecognized",
        }
    }

    /// Whether this is one of the harvested event types.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// Issue or review comment payload fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
}

/// Issue payload fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
}

/// Pull request payload fields.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
}

/// A single commit within a push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub sha: String,
    pub message: Option<String>,
}

/// A piece of free text extracted from an event, with its source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub source_url: String,
}
