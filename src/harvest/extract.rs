// src/harvest/extract.rs

//! Event classification and text extraction.
//!
//! Turns a raw feed event into the free-text fragments worth harvesting.
//! Only a fixed set of type/action pairs produces fragments; everything
//! else yields nothing, and events that yield nothing never reach the
//! repository metadata cache.

use crate::models::{EventPayload, Fragment, RawEvent, home_url};

/// Extract the harvestable text fragments from a feed event.
///
/// Recognized pairs:
/// - `IssueCommentEvent` / `created`: comment body
/// - `IssuesEvent` / `opened`: issue title and body
/// - `PullRequestEvent` / `opened`: PR title and body
/// - `PullRequestReviewCommentEvent` / `created`: comment body
/// - `PushEvent`: one fragment per commit message, URL pointing at the
///   commit page
///
/// Fragments with empty text are dropped.
pub fn extract_fragments(event: &RawEvent) -> Vec<Fragment> {
    let mut fragments = Vec::new();

    match &event.payload {
        EventPayload::IssueComment { action, comment } if action == "created" => {
            push_fragment(&mut fragments, comment.body.as_deref(), &comment.html_url);
        }
        EventPayload::Issues { action, issue } if action == "opened" => {
            push_fragment(&mut fragments, issue.title.as_deref(), &issue.html_url);
            push_fragment(&mut fragments, issue.body.as_deref(), &issue.html_url);
        }
        EventPayload::PullRequest {
            action,
            pull_request,
        } if action == "opened" => {
            push_fragment(
                &mut fragments,
                pull_request.title.as_deref(),
                &pull_request.html_url,
            );
            push_fragment(
                &mut fragments,
                pull_request.body.as_deref(),
                &pull_request.html_url,
            );
        }
        EventPayload::ReviewComment { action, comment } if action == "created" => {
            push_fragment(&mut fragments, comment.body.as_deref(), &comment.html_url);
        }
        EventPayload::Push { commits } => {
            let base = home_url(&event.repo.name);
            for commit in commits {
                let url = format!("{}/commit/{}", base, commit.sha);
                push_fragment(&mut fragments, commit.message.as_deref(), &url);
            }
        }
        // Recognized type with a non-matching action, or unrecognized type
        _ => {}
    }

    fragments
}

fn push_fragment(fragments: &mut Vec<Fragment>, text: Option<&str>, source_url: &str) {
    if let Some(text) = text
        && !text.is_empty()
    {
        fragments.push(Fragment {
            text: text.to_string(),
            source_url: source_url.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, Commit, Issue, RepoRef};

    fn sample_event(payload: EventPayload) -> RawEvent {
        RawEvent {
            id: "1".to_string(),
            created_at: None,
            repo: RepoRef {
                id: 42,
                name: "octo/repo".to_string(),
                url: "https://api.github.com/repos/octo/repo".to_string(),
            },
            payload,
        }
    }

    fn comment(body: Option<&str>) -> Comment {
        Comment {
            body: body.map(str::to_string),
            html_url: "https://github.com/octo/repo/issues/1#c1".to_string(),
        }
    }

    #[test]
    fn test_issue_comment_created() {
        let event = sample_event(EventPayload::IssueComment {
            action: "created".to_string(),
            comment: comment(Some("nice work")),
        });

        let fragments = extract_fragments(&event);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "nice work");
    }

    #[test]
    fn test_non_matching_action_yields_nothing() {
        let event = sample_event(EventPayload::IssueComment {
            action: "deleted".to_string(),
            comment: comment(Some("gone")),
        });

        assert!(extract_fragments(&event).is_empty());
    }

    #[test]
    fn test_issue_opened_yields_title_and_body() {
        let event = sample_event(EventPayload::Issues {
            action: "opened".to_string(),
            issue: Issue {
                title: Some("Crash on startup".to_string()),
                body: Some("It crashes".to_string()),
                html_url: "https://github.com/octo/repo/issues/2".to_string(),
            },
        });

        let fragments = extract_fragments(&event);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "Crash on startup");
        assert_eq!(fragments[1].text, "It crashes");
        assert_eq!(fragments[0].source_url, fragments[1].source_url);
    }

    #[test]
    fn test_issue_with_null_body_yields_only_title() {
        let event = sample_event(EventPayload::Issues {
            action: "opened".to_string(),
            issue: Issue {
                title: Some("Crash on startup".to_string()),
                body: None,
                html_url: "https://github.com/octo/repo/issues/2".to_string(),
            },
        });

        assert_eq!(extract_fragments(&event).len(), 1);
    }

    #[test]
    fn test_push_builds_commit_urls() {
        let event = sample_event(EventPayload::Push {
            commits: vec![
                Commit {
                    sha: "abc123".to_string(),
                    message: Some("Fix bug".to_string()),
                },
                Commit {
                    sha: "def456".to_string(),
                    message: Some("Add feature".to_string()),
                },
            ],
        });

        let fragments = extract_fragments(&event);
        assert_eq!(fragments.len(), 2);
        assert_eq!(
            fragments[0].source_url,
            "https://github.com/octo/repo/commit/abc123"
        );
        assert_eq!(
            fragments[1].source_url,
            "https://github.com/octo/repo/commit/def456"
        );
    }

    #[test]
    fn test_unrecognized_type_yields_nothing() {
        let event = sample_event(EventPayload::Unrecognized);
        assert!(extract_fragments(&event).is_empty());
    }

    #[test]
    fn test_empty_text_is_dropped() {
        let event = sample_event(EventPayload::IssueComment {
            action: "created".to_string(),
            comment: comment(Some("")),
        });

        assert!(extract_fragments(&event).is_empty());
    }
}
