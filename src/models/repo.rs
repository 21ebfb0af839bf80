//! Repository metadata structures.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::RepoRef;

/// Cache key prefix for repository records.
pub const REPO_KEY_PREFIX: &str = "repos:";

/// Public home page URL for a repository full name.
pub fn home_url(name: &str) -> String {
    format!("https://github.com/{name}")
}

/// Validated base record for a repository, derived from a feed event's
/// repository reference before any metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoBase {
    pub id: i64,
    pub name: String,
    pub home_url: String,
    pub languages_url: String,
}

impl RepoBase {
    /// Build a base record from a feed repository reference.
    ///
    /// Fails on a non-positive id or an empty name/url, which would
    /// produce an unusable cache key or languages endpoint.
    pub fn from_ref(repo: &RepoRef, languages_path: &str) -> Result<Self> {
        if repo.id <= 0 {
            return Err(AppError::validation(format!(
                "invalid repo id: {}",
                repo.id
            )));
        }
        if repo.name.is_empty() || repo.url.is_empty() {
            return Err(AppError::validation(format!(
                "repo {} has an empty name or url",
                repo.id
            )));
        }

        Ok(Self {
            id: repo.id,
            name: repo.name.clone(),
            home_url: home_url(&repo.name),
            languages_url: format!("{}{}", repo.url, languages_path),
        })
    }

    /// Cache key for this repository.
    pub fn cache_key(&self) -> String {
        format!("{}{}", REPO_KEY_PREFIX, self.id)
    }

    /// Flatten into cache hash fields, with an empty `langs` placeholder.
    pub fn to_cache_fields(&self) -> HashMap<String, String> {
        HashMap::from([
            ("id".to_string(), self.id.to_string()),
            ("name".to_string(), self.name.clone()),
            ("url".to_string(), self.home_url.clone()),
            ("langs_url".to_string(), self.languages_url.clone()),
            ("langs".to_string(), String::new()),
        ])
    }
}

/// A repository decorated with its qualifying languages.
///
/// The `languages` set holds every language contributing at least 10% of
/// the repository's byte volume, sorted ascending by name. Once populated
/// it is reused as-is for every event referencing the repository until the
/// cache entry expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMetadata {
    pub id: i64,
    pub name: String,
    pub home_url: String,
    pub languages_url: String,
    pub languages: Vec<String>,
}

impl RepoMetadata {
    /// Rebuild metadata from cache hash fields.
    ///
    /// Fields written by [`RepoBase::to_cache_fields`]; `langs` is a
    /// comma-joined list, empty meaning "not yet resolved".
    pub fn from_cache_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| -> Result<String> {
            fields
                .get(key)
                .cloned()
                .ok_or_else(|| AppError::cache(format!("repo record missing field '{key}'")))
        };

        let id = get("id")?
            .parse::<i64>()
            .map_err(|e| AppError::cache(format!("repo record has bad id: {e}")))?;
        let langs = get("langs")?;
        let languages = if langs.is_empty() {
            Vec::new()
        } else {
            langs.split(',').map(str::to_string).collect()
        };

        Ok(Self {
            id,
            name: get("name")?,
            home_url: get("url")?,
            languages_url: get("langs_url")?,
            languages,
        })
    }

    /// Comma-joined form of the languages list, as stored in the cache.
    pub fn languages_field(&self) -> String {
        self.languages.join(",")
    }
}

impl From<RepoBase> for RepoMetadata {
    fn from(base: RepoBase) -> Self {
        Self {
            id: base.id,
            name: base.name,
            home_url: base.home_url,
            languages_url: base.languages_url,
            languages: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ref() -> RepoRef {
        RepoRef {
            id: 42,
            name: "octo/repo".to_string(),
            url: "https://api.github.com/repos/octo/repo".to_string(),
        }
    }

    #[test]
    fn test_from_ref_builds_urls() {
        let base = RepoBase::from_ref(&sample_ref(), "/languages").unwrap();
        assert_eq!(base.home_url, "https://github.com/octo/repo");
        assert_eq!(
            base.languages_url,
            "https://api.github.com/repos/octo/repo/languages"
        );
        assert_eq!(base.cache_key(), "repos:42");
    }

    #[test]
    fn test_from_ref_rejects_bad_id() {
        let mut repo = sample_ref();
        repo.id = 0;
        assert!(RepoBase::from_ref(&repo, "/languages").is_err());
        repo.id = -3;
        assert!(RepoBase::from_ref(&repo, "/languages").is_err());
    }

    #[test]
    fn test_cache_fields_round_trip() {
        let base = RepoBase::from_ref(&sample_ref(), "/languages").unwrap();
        let meta = RepoMetadata::from_cache_fields(&base.to_cache_fields()).unwrap();
        assert_eq!(meta.id, 42);
        assert_eq!(meta.name, "octo/repo");
        assert!(meta.languages.is_empty());
    }

    #[test]
    fn test_languages_field_parsing() {
        let base = RepoBase::from_ref(&sample_ref(), "/languages").unwrap();
        let mut fields = base.to_cache_fields();
        fields.insert("langs".to_string(), "Go,Python".to_string());

        let meta = RepoMetadata::from_cache_fields(&fields).unwrap();
        assert_eq!(meta.languages, vec!["Go", "Python"]);
        assert_eq!(meta.languages_field(), "Go,Python");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let fields = HashMap::from([("id".to_string(), "42".to_string())]);
        assert!(RepoMetadata::from_cache_fields(&fields).is_err());
    }
}
