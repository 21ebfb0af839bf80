// src/models/mod.rs

//! Domain models for the harvester application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod event;
mod repo;
mod word;

// Re-export all public types
pub use config::{ApiConfig, Config, HarvestConfig, TtlConfig, WordConfig};
pub use event::{Comment, Commit, EventPayload, Fragment, Issue, PullRequest, RawEvent, RepoRef};
pub use repo::{REPO_KEY_PREFIX, RepoBase, RepoMetadata, home_url};
pub use word::{WordEvent, WordRepo};
