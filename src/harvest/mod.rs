// src/harvest/mod.rs

//! The event harvesting pipeline.
//!
//! Control flow: scheduler → fetch raw events → extract fragments →
//! decorate repositories → build word events → publish, after which the
//! scheduler computes the next delay and re-arms itself.

pub mod decorate;
pub mod extract;
pub mod publish;
pub mod scheduler;
pub mod words;

pub use decorate::RepoDecorator;
pub use extract::extract_fragments;
pub use publish::{BatchPublisher, DEFAULT_BACKLOG_KEYS, WORD_BATCH_KEY_PREFIX};
pub use scheduler::{Harvester, HarvesterStatus};
pub use words::{build_word_events, is_numeric_only, normalize};
