// src/lib.rs

//! wordstream Library
//!
//! Harvests selected event types from the public GitHub event feed,
//! decorates them with repository language metadata and breaks their
//! text content into individual word events.

pub mod cache;
pub mod error;
pub mod harvest;
pub mod models;
