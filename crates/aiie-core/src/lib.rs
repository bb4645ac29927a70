//! aiie-core — Imaging appropriateness scoring engine.
//!
//! This crate defines the clinical data model, the declarative evidence rule
//! base, the additive scoring engine with its per-factor explanation, option
//! ranking, and the single score-to-category band table shared by every
//! consumer.

pub mod category;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod ranking;
pub mod rules;
