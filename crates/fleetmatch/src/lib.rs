//! Vehicle matching and ride-hailing eligibility decisions.
//!
//! The crate composes four pieces: an exhaustive embedding index for candidate
//! retrieval, a deterministic use-case ranker, a layered eligibility resolver,
//! and a generative gateway that keeps the resolver decision-capable when
//! providers fail.

pub mod config;
pub mod error;
pub mod gateway;
pub mod telemetry;
pub mod workflows;
