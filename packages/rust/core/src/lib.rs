//! Core pipeline orchestration and domain logic for jobsweep.
//!
//! This crate ties together acquisition, normalization, locale filtering,
//! deduplication, and sink delivery into a single run (see [`Pipeline`]).

pub mod dedup;
pub mod pipeline;

pub use dedup::{Deduplicator, MarkSeenOutcome, fingerprint};
pub use pipeline::{
    Pipeline, ProgressReporter, RunOutcome, RunReport, RunRequest, SilentProgress, Stage,
    StageCounts,
};
