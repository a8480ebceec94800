//! # Biotope
//!
//! Runs the agent registry and force engine from `biotope_core` as one stage of a
//! four-stage pipeline (ecosystem → forces → physics → render) on tokio.

pub mod app;

pub use app::{Pipeline, PipelineOptions, PipelineReport};
