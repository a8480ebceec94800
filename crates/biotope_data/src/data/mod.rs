//! Core data structures for the biotope simulation.

pub mod agent;
pub mod frames;
