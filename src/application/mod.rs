//! Application layer: the dispatch engine and its supporting pieces.
//!
//! A run is orchestrated by a single scheduler task that owns all mutable
//! state; results and control signals flow to the caller over channels.

pub mod engine;
pub mod plan;
pub mod progress;
pub mod queue;
pub mod restart;
