// LogDigest - app/mod.rs
//
// Application layer: staging, classification side effects, retention,
// delivery, and the run orchestrator.
// Dependencies: core layer, platform layer.

pub mod analyze;
pub mod cleanup;
pub mod notify;
pub mod pipeline;
pub mod staging;
