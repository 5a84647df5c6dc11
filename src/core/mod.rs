// LogDigest - core/mod.rs
//
// Core business logic layer.
// Dependencies: util layer, serde, and the walkdir/glob pair used by
// source discovery.
// Must NOT depend on: platform or app.

pub mod classify;
pub mod discovery;
pub mod model;
pub mod report;
pub mod retry;
