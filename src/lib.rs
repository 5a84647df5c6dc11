// LogDigest - lib.rs
//
// Library entry point, exposing every layer for integration testing and for
// embedding the run pipeline in other tools. The CLI lives in `main.rs`.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
