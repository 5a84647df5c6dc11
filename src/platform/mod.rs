// LogDigest - platform/mod.rs
//
// Platform abstraction layer: configuration, filesystem helpers, run lock,
// secrets, and the mail transport.
// Must NOT depend on: core, app.

pub mod config;
pub mod fs;
pub mod lock;
pub mod mail;
pub mod secrets;
