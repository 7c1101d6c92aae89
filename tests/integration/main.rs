//! Integration test binary. All integration tests live in this one binary
//! to keep link times down.
//!
//! See the matklad pattern: <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod helpers;

mod auth_session;
mod config_roundtrip;
mod reminder_lifecycle;
