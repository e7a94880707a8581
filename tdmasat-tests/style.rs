//! Style Enforcement Tests
//!
//! Checks patterns in production sources that clippy does not catch on its own.
//!
//! - `production_code` - No `#[allow(dead_code)]` and no `.unwrap()` outside tests
//!
//! Only `src/` trees of the `tdmasat-*` crates are scanned.

#[path = "style/production_code.rs"]
mod production_code;
