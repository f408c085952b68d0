//! Integration tests for probes
//!
//! Each test starts its own probe server on a free loopback port and talks
//! to it over real HTTP.
//!
//! Run with: cargo test --test integration

mod helpers;

mod lifecycle;
mod endpoints;
