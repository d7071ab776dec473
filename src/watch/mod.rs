// src/watch/mod.rs

//! File watching for hot reload.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform recursive watcher (`notify`) on an
//!   application directory ([`watcher`]).
//! - Collapsing bursts of filesystem events into one action ([`debounce`]).
//!
//! It does **not** decide what a change means; the supervisor does.

pub mod debounce;
pub mod watcher;

pub use debounce::debounce;
pub use watcher::WatchSubscription;
