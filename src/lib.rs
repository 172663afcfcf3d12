//! Library entry for stockyard exposing core logic for integration tests.
//!
//! Stockyard figures out which conda-forge feedstocks must be rebuilt against
//! a new runtime, orders them by dependency, optionally shards the work, and
//! drives the builds with a bounded worker pool.

pub mod app;
pub mod args;
pub mod build;
pub mod channel;
pub mod naming;
pub mod partition;
pub mod recipe;
pub mod repo;
pub mod resolve;
pub mod schedule;
pub mod util;
