//! Shared helpers for unit tests across the crate

pub mod fixtures;
