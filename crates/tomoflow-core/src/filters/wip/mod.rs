//! Operations under development. Skipped by default discovery.

pub mod gaussian;
