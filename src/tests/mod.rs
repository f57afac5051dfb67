// src/tests/mod.rs

//! Tests for _mklwlib_.
//!
//! Tests are placed at `src/tests/`, inside the `mklwlib`. This is a
//! reasonable trade-off of separation and access.
//!
//! Tests placed at top-level path `tests/` do not have crate-internal
//! visibility.

pub mod configreader_tests;
pub mod fileresolver_tests;
