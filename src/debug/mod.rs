// src/debug/mod.rs

//! The `debug` module is printer macros for warnings and errors, and
//! helper functions for test builds.

#[cfg(test)]
pub mod helpers;

pub mod printers;
