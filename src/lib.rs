// src/lib.rs

//! _mklwlib_ is the library of the _mk_logwatch_ agent plugin.
//!
//! It reports new lines of log files, classified by configured patterns,
//! remembering per file how far it has read.
//!
//! * [`data`] holds the parsed configuration and status types.
//! * [`readers`] reads configuration, status, and log files.
//! * [`debug`] holds printer macros and test helpers.

pub mod common;
pub mod data;
pub mod debug;
pub mod readers;
#[cfg(test)]
pub mod tests;
