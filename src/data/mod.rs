// src/data/mod.rs

//! The `data` module is data containers for the parsed configuration,
//! line classification, and status cursors.
//!
//! ## Definitions of data
//!
//! ### Logfiles block
//!
//! A "logfiles block" is one or more glob patterns sharing an ordered list
//! of classification rules and [`Options`]. It is represented by a
//! [`LogfilesConfig`].
//!
//! ### Pattern rule
//!
//! A "pattern rule" is a [`Severity`] and a regular expression, plus
//! optional sub-rules (ok patterns, context patterns, continuations,
//! rewrites). It is represented by a [`PatternRule`].
//!
//! ### Cluster
//!
//! A "cluster" is a named group of source IPs sharing one status file.
//! It is represented by a [`ClusterConfig`].
//!
//! ### Status cursor
//!
//! A "status cursor" is the `(offset, inode)` pair tracking how much of a
//! file has already been reported. It is represented by a [`Cursor`].
//!
//! [`Options`]: crate::data::options::Options
//! [`LogfilesConfig`]: crate::data::config::LogfilesConfig
//! [`PatternRule`]: crate::data::config::PatternRule
//! [`ClusterConfig`]: crate::data::config::ClusterConfig
//! [`Severity`]: crate::data::severity::Severity
//! [`Cursor`]: crate::data::status::Cursor

pub mod config;
pub mod options;
pub mod severity;
pub mod status;
