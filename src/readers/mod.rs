// src/readers/mod.rs

//! "Readers" for _mklwlib_.
//!
//! ## Overview of readers
//!
//! * [`configreader`] reads the configuration files into
//!   [`LogfilesConfig`s] and [`ClusterConfig`s].
//! * [`statusstore`] loads and saves the [`StatusMap`] and decides which
//!   status file belongs to this run.
//! * [`fileresolver`] expands the glob patterns of a logfiles block into
//!   files.
//! * A [`LogLinesIter`] reads decoded lines of one file from a byte offset.
//! * [`logfileprocessor`] drives a `LogLinesIter` per file, classifies the
//!   lines, and advances the status cursors.
//!
//! <br/>
//!
//! The _mk_logwatch_ binary program reads the configuration, loads the
//! status, calls [`process_configs`] once, and saves the status.
//!
//! <br/>
//!
//! _These are not rust "Readers"; these structs do not implement the trait
//! [`Read`]. These are "readers" in an informal sense._
//!
//! [`Read`]: std::io::Read
//! [`LogfilesConfig`s]: crate::data::config::LogfilesConfig
//! [`ClusterConfig`s]: crate::data::config::ClusterConfig
//! [`StatusMap`]: crate::data::status::StatusMap
//! [`LogLinesIter`]: crate::readers::loglinesiter::LogLinesIter
//! [`process_configs`]: crate::readers::logfileprocessor::process_configs

pub mod configreader;
pub mod fileresolver;
pub mod helpers;
pub mod logfileprocessor;
pub mod loglinesiter;
pub mod statusstore;
