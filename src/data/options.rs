// src/data/options.rs

//! Implements [`Options`], the per-logfile-block processing limits and
//! switches set by `key=value` tokens in the configuration.

use crate::common::{Count, FileSz};
use crate::data::severity::Severity;

use std::fmt;
use std::io::{Error, ErrorKind, Result};
use std::time::Duration;

use ::regex::{Regex, RegexBuilder};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Default for [`Options::maxoutputsize`], in bytes.
pub const MAXOUTPUTSIZE_DEFAULT: usize = 500_000;

/// Default for [`Options::overflow`].
pub const OVERFLOW_DEFAULT: Severity = Severity::Critical;

/// Processing limits and switches for one logfile block.
///
/// A `None` limit is unbounded.
#[derive(Clone, Debug)]
pub struct Options {
    /// Maximum bytes read from the new region of a file per run.
    pub maxfilesize: Option<FileSz>,
    /// Maximum lines read from a file per run.
    pub maxlines: Option<Count>,
    /// Maximum time spent on a file per run. Checked periodically.
    pub maxtime: Option<Duration>,
    /// Lines longer than this many characters are truncated.
    pub maxlinesize: Option<usize>,
    /// Only files with a matching path are processed.
    pub regex: Option<Regex>,
    /// Severity reported when a limit is hit or a line is truncated.
    pub overflow: Severity,
    /// Drop unclassified context lines.
    pub nocontext: bool,
    /// Maximum bytes of content output per file per run.
    pub maxoutputsize: usize,
    /// Read a never-seen file from its beginning. If `false` a never-seen
    /// file starts at its current end.
    pub fromstart: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            maxfilesize: None,
            maxlines: None,
            maxtime: None,
            maxlinesize: None,
            regex: None,
            overflow: OVERFLOW_DEFAULT,
            nocontext: false,
            maxoutputsize: MAXOUTPUTSIZE_DEFAULT,
            fromstart: true,
        }
    }
}

/// Helper to create the error for a bad option value.
fn error_bad_value(
    opt_str: &str,
    reason: &str,
) -> Error {
    Error::new(
        ErrorKind::InvalidData,
        format!("Invalid option {:?}: {}", opt_str, reason),
    )
}

/// Parse `true` or `false`, any case.
fn parse_bool(
    opt_str: &str,
    value: &str,
) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(error_bad_value(opt_str, "expected true or false")),
    }
}

/// Parse a non-negative integer.
fn parse_count<T: std::str::FromStr>(
    opt_str: &str,
    value: &str,
) -> Result<T> {
    match value.parse::<T>() {
        Ok(val) => Ok(val),
        Err(_) => Err(error_bad_value(opt_str, "expected a non-negative integer")),
    }
}

impl Options {
    /// Apply one `key=value` option token.
    ///
    /// Returns `Ok(false)` if `key` is unknown; unknown keys are left for the
    /// caller to warn about and are otherwise ignored.
    /// Returns `Err` for a malformed value of a known key.
    pub fn set_opt(
        &mut self,
        opt_str: &str,
    ) -> Result<bool> {
        defn!("({:?})", opt_str);
        let (key, value) = match opt_str.split_once('=') {
            Some(val) => val,
            None => {
                defx!("no '='");
                return Err(error_bad_value(opt_str, "expected key=value"));
            }
        };
        match key {
            "maxfilesize" => self.maxfilesize = Some(parse_count::<FileSz>(opt_str, value)?),
            "maxlines" => self.maxlines = Some(parse_count::<Count>(opt_str, value)?),
            "maxlinesize" => self.maxlinesize = Some(parse_count::<usize>(opt_str, value)?),
            "maxoutputsize" => self.maxoutputsize = parse_count::<usize>(opt_str, value)?,
            "maxtime" => {
                let seconds: f64 = match value.parse::<f64>() {
                    Ok(val) => val,
                    Err(_) => return Err(error_bad_value(opt_str, "expected non-negative seconds")),
                };
                // rejects values a `Duration` cannot hold
                match Duration::try_from_secs_f64(seconds) {
                    Ok(val) => self.maxtime = Some(val),
                    Err(err) => return Err(error_bad_value(opt_str, &err.to_string())),
                }
            }
            "overflow" => {
                let mut chars = value.chars();
                let severity = match (chars.next(), chars.next()) {
                    (Some(c), None) => Severity::from_letter(c),
                    _ => None,
                };
                match severity {
                    Some(val) => self.overflow = val,
                    None => return Err(error_bad_value(opt_str, "expected one of C W I O")),
                }
            }
            "nocontext" => self.nocontext = parse_bool(opt_str, value)?,
            "fromstart" => self.fromstart = parse_bool(opt_str, value)?,
            "regex" | "iregex" => {
                let regex = RegexBuilder::new(value)
                    .case_insensitive(key == "iregex")
                    .build();
                match regex {
                    Ok(val) => self.regex = Some(val),
                    Err(err) => return Err(error_bad_value(opt_str, &err.to_string())),
                }
            }
            _ => {
                defx!("unknown key {:?}", key);
                return Ok(false);
            }
        }
        defx!("{:?}", self);

        Ok(true)
    }

    /// The `maxtime` limit.
    pub fn maxtime_duration(&self) -> Option<Duration> {
        self.maxtime
    }

    /// Does `path` pass the `regex` filter? No filter passes every path.
    pub fn path_allowed(
        &self,
        path: &str,
    ) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => true,
        }
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Options{{maxfilesize={:?}, maxlines={:?}, maxtime={:?}, maxlinesize={:?}, regex={:?}, overflow={}, nocontext={}, maxoutputsize={}, fromstart={}}}",
            self.maxfilesize,
            self.maxlines,
            self.maxtime,
            self.maxlinesize,
            self.regex.as_ref().map(|r| r.as_str()),
            self.overflow,
            self.nocontext,
            self.maxoutputsize,
            self.fromstart,
        )
    }
}
