// src/data/config.rs

//! Parsed configuration: [`LogfilesConfig`] blocks with their
//! [`PatternRule`]s, and [`ClusterConfig`] blocks.
//!
//! Created by [`configreader::parse`] and read-only afterwards.
//!
//! [`configreader::parse`]: crate::readers::configreader::parse

use crate::common::FPaths;
use crate::data::options::Options;
use crate::data::severity::Severity;

use ::regex::Regex;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A named group of IP addresses or subnets sharing one status file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterConfig {
    pub name: String,
    /// IP literals or CIDR subnets, in configuration order.
    pub ips_or_subnets: Vec<String>,
}

impl ClusterConfig {
    pub fn new(
        name: String,
        ips_or_subnets: Vec<String>,
    ) -> ClusterConfig {
        ClusterConfig {
            name,
            ips_or_subnets,
        }
    }
}

pub type ClusterConfigs = Vec<ClusterConfig>;

/// How a matched line collects following lines into one message.
#[derive(Clone, Debug)]
pub enum Continuation {
    /// Append exactly this many following lines.
    Lines(usize),
    /// Append following lines as long as they match.
    Pattern(Regex),
}

/// One classification rule of a logfile block.
///
/// Rules are tested in configuration order and the first rule whose
/// `regex` matches wins.
#[derive(Clone, Debug)]
pub struct PatternRule {
    pub severity: Severity,
    pub regex: Regex,
    /// A `Critical` or `Warning` match that also matches any of these is
    /// demoted to `Ok`.
    pub ok_patterns: Vec<Regex>,
    /// Only used to explain a match in debug output.
    pub context_patterns: Vec<Regex>,
    pub continuations: Vec<Continuation>,
    /// Rewrite templates; `\0` is the whole line, `\1`… are capture groups.
    pub rewrites: Vec<String>,
}

impl PatternRule {
    pub fn new(
        severity: Severity,
        regex: Regex,
    ) -> PatternRule {
        PatternRule {
            severity,
            regex,
            ok_patterns: Vec::new(),
            context_patterns: Vec::new(),
            continuations: Vec::new(),
            rewrites: Vec::new(),
        }
    }
}

pub type PatternRules = Vec<PatternRule>;

/// A block of glob patterns sharing classification rules and options.
#[derive(Clone, Debug, Default)]
pub struct LogfilesConfig {
    /// Glob patterns, in configuration order.
    pub files: FPaths,
    pub patterns: PatternRules,
    pub options: Options,
}

impl LogfilesConfig {
    pub fn new(
        files: FPaths,
        options: Options,
    ) -> LogfilesConfig {
        LogfilesConfig {
            files,
            patterns: PatternRules::new(),
            options,
        }
    }
}

pub type LogfilesConfigs = Vec<LogfilesConfig>;
