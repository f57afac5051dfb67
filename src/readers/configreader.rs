// src/readers/configreader.rs

//! Functions to find, read, and parse the `mk_logwatch` configuration into
//! [`LogfilesConfig`s] and [`ClusterConfig`s].
//!
//! The configuration is a main file `logwatch.cfg` plus fragment files
//! `logwatch.d/*.cfg`, read in that order as one sequence of lines.
//!
//! ```text
//! # global options apply to all following blocks
//! maxlines=500 nocontext=true
//!
//! /var/log/messages /var/log/*.log maxfilesize=1048576
//!  C Fail event detected on md device
//!  I mdadm.*: Rebuild.*event detected
//!  W mdadm\[
//!  W iregex=ata.*hard resetting link
//!  A ^\s+
//!
//! CLUSTER my_cluster
//!  192.168.1.1
//!  10.0.0.0/8
//! ```
//!
//! [`LogfilesConfig`s]: crate::data::config::LogfilesConfig
//! [`ClusterConfig`s]: crate::data::config::ClusterConfig

use crate::common::{FPath, FPaths};
use crate::data::config::{
    ClusterConfig,
    ClusterConfigs,
    Continuation,
    LogfilesConfig,
    LogfilesConfigs,
    PatternRule,
};
use crate::data::options::Options;
use crate::data::severity::Severity;
use crate::readers::helpers::path_to_fpath;
use crate::e_wrn;

use std::io::{Error, ErrorKind, Result};
use std::path::Path;

use ::regex::{Regex, RegexBuilder};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// config files
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Main configuration file name within the configuration directory.
pub const CONFIG_FILENAME: &str = "logwatch.cfg";

/// Fragment directory name within the configuration directory.
pub const CONFIG_FRAGMENT_DIRNAME: &str = "logwatch.d";

/// File extension of fragment files.
pub const CONFIG_FRAGMENT_EXT: &str = "cfg";

/// First token of a line starting a cluster block.
pub const CLUSTER_KEYWORD: &str = "CLUSTER";

/// Return the configuration files under `config_dir`; the main file first
/// (whether or not it exists) then fragment files in lexical order.
pub fn get_config_files(config_dir: &Path) -> FPaths {
    defn!("({:?})", config_dir);
    let mut files: FPaths = vec![path_to_fpath(&config_dir.join(CONFIG_FILENAME))];

    let fragment_dir = config_dir.join(CONFIG_FRAGMENT_DIRNAME);
    let mut fragments: FPaths = match std::fs::read_dir(&fragment_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map_or(false, |ext| ext == CONFIG_FRAGMENT_EXT)
            })
            .map(|path| path_to_fpath(&path))
            .collect(),
        Err(_err) => {
            defo!("read_dir({:?}) failed {}", fragment_dir, _err);
            FPaths::new()
        }
    };
    fragments.sort();
    files.extend(fragments);
    defx!("return {:?}", files);

    files
}

/// Is `line` a full-line comment?
fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Read all configuration `files` in order and return their lines with
/// trailing whitespace and full-line comments removed. Blank lines are kept.
///
/// The first file is the main configuration file; failing to read it is an
/// error. Unreadable fragment files are skipped with a warning.
pub fn iter_config_lines(files: &[FPath]) -> Result<Vec<String>> {
    defn!("({:?})", files);
    let mut lines: Vec<String> = Vec::new();
    for (index, file) in files.iter().enumerate() {
        let data: Vec<u8> = match std::fs::read(file) {
            Ok(val) => val,
            Err(err) if index == 0 => {
                defx!("main config {:?} unreadable {}", file, err);
                return Err(Error::new(
                    err.kind(),
                    format!("cannot read configuration file {:?}: {}", file, err),
                ));
            }
            Err(err) => {
                e_wrn!("skipping unreadable configuration file {:?}: {}", file, err);
                continue;
            }
        };
        let text = String::from_utf8_lossy(&data);
        for line in text.lines() {
            if is_comment(line) {
                continue;
            }
            lines.push(line.trim_end().to_string());
        }
    }
    defx!("return {} lines", lines.len());

    Ok(lines)
}

/// Read and parse all configuration `files`.
pub fn read_config(files: &[FPath]) -> Result<(LogfilesConfigs, ClusterConfigs)> {
    let lines = iter_config_lines(files)?;

    parse(&lines)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The block that indented lines currently attach to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Block {
    None,
    /// index into the returned `ClusterConfigs`
    Cluster(usize),
    /// index into the returned `LogfilesConfigs`
    Logfiles(usize),
}

/// Helper to create a configuration error naming the source line.
fn error_config(
    lineno: usize,
    line: &str,
    reason: &str,
) -> Error {
    Error::new(
        ErrorKind::InvalidData,
        format!("configuration line {} {:?}: {}", lineno, line, reason),
    )
}

/// Apply an option token, warning about unknown keys.
fn apply_option(
    options: &mut Options,
    token: &str,
    lineno: usize,
    line: &str,
) -> Result<()> {
    match options.set_opt(token) {
        Ok(true) => Ok(()),
        Ok(false) => {
            e_wrn!("ignoring unknown option {:?} in configuration line {}", token, lineno);
            Ok(())
        }
        Err(err) => Err(error_config(lineno, line, &err.to_string())),
    }
}

/// Compile a classification pattern. A leading `iregex=` compiles the rest
/// case-insensitive, a leading `regex=` is stripped.
fn compile_pattern(
    pattern: &str,
    lineno: usize,
    line: &str,
) -> Result<Regex> {
    let (source, case_insensitive) = if let Some(rest) = pattern.strip_prefix("iregex=") {
        (rest, true)
    } else if let Some(rest) = pattern.strip_prefix("regex=") {
        (rest, false)
    } else {
        (pattern, false)
    };
    match RegexBuilder::new(source)
        .case_insensitive(case_insensitive)
        .build()
    {
        Ok(val) => Ok(val),
        Err(err) => Err(error_config(
            lineno,
            line,
            &format!("invalid regular expression {:?}: {}", source, err),
        )),
    }
}

/// Parse an indented line of a logfiles block into `config`.
fn parse_pattern_line(
    config: &mut LogfilesConfig,
    lineno: usize,
    line: &str,
) -> Result<()> {
    let trimmed: &str = line.trim_start();
    let (level, argument): (&str, &str) = match trimmed.split_once(char::is_whitespace) {
        Some((level, rest)) => (level, rest.trim_start()),
        None => (trimmed, ""),
    };
    let mut chars = level.chars();
    let letter: char = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => {
            e_wrn!("unknown level {:?} in configuration line {}, treated as O", level, lineno);
            Severity::Ok.letter()
        }
    };
    defo!("letter {:?} argument {:?}", letter, argument);

    if letter == 'A' || letter == 'R' || letter == 'K' || letter == 'X' {
        let rule: &mut PatternRule = match config.patterns.last_mut() {
            Some(val) => val,
            None => {
                return Err(error_config(
                    lineno,
                    line,
                    "sub-rule without a preceding pattern",
                ))
            }
        };
        match letter {
            'A' => {
                let continuation = match argument.parse::<usize>() {
                    Ok(count) => Continuation::Lines(count),
                    Err(_) => Continuation::Pattern(compile_pattern(argument, lineno, line)?),
                };
                rule.continuations.push(continuation);
            }
            'R' => rule.rewrites.push(argument.to_string()),
            'K' => rule.ok_patterns.push(compile_pattern(argument, lineno, line)?),
            _ => rule.context_patterns.push(compile_pattern(argument, lineno, line)?),
        }
        return Ok(());
    }

    let severity = Severity::from_letter_lenient(letter);
    let regex = compile_pattern(argument, lineno, line)?;
    config.patterns.push(PatternRule::new(severity, regex));

    Ok(())
}

/// Parse configuration lines into logfiles blocks and cluster blocks.
///
/// `raw_lines` are expected as returned by [`iter_config_lines`]: comments
/// removed, trailing whitespace removed, blank lines kept.
pub fn parse<S: AsRef<str>>(raw_lines: &[S]) -> Result<(LogfilesConfigs, ClusterConfigs)> {
    defn!("({} lines)", raw_lines.len());
    let mut logfiles_configs = LogfilesConfigs::new();
    let mut cluster_configs = ClusterConfigs::new();
    let mut global_options = Options::default();
    let mut block = Block::None;

    for (index, raw_line) in raw_lines.iter().enumerate() {
        let line: &str = raw_line.as_ref();
        let lineno: usize = index + 1;

        if line.trim().is_empty() {
            if let Block::Cluster(_) = block {
                block = Block::None;
            }
            continue;
        }

        if let Block::Cluster(at) = block {
            cluster_configs[at]
                .ips_or_subnets
                .push(line.trim().to_string());
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            match block {
                Block::Logfiles(at) => {
                    parse_pattern_line(&mut logfiles_configs[at], lineno, line)?;
                }
                _ => {
                    return Err(error_config(
                        lineno,
                        line,
                        "pattern line without a preceding logfile line",
                    ));
                }
            }
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens[0] == CLUSTER_KEYWORD {
            let name: String = tokens[1..].join(" ");
            if name.is_empty() {
                return Err(error_config(lineno, line, "cluster without a name"));
            }
            defo!("CLUSTER {:?}", name);
            cluster_configs.push(ClusterConfig::new(name, Vec::new()));
            block = Block::Cluster(cluster_configs.len() - 1);
            continue;
        }

        let (option_tokens, file_tokens): (Vec<&str>, Vec<&str>) =
            tokens.into_iter().partition(|token| token.contains('='));
        if file_tokens.is_empty() {
            defo!("global options {:?}", option_tokens);
            for token in option_tokens {
                apply_option(&mut global_options, token, lineno, line)?;
            }
            block = Block::None;
            continue;
        }

        let mut options = global_options.clone();
        for token in option_tokens {
            apply_option(&mut options, token, lineno, line)?;
        }
        defo!("logfiles {:?}", file_tokens);
        let files: FPaths = file_tokens.into_iter().map(FPath::from).collect();
        logfiles_configs.push(LogfilesConfig::new(files, options));
        block = Block::Logfiles(logfiles_configs.len() - 1);
    }
    defx!("{} logfiles blocks, {} cluster blocks", logfiles_configs.len(), cluster_configs.len());

    Ok((logfiles_configs, cluster_configs))
}
