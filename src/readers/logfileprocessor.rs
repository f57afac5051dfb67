// src/readers/logfileprocessor.rs

//! Classify the lines appended to log files since the last run and render
//! the `logwatch` section text.
//!
//! For each file a header is emitted:
//!
//! ```text
//! [[[/var/log/messages]]]
//! ```
//!
//! or `[[[/var/log/messages:cannotopen]]]` if the file cannot be opened.
//! The header is followed by one line per message, prefixed by a severity
//! letter and a space:
//!
//! ```text
//! C Fail event detected on /dev/md0
//! . context line
//! W mdadm[1234]: Rebuild20 event detected
//! ```
//!
//! Message lines of a file are only emitted if at least one is a `C`, `W`
//! or `O` line, or if a processing limit was hit. Otherwise the header
//! stands alone.
//!
//! The processing limits of [`Options`] are checked per line in this order:
//! `maxtime`, `maxlines`, `maxfilesize`, then `maxlinesize` truncation.
//! A stopping limit leaves the file offset at the end of the last whole
//! line handed out, so the next run resumes there.
//!
//! [`Options`]: crate::data::options::Options

use crate::common::{
    metadata_to_inode,
    Count,
    FPath,
    FPaths,
    FileId,
    FileOffset,
    FileSz,
    Inode,
    CONTINUATION_SEP,
    INODE_UNKNOWN,
    NLc,
};
use crate::data::config::{Continuation, LogfilesConfig, PatternRule};
use crate::data::options::Options;
use crate::data::severity::{Severity, CONTEXT_LETTER, LEVEL_CONTEXT};
use crate::data::status::{Cursor, StatusMap};
#[cfg(any(debug_assertions, test))]
use crate::debug::printers::str_to_String_noraw;
use crate::readers::fileresolver::{pattern_names, resolve_with_ids};
use crate::readers::loglinesiter::{ByteSource, LogLinesIter};
use crate::readers::statusstore::garbage_collect;
use crate::{de_wrn, e_wrn};

use std::collections::HashSet;
use std::fs::File;
use std::io::Result;
use std::time::{Duration, Instant};

#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// output formatting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// First line of the agent section.
pub const SECTION_HEADER: &str = "<<<logwatch>>>";

/// `maxtime` is checked when the count of lines read modulo this…
pub const MAXTIME_CHECK_INTERVAL: Count = 100;
/// …equals this.
pub const MAXTIME_CHECK_AT: Count = 10;

/// Appended to a line cut at `maxlinesize` characters.
pub const TRUNCATED_SUFFIX: &str = "[TRUNCATED]";

/// Replaces [`CONTINUATION_SEP`] in debug output.
pub const DEBUG_CONTINUATION: &str = "\nCONT:";

/// Return the header line of a file.
pub fn header_line(path: &str) -> String {
    format!("[[[{}]]]\n", path)
}

/// Return the header line of a file that could not be opened.
pub fn header_line_cannotopen(path: &str) -> String {
    format!("[[[{}:cannotopen]]]\n", path)
}

/// Return a message line, `<letter> <text>`.
fn message_line(
    letter: char,
    text: &str,
) -> String {
    format!("{} {}\n", letter, text)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Result of [`classify`]; the winning rule and the severity after ok
/// demotion.
#[derive(Clone, Copy, Debug)]
pub struct Classified<'a> {
    pub rule_index: usize,
    pub rule: &'a PatternRule,
    pub severity: Severity,
    /// the rule severity was `C` or `W` and an ok pattern matched
    pub demoted: bool,
}

/// Find the first rule matching `text`.
///
/// A `Critical` or `Warning` match is demoted to `Ok` if any of the rule's
/// ok patterns also matches.
pub fn classify<'a>(
    text: &str,
    patterns: &'a [PatternRule],
) -> Option<Classified<'a>> {
    let (rule_index, rule) = patterns
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.regex.is_match(text))?;
    let demoted: bool = rule.severity.is_problem()
        && rule
            .ok_patterns
            .iter()
            .any(|ok_pattern| ok_pattern.is_match(text));
    let severity = if demoted { Severity::Ok } else { rule.severity };

    Some(Classified {
        rule_index,
        rule,
        severity,
        demoted,
    })
}

/// Expand one rewrite `template`; `\0` is `text`, `\1`… are the capture
/// `groups` of the matching rule. Groups that did not participate expand to
/// nothing. A `\` not followed by a digit is kept.
pub fn expand_rewrite(
    template: &str,
    text: &str,
    groups: &[Option<String>],
) -> String {
    let mut expanded = String::with_capacity(template.len() + text.len());
    let mut chars = template.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '\\' {
            expanded.push(c);
            continue;
        }
        let mut index: Option<usize> = None;
        while let Some((_, digit)) = chars.peek() {
            match digit.to_digit(10) {
                Some(d) => {
                    index = Some(index.unwrap_or(0) * 10 + d as usize);
                    chars.next();
                }
                None => break,
            }
        }
        match index {
            None => expanded.push(c),
            Some(0) => expanded.push_str(text),
            Some(n) => {
                if let Some(Some(group)) = groups.get(n - 1) {
                    expanded.push_str(group);
                }
            }
        }
    }

    expanded
}

/// Strip the line terminator of a line returned by [`LogLinesIter`].
fn strip_newline(mut line: String) -> String {
    while line.ends_with(NLc) || line.ends_with('\r') {
        line.pop();
    }

    line
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Batch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The message lines of one file in one run.
#[derive(Debug)]
struct Batch {
    lines: Vec<String>,
    /// highest [`Severity::level`] seen
    worst: i8,
    /// a limit marker was emitted
    marked: bool,
    /// bytes of `lines`
    size: usize,
    maxoutputsize: usize,
    overflow: Severity,
    /// `maxoutputsize` was reached, later lines are dropped
    capped: bool,
}

impl Batch {
    fn new(options: &Options) -> Batch {
        Batch {
            lines: Vec::new(),
            worst: LEVEL_CONTEXT,
            marked: false,
            size: 0,
            maxoutputsize: options.maxoutputsize,
            overflow: options.overflow,
            capped: false,
        }
    }

    /// Add a message line unless `maxoutputsize` was reached.
    fn push(
        &mut self,
        letter: char,
        text: &str,
    ) {
        if self.capped {
            return;
        }
        let line: String = message_line(letter, text);
        if self.size + line.len() > self.maxoutputsize {
            defo!("maxoutputsize {} reached at {} bytes", self.maxoutputsize, self.size);
            self.capped = true;
            self.mark(format!(
                "Maximum output size ({} bytes) exceeded, further messages suppressed.",
                self.maxoutputsize
            ));
            return;
        }
        self.size += line.len();
        self.lines.push(line);
    }

    /// Add a limit marker line; markers are not subject to `maxoutputsize`.
    fn mark(
        &mut self,
        message: String,
    ) {
        defo!("{}", message);
        self.marked = true;
        self.worst = std::cmp::max(self.worst, self.overflow.level());
        self.lines.push(message_line(self.overflow.letter(), &message));
    }

    fn note_severity(
        &mut self,
        severity: Severity,
    ) {
        self.worst = std::cmp::max(self.worst, severity.level());
    }

    /// The lines to emit after the file header.
    fn into_lines(self) -> Vec<String> {
        if self.worst > LEVEL_CONTEXT || self.marked {
            self.lines
        } else {
            defo!("no C W O line, drop {} context lines", self.lines.len());
            Vec::new()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// processing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Append the lines following a matched line to `text` according to the
/// rule's continuations. Continuation lines are not subject to limits.
fn collect_continuations<S: ByteSource>(
    iter: &mut LogLinesIter<S>,
    rule: &PatternRule,
    text: &mut String,
) -> Result<()> {
    for continuation in rule.continuations.iter() {
        match continuation {
            Continuation::Lines(count) => {
                for _ in 0..*count {
                    let line = match iter.next_line()? {
                        Some(val) => strip_newline(val),
                        None => break,
                    };
                    text.push(CONTINUATION_SEP);
                    text.push_str(&line);
                }
            }
            Continuation::Pattern(regex) => {
                while let Some(line) = iter.next_line()? {
                    let stripped: &str = line.trim_end_matches(&['\r', '\n'][..]);
                    if !regex.is_match(stripped) {
                        iter.push_back_line(line);
                        break;
                    }
                    text.push(CONTINUATION_SEP);
                    text.push_str(stripped);
                }
            }
        }
    }

    Ok(())
}

/// Which limit stopped reading, if any.
fn check_stopping_limits(
    options: &Options,
    lines_read: Count,
    region_read: FileSz,
    started: &Instant,
    maxtime: Option<Duration>,
) -> Option<String> {
    if let Some(maxtime) = maxtime {
        if lines_read % MAXTIME_CHECK_INTERVAL == MAXTIME_CHECK_AT && started.elapsed() > maxtime {
            return Some(format!(
                "Maximum parse time ({:.1} sec) exceeded.",
                maxtime.as_secs_f64()
            ));
        }
    }
    if let Some(maxlines) = options.maxlines {
        if lines_read > maxlines {
            return Some(format!(
                "Maximum number ({}) of new log messages exceeded.",
                maxlines
            ));
        }
    }
    if let Some(maxfilesize) = options.maxfilesize {
        // the first line is always consumed
        if lines_read > 1 && region_read > maxfilesize {
            return Some(format!(
                "Maximum allowed logfile size ({} bytes) exceeded.",
                maxfilesize
            ));
        }
    }

    None
}

/// Read and classify all lines of `iter` from its current position.
///
/// Returns the message lines to emit after the file header. Afterwards
/// `iter.get_position()` is the offset to resume at next run.
/// A read error ends processing early; lines read so far are kept.
pub fn process_lines<S: ByteSource>(
    iter: &mut LogLinesIter<S>,
    patterns: &[PatternRule],
    options: &Options,
    debug: bool,
) -> Vec<String> {
    defn!("({:?}, {} patterns, {})", iter.path(), patterns.len(), options);
    let started = Instant::now();
    let maxtime: Option<Duration> = options.maxtime_duration();
    let region_start: FileOffset = iter.get_position();
    let mut lines_read: Count = 0;
    let mut batch = Batch::new(options);

    loop {
        let line: String = match iter.next_line() {
            Ok(Some(val)) => val,
            Ok(None) => break,
            Err(err) => {
                e_wrn!("error reading {:?} at {}: {}", iter.path(), iter.get_position(), err);
                break;
            }
        };
        lines_read += 1;
        let region_read: FileSz = iter.get_position() - region_start;
        if let Some(message) = check_stopping_limits(options, lines_read, region_read, &started, maxtime) {
            iter.push_back_line(line);
            batch.mark(message);
            break;
        }

        let mut text: String = strip_newline(line);
        let mut truncated: bool = false;
        if let Some(maxlinesize) = options.maxlinesize {
            if let Some((cut, _)) = text.char_indices().nth(maxlinesize) {
                text.truncate(cut);
                text.push_str(TRUNCATED_SUFFIX);
                truncated = true;
            }
        }

        let classified = classify(&text, patterns);
        let mut severity: Option<Severity> = classified.as_ref().map(|c| c.severity);
        if let Some(classified) = classified.as_ref() {
            let rule = classified.rule;
            let groups: Vec<Option<String>> = if rule.rewrites.is_empty() {
                Vec::new()
            } else {
                match rule.regex.captures(&text) {
                    Some(captures) => captures
                        .iter()
                        .skip(1)
                        .map(|group| group.map(|m| m.as_str().to_string()))
                        .collect(),
                    None => Vec::new(),
                }
            };
            let explain: Vec<String> = if debug {
                explain_match(classified, &text)
            } else {
                Vec::new()
            };
            if let Err(err) = collect_continuations(iter, rule, &mut text) {
                e_wrn!("error reading {:?} at {}: {}", iter.path(), iter.get_position(), err);
            }
            for template in rule.rewrites.iter() {
                text = expand_rewrite(template, &text, &groups);
            }
            for line in explain.iter() {
                batch.push(CONTEXT_LETTER, line);
            }
        }
        if truncated {
            severity = Some(options.overflow);
        }
        if debug {
            text = text.replace(CONTINUATION_SEP, DEBUG_CONTINUATION);
        }

        match severity {
            Some(Severity::Ignore) => {
                defñ!("ignore {:?}", str_to_String_noraw(&text));
            }
            Some(severity) => {
                batch.note_severity(severity);
                batch.push(severity.letter(), &text);
            }
            None => {
                if !options.nocontext {
                    batch.push(CONTEXT_LETTER, &text);
                }
            }
        }
    }
    let lines = batch.into_lines();
    defx!("read {} lines, emit {} lines, position {}", lines_read, lines.len(), iter.get_position());

    lines
}

/// Debug lines naming the rule that matched `text` and the context
/// patterns that also match.
fn explain_match(
    classified: &Classified,
    text: &str,
) -> Vec<String> {
    let rule = classified.rule;
    let mut lines: Vec<String> = vec![format!(
        "[explain] rule {} {} {:?} matched",
        classified.rule_index + 1,
        rule.severity,
        rule.regex.as_str(),
    )];
    if classified.demoted {
        for ok_pattern in rule.ok_patterns.iter().filter(|p| p.is_match(text)) {
            lines.push(format!("[explain] demoted to O by {:?}", ok_pattern.as_str()));
        }
    }
    for context_pattern in rule
        .context_patterns
        .iter()
        .filter(|p| p.is_match(text))
    {
        lines.push(format!("[explain] context {:?}", context_pattern.as_str()));
    }

    lines
}

/// Return the offset to start reading a file at.
///
/// The stored offset is used if the stored inode matches `inode` (or is
/// unknown). A different inode means the file was rotated and is read from
/// the beginning. A never-seen file starts at the beginning, or at its
/// current end if `fromstart` is off.
fn start_offset(
    stored: Option<&Cursor>,
    inode: Inode,
    options: &Options,
) -> Option<FileOffset> {
    match stored {
        Some(cursor) if cursor.inode == inode || cursor.inode == INODE_UNKNOWN => {
            Some(cursor.offset)
        }
        Some(_cursor) => {
            defo!("inode changed {} → {}, rotated", _cursor.inode, inode);
            Some(0)
        }
        None if options.fromstart => Some(0),
        // start at the end
        None => None,
    }
}

/// Process the new lines of the file at `path` and update its `status`
/// entry.
///
/// Returns the header followed by the message lines. A file that cannot be
/// opened returns only a `cannotopen` header and its status entry is left
/// untouched.
pub fn process_logfile(
    path: &FPath,
    patterns: &[PatternRule],
    options: &Options,
    status: &mut StatusMap,
    debug: bool,
) -> Vec<String> {
    defn!("({:?})", path);
    let opened = File::open(path).and_then(|file| {
        let inode: Inode = metadata_to_inode(&file.metadata()?);
        let iter = LogLinesIter::new(file, path.clone())?;
        Ok((iter, inode))
    });
    let (mut iter, inode) = match opened {
        Ok(val) => val,
        Err(_err) => {
            defx!("cannot open {:?}: {}", path, _err);
            return vec![header_line_cannotopen(path)];
        }
    };
    let positioned = match start_offset(status.get(path), inode, options) {
        Some(offset) => iter.set_position(offset),
        None => iter.skip_remaining(),
    };
    if let Err(err) = positioned {
        de_wrn!("cannot seek {:?}: {}", path, err);
        defx!("cannot seek");
        return vec![header_line_cannotopen(path)];
    }
    defo!("{:?} start at {} encoding {}", path, iter.get_position(), iter.encoding());

    let mut output: Vec<String> = vec![header_line(path)];
    output.extend(process_lines(&mut iter, patterns, options, debug));
    let cursor = Cursor::new(iter.get_position(), inode);
    defx!("{:?} new status {}", path, cursor);
    status.insert(path.clone(), cursor);

    output
}

/// Tracked files of `status` that a block names but that no longer exist.
fn vanished_files(
    logfiles_configs: &[LogfilesConfig],
    status: &StatusMap,
    seen_paths: &HashSet<FPath>,
) -> FPaths {
    status
        .keys()
        .filter(|fpath| !seen_paths.contains(*fpath))
        .filter(|fpath| {
            logfiles_configs.iter().any(|config| {
                config.options.path_allowed(fpath)
                    && config
                        .files
                        .iter()
                        .any(|pattern| pattern_names(pattern, fpath))
            })
        })
        .filter(|fpath| std::fs::symlink_metadata(fpath.as_str()).is_err())
        .cloned()
        .collect()
}

/// Process every file matched by every logfiles block, in configuration
/// order.
///
/// A file matched by several patterns or blocks, through any path, is
/// processed once, by the first block whose path filter allows it.
/// A tracked file that a block names but that has vanished gets one
/// `cannotopen` header.
/// Afterwards `status` holds only the files matched in this run.
pub fn process_configs(
    logfiles_configs: &[LogfilesConfig],
    status: &mut StatusMap,
    debug: bool,
) -> Vec<String> {
    defn!("({} blocks)", logfiles_configs.len());
    let mut output: Vec<String> = Vec::new();
    let mut seen_ids: HashSet<FileId> = HashSet::new();
    let mut seen_paths: HashSet<FPath> = HashSet::new();

    for config in logfiles_configs.iter() {
        for pattern in config.files.iter() {
            for (fpath, fileid) in resolve_with_ids(pattern) {
                if seen_ids.contains(&fileid) {
                    defo!("already processed {:?}", fpath);
                    continue;
                }
                if !config.options.path_allowed(&fpath) {
                    defo!("path filter rejects {:?}", fpath);
                    continue;
                }
                seen_ids.insert(fileid);
                seen_paths.insert(fpath.clone());
                output.extend(process_logfile(&fpath, &config.patterns, &config.options, status, debug));
            }
        }
    }
    for fpath in vanished_files(logfiles_configs, status, &seen_paths) {
        defo!("vanished {:?}", fpath);
        output.push(header_line_cannotopen(&fpath));
    }
    garbage_collect(status, &seen_paths);
    defx!("{} lines, {} files", output.len(), seen_paths.len());

    output
}
