// src/readers/fileresolver.rs

//! Expand a logfile glob pattern into the set of regular files it matches.
//!
//! * `*`, `?`, `[…]` match within one path segment.
//! * `**` as a whole segment matches zero or more directory levels.
//!
//! Symlinks to files and to directories are followed. Symlink loops are
//! detected by [`walkdir`] and the walk depth is bounded.
//! Files reachable through several paths (symlinks, hardlinks) are returned
//! once, identified by device and inode, as canonical absolute paths.
//!
//! [`walkdir`]: https://docs.rs/walkdir/2.5.0/walkdir/

use crate::common::{metadata_to_fileid, FPath, FPaths, FileId};
use crate::readers::helpers::{has_glob_meta, path_to_fpath};
use crate::de_wrn;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ::glob::{MatchOptions, Pattern};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};
use ::walkdir::{DirEntry, WalkDir};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Maximum directory depth walked below the literal prefix of a pattern
/// containing `**`.
pub const RECURSIVE_DEPTH_MAX: usize = 32;

/// Pattern segment matching any number of directory levels.
const RECURSIVE_SEGMENT: &str = "**";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A resolved file; canonical path and filesystem identity.
pub type ResolvedFile = (FPath, FileId);
pub type ResolvedFiles = Vec<ResolvedFile>;

/// Split `pattern` into the longest leading directory without glob meta
/// characters and the remaining segments.
fn split_literal_prefix(pattern: &str) -> (PathBuf, Vec<&str>) {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal_count: usize = segments
        .iter()
        .take_while(|segment| !has_glob_meta(segment))
        .count();
    let base: String = segments[..literal_count].join("/");
    let base: PathBuf = if base.is_empty() {
        if pattern.starts_with('/') {
            PathBuf::from("/")
        } else {
            PathBuf::from(".")
        }
    } else {
        PathBuf::from(base)
    };
    let rest: Vec<&str> = segments[literal_count..]
        .iter()
        .copied()
        .filter(|segment| !segment.is_empty())
        .collect();

    (base, rest)
}

/// Stat `path` following symlinks; a regular file returns its canonical
/// path and identity.
fn resolve_regular_file(path: &Path) -> Option<ResolvedFile> {
    let metadata = match std::fs::metadata(path) {
        Ok(val) => val,
        Err(_err) => {
            defo!("metadata({:?}) failed {}", path, _err);
            return None;
        }
    };
    if !metadata.is_file() {
        return None;
    }
    let canonical: PathBuf = match std::fs::canonicalize(path) {
        Ok(val) => val,
        Err(_err) => {
            defo!("canonicalize({:?}) failed {}", path, _err);
            return None;
        }
    };

    Some((path_to_fpath(&canonical), metadata_to_fileid(&metadata)))
}

/// Resolve `pattern` to regular files, each with its identity.
///
/// Sorted by path. An invalid pattern or a pattern without matches returns
/// nothing.
pub fn resolve_with_ids(pattern: &str) -> ResolvedFiles {
    defn!("({:?})", pattern);
    let mut resolved = ResolvedFiles::new();
    let mut seen: HashSet<FileId> = HashSet::new();

    if !has_glob_meta(pattern) {
        if let Some(file) = resolve_regular_file(Path::new(pattern)) {
            resolved.push(file);
        }
        defx!("literal path, return {:?}", resolved);
        return resolved;
    }

    let (base, rest) = split_literal_prefix(pattern);
    defo!("base {:?} rest {:?}", base, rest);
    let rest_pattern: Pattern = match Pattern::new(&rest.join("/")) {
        Ok(val) => val,
        Err(err) => {
            de_wrn!("invalid glob pattern {:?}: {}", pattern, err);
            defx!("invalid pattern");
            return resolved;
        }
    };
    // per-segment patterns up to the first `**`, used to prune the walk
    let mut segment_patterns: Vec<Pattern> = Vec::with_capacity(rest.len());
    for segment in rest.iter() {
        if *segment == RECURSIVE_SEGMENT {
            break;
        }
        match Pattern::new(segment) {
            Ok(val) => segment_patterns.push(val),
            Err(_) => break,
        }
    }
    let recursive: bool = rest.iter().any(|segment| segment.contains(RECURSIVE_SEGMENT));
    let max_depth: usize = if recursive { RECURSIVE_DEPTH_MAX } else { rest.len() };
    defo!("recursive {} max_depth {}", recursive, max_depth);

    let prune_segments = segment_patterns.len();
    let walker = WalkDir::new(&base)
        .follow_links(true)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry: &DirEntry| {
            // a directory at depth `d` is named by segment `d - 1`
            let depth = entry.depth();
            if depth == 0 || depth > prune_segments || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            segment_patterns[depth - 1].matches_with(&name, MATCH_OPTIONS)
        });

    for entry in walker {
        let entry: DirEntry = match entry {
            Ok(val) => val,
            Err(_err) => {
                // includes symlink loops
                defo!("walk error {}", _err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let relative: &Path = match entry.path().strip_prefix(&base) {
            Ok(val) => val,
            Err(_) => continue,
        };
        if !rest_pattern.matches_path_with(relative, MATCH_OPTIONS) {
            continue;
        }
        if let Some((fpath, fileid)) = resolve_regular_file(entry.path()) {
            if seen.insert(fileid) {
                defo!("match {:?} {:?}", fpath, fileid);
                resolved.push((fpath, fileid));
            } else {
                defo!("duplicate identity {:?} for {:?}", fileid, entry.path());
            }
        }
    }
    resolved.sort();
    defx!("return {} files", resolved.len());

    resolved
}

/// Resolve `pattern` to the canonical paths of the regular files it
/// matches, one path per filesystem identity, sorted.
pub fn resolve(pattern: &str) -> FPaths {
    resolve_with_ids(pattern)
        .into_iter()
        .map(|(fpath, _)| fpath)
        .collect()
}

/// Does `pattern` name `path`, whether or not `path` exists?
///
/// A pattern without glob meta characters names only itself.
pub fn pattern_names(
    pattern: &str,
    path: &str,
) -> bool {
    if !has_glob_meta(pattern) {
        return pattern == path;
    }
    match Pattern::new(pattern) {
        Ok(val) => val.matches_with(path, MATCH_OPTIONS),
        Err(_) => false,
    }
}
