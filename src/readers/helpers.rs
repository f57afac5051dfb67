// src/readers/helpers.rs

//! Miscellaneous helper functions for _Readers_.

use crate::common::FPath;

use std::path::Path;

/// Helper function for a slightly annoying set of calls.
pub fn path_to_fpath(path: &Path) -> FPath {
    // `PathBuf` to `String` https://stackoverflow.com/q/37388107/471376
    (*(path.to_string_lossy())).to_string()
}

/// Does `s` contain any glob meta character?
pub fn has_glob_meta(s: &str) -> bool {
    s.contains(&['*', '?', '['][..])
}
