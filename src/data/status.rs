// src/data/status.rs

//! Implements [`Cursor`] and [`StatusMap`], how much of each log file has
//! already been reported.

use crate::common::{FPath, FileOffset, Inode};

use std::collections::BTreeMap;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The status cursor of one file: the byte offset already reported and the
/// inode the offset refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Cursor {
    pub offset: FileOffset,
    pub inode: Inode,
}

impl Cursor {
    pub const fn new(
        offset: FileOffset,
        inode: Inode,
    ) -> Cursor {
        Cursor { offset, inode }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.offset, self.inode)
    }
}

/// Map absolute file path to its [`Cursor`].
///
/// Ordered so a saved status file is stable between runs.
pub type StatusMap = BTreeMap<FPath, Cursor>;
