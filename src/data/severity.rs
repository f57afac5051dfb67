// src/data/severity.rs

//! Implements [`Severity`], the classification outcome of a log line.

use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Severity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Output prefix for unclassified context lines.
pub const CONTEXT_LETTER: char = '.';

/// Classification of a log line by a [`PatternRule`].
///
/// [`PatternRule`]: crate::data::config::PatternRule
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Severity {
    /// `C`
    Critical,
    /// `W`
    Warning,
    /// `O`
    Ok,
    /// `I`, the line is dropped entirely.
    Ignore,
}

impl Severity {
    /// Map a severity letter to a `Severity`.
    ///
    /// Returns `None` for anything but `C`, `W`, `O`, `I`.
    pub const fn from_letter(letter: char) -> Option<Severity> {
        match letter {
            'C' => Some(Severity::Critical),
            'W' => Some(Severity::Warning),
            'O' => Some(Severity::Ok),
            'I' => Some(Severity::Ignore),
            _ => None,
        }
    }

    /// Map a severity letter to a `Severity`, unknown letters are treated
    /// as [`Severity::Ok`].
    pub const fn from_letter_lenient(letter: char) -> Severity {
        match Severity::from_letter(letter) {
            Some(severity) => severity,
            None => Severity::Ok,
        }
    }

    pub const fn letter(&self) -> char {
        match self {
            Severity::Critical => 'C',
            Severity::Warning => 'W',
            Severity::Ok => 'O',
            Severity::Ignore => 'I',
        }
    }

    /// Numeric level used to find the worst line of a batch.
    /// `Ignore` ranks with unmatched context lines.
    pub const fn level(&self) -> i8 {
        match self {
            Severity::Critical => 2,
            Severity::Warning => 1,
            Severity::Ok => 0,
            Severity::Ignore => LEVEL_CONTEXT,
        }
    }

    /// `Critical` or `Warning`; the severities an ok-pattern may demote.
    pub const fn is_problem(&self) -> bool {
        matches!(self, Severity::Critical | Severity::Warning)
    }
}

/// Level of a line that matched no pattern.
pub const LEVEL_CONTEXT: i8 = -1;

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
