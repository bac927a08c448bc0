//! Grammar construction errors
//!
//! All errors in this module are fatal build-time errors: a malformed
//! pattern, an unresolved name reference, or an illegal quantifier
//! construction. Match-time failure is not an error; it is reported as
//! `success = false` plus a failure offset on [`crate::MatcherResult`].

use std::fmt;

/// Error produced while compiling a grammar into a live matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// Malformed pattern text in the pattern mini-language
    PatternSyntax {
        /// The pattern source text
        pattern: String,
        /// Byte offset into the pattern text where compilation failed
        position: usize,
        /// What went wrong
        message: String,
    },

    /// A `*`, `+` or counted repetition wraps a pattern that can only
    /// match zero characters (such as a negation), which would loop forever
    InfiniteQuantifier {
        /// The offending pattern source text
        pattern: String,
    },

    /// A fragment part, bound, delimiter or padding referenced an
    /// undeclared pattern name
    UnknownPattern {
        /// The missing pattern name
        name: String,
        /// The fragment that referenced it
        referenced_by: String,
    },

    /// A fragment part referenced an undeclared fragment name
    UnknownFragment {
        /// The missing fragment name
        name: String,
        /// The fragment that referenced it
        referenced_by: String,
    },

    /// A pattern or fragment name was declared twice
    DuplicateName {
        /// The duplicated name
        name: String,
    },

    /// The starting fragment named by the definition does not exist
    UnknownStartingFragment {
        /// The missing fragment name
        name: String,
    },

    /// More patterns or fragments than the match tree can index
    TooManyDeclarations {
        /// `"patterns"` or `"fragments"`
        kind: &'static str,
        /// How many were declared
        count: usize,
        /// The largest supported count
        limit: usize,
    },

    /// Malformed grammar text (the compact textual grammar form)
    GrammarSyntax {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::PatternSyntax {
                pattern,
                position,
                message,
            } => {
                write!(
                    f,
                    "invalid pattern {:?} at offset {}: {}",
                    pattern, position, message
                )
            }
            GrammarError::InfiniteQuantifier { pattern } => {
                write!(
                    f,
                    "pattern {:?}: repetition over a zero-width pattern never terminates",
                    pattern
                )
            }
            GrammarError::UnknownPattern {
                name,
                referenced_by,
            } => {
                write!(
                    f,
                    "fragment {:?} references unknown pattern {:?}",
                    referenced_by, name
                )
            }
            GrammarError::UnknownFragment {
                name,
                referenced_by,
            } => {
                write!(
                    f,
                    "fragment {:?} references unknown fragment {:?}",
                    referenced_by, name
                )
            }
            GrammarError::DuplicateName { name } => {
                write!(f, "name {:?} is declared more than once", name)
            }
            GrammarError::UnknownStartingFragment { name } => {
                write!(f, "starting fragment {:?} is not declared", name)
            }
            GrammarError::TooManyDeclarations { kind, count, limit } => {
                write!(f, "{} {} declared, at most {} supported", count, kind, limit)
            }
            GrammarError::GrammarSyntax { line, message } => {
                write!(f, "grammar text error at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for GrammarError {}
