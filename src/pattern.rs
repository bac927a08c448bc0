//! Character-level pattern matchers
//!
//! A [`Pattern`] matches a run of characters at a byte offset and reports how
//! many bytes it consumed. Patterns are pure and idempotent: matching never
//! mutates shared state, so a compiled pattern can be shared freely across
//! concurrent matches.
//!
//! Patterns are a flat sum type dispatched in a single `match`, with no
//! dispatch through trait objects.
//!
//! # Example
//!
//! ```rust
//! use fragmatch::PatternMatcher;
//!
//! let matcher = PatternMatcher::compile(0, "Num", "\\d+").unwrap();
//! assert_eq!(matcher.is_match("42abc", 0), Some(2));
//! assert_eq!(matcher.is_match("42abc", 2), None);
//! ```

use crate::error::GrammarError;
use crate::regex_cache;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

/// Upper bound used for unbounded counted repetition (`{m,}`)
pub const UNBOUNDED: usize = usize::MAX;

/// A character-level pattern
///
/// Composite variants delegate greedily and fail fast; every variant consumes
/// zero bytes on failure.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exact substring
    Literal(Box<str>),
    /// Case-folded substring
    InsensitiveLiteral(Box<str>),
    /// Single character inclusive range, e.g. `[a-z]`
    CharBounds {
        /// Lowest accepted character
        min: char,
        /// Highest accepted character
        max: char,
    },
    /// Sequential AND over sub-patterns
    Group(Vec<Pattern>),
    /// First alternative in declaration order that succeeds wins
    Or(Vec<Pattern>),
    /// Zero-width negative lookahead
    Not(Box<Pattern>),
    /// Zero or one occurrence
    Optional(Box<Pattern>),
    /// Zero or more occurrences, greedy
    Wildcard(Box<Pattern>),
    /// One or more occurrences, greedy
    OneOrMore(Box<Pattern>),
    /// Between `min` and `max` occurrences, greedy
    CountBounds {
        /// Repeated sub-pattern
        pattern: Box<Pattern>,
        /// Minimum repetitions for success
        min: usize,
        /// Maximum repetitions attempted ([`UNBOUNDED`] for `{m,}`)
        max: usize,
    },
    /// Sub-pattern whose match must not touch an adjacent alphanumeric
    WholeWord(Box<Pattern>),
    /// Any single character
    Any,
    /// ASCII digit
    Digit,
    /// Alphabetic character
    Letter,
    /// Whitespace character
    Whitespace,
    /// Alphanumeric character or underscore
    WordChar,
    /// Regex-syntax fallback for patterns outside the mini-language
    Regex(Box<str>),
    /// Wrapper that defers mini-language compilation until first use
    Deferred(Arc<DeferredPattern>),
}

/// A pattern whose tree construction is deferred until first use
///
/// The source text is syntax-checked when the wrapper is created, so forcing
/// it later cannot fail.
#[derive(Debug)]
pub struct DeferredPattern {
    source: Box<str>,
    compiled: OnceLock<Pattern>,
}

impl DeferredPattern {
    /// Create a deferred pattern, validating the source up front
    pub fn new(source: &str) -> Result<Arc<Self>, GrammarError> {
        // Full parse for validation; the tree is rebuilt lazily on first use.
        let parsed = crate::reader::PatternReader::parse(source)?;
        parsed.validate(source)?;
        Ok(Arc::new(Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }))
    }

    /// The original source text
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compile on first use and return the pattern tree
    #[inline]
    pub fn force(&self) -> &Pattern {
        self.compiled.get_or_init(|| {
            crate::reader::PatternReader::parse(&self.source)
                .expect("deferred pattern source was validated at construction")
        })
    }
}

impl Pattern {
    /// Match this pattern at `offset`, returning the consumed byte length
    ///
    /// Total for any `offset <= text.len()`; returns `None` on failure.
    pub fn is_match(&self, text: &str, offset: usize) -> Option<usize> {
        match self {
            Pattern::Literal(s) => {
                let end = offset.checked_add(s.len())?;
                if end <= text.len() && &text.as_bytes()[offset..end] == s.as_bytes() {
                    Some(s.len())
                } else {
                    None
                }
            }
            Pattern::InsensitiveLiteral(s) => {
                let mut consumed = 0;
                let mut rest = text.get(offset..)?.chars();
                for pc in s.chars() {
                    let tc = rest.next()?;
                    if !chars_eq_insensitive(pc, tc) {
                        return None;
                    }
                    consumed += tc.len_utf8();
                }
                Some(consumed)
            }
            Pattern::CharBounds { min, max } => {
                let c = next_char(text, offset)?;
                if *min <= c && c <= *max {
                    Some(c.len_utf8())
                } else {
                    None
                }
            }
            Pattern::Group(parts) => {
                let mut consumed = 0;
                for part in parts {
                    consumed += part.is_match(text, offset + consumed)?;
                }
                Some(consumed)
            }
            Pattern::Or(parts) => parts.iter().find_map(|p| p.is_match(text, offset)),
            Pattern::Not(inner) => {
                if offset < text.len() && inner.is_match(text, offset).is_none() {
                    Some(0)
                } else {
                    None
                }
            }
            Pattern::Optional(inner) => Some(inner.is_match(text, offset).unwrap_or(0)),
            Pattern::Wildcard(inner) => Some(repeat_greedy(inner, text, offset, UNBOUNDED).1),
            Pattern::OneOrMore(inner) => {
                let (count, consumed) = repeat_greedy(inner, text, offset, UNBOUNDED);
                if count >= 1 {
                    Some(consumed)
                } else {
                    None
                }
            }
            Pattern::CountBounds { pattern, min, max } => {
                let (count, consumed) = repeat_greedy(pattern, text, offset, *max);
                if count >= *min {
                    Some(consumed)
                } else {
                    None
                }
            }
            Pattern::WholeWord(inner) => {
                let consumed = inner.is_match(text, offset)?;
                let before = text.get(..offset)?.chars().next_back();
                let after = next_char(text, offset + consumed);
                if before.is_some_and(|c| c.is_alphanumeric())
                    || after.is_some_and(|c| c.is_alphanumeric())
                {
                    None
                } else {
                    Some(consumed)
                }
            }
            Pattern::Any => next_char(text, offset).map(char::len_utf8),
            Pattern::Digit => match next_char(text, offset) {
                Some(c) if c.is_ascii_digit() => Some(1),
                _ => None,
            },
            Pattern::Letter => match next_char(text, offset) {
                Some(c) if c.is_alphabetic() => Some(c.len_utf8()),
                _ => None,
            },
            Pattern::Whitespace => match next_char(text, offset) {
                Some(c) if c.is_whitespace() => Some(c.len_utf8()),
                _ => None,
            },
            Pattern::WordChar => match next_char(text, offset) {
                Some(c) if c.is_alphanumeric() || c == '_' => Some(c.len_utf8()),
                _ => None,
            },
            Pattern::Regex(src) => {
                let regex = regex_cache::get_or_compile(src)?;
                let m = regex.find(text.get(offset..)?)?;
                debug_assert_eq!(m.start(), 0);
                Some(m.end())
            }
            Pattern::Deferred(deferred) => deferred.force().is_match(text, offset),
        }
    }

    /// Reject constructions that would loop forever at match time
    ///
    /// A `*`/`+`/counted repetition over a pattern that can only ever match
    /// zero characters (a negation, or a composite of only such patterns)
    /// is fatal at build time.
    pub fn validate(&self, source: &str) -> Result<(), GrammarError> {
        match self {
            Pattern::Wildcard(inner)
            | Pattern::OneOrMore(inner)
            | Pattern::CountBounds { pattern: inner, .. } => {
                if inner.always_zero_width() {
                    return Err(GrammarError::InfiniteQuantifier {
                        pattern: source.to_string(),
                    });
                }
                inner.validate(source)
            }
            Pattern::Group(parts) | Pattern::Or(parts) => {
                for part in parts {
                    part.validate(source)?;
                }
                Ok(())
            }
            Pattern::Not(inner) | Pattern::Optional(inner) | Pattern::WholeWord(inner) => {
                inner.validate(source)
            }
            Pattern::Regex(src) => match regex_cache::get_or_compile(src) {
                Some(_) => Ok(()),
                None => Err(GrammarError::PatternSyntax {
                    pattern: source.to_string(),
                    position: 0,
                    message: format!("invalid regex fallback {:?}", src),
                }),
            },
            _ => Ok(()),
        }
    }

    /// Whether every possible match of this pattern consumes zero bytes
    fn always_zero_width(&self) -> bool {
        match self {
            Pattern::Not(_) => true,
            Pattern::Literal(s) | Pattern::InsensitiveLiteral(s) => s.is_empty(),
            Pattern::Group(parts) => parts.iter().all(|p| p.always_zero_width()),
            Pattern::Or(parts) => !parts.is_empty() && parts.iter().all(|p| p.always_zero_width()),
            Pattern::Deferred(d) => d.force().always_zero_width(),
            _ => false,
        }
    }

    /// Whether any literal in this tree is case-insensitive
    fn has_insensitive(&self) -> bool {
        match self {
            Pattern::InsensitiveLiteral(_) => true,
            Pattern::Group(parts) | Pattern::Or(parts) => {
                parts.iter().any(|p| p.has_insensitive())
            }
            Pattern::Not(p)
            | Pattern::Optional(p)
            | Pattern::Wildcard(p)
            | Pattern::OneOrMore(p)
            | Pattern::WholeWord(p) => p.has_insensitive(),
            Pattern::CountBounds { pattern, .. } => pattern.has_insensitive(),
            Pattern::Deferred(d) => d.force().has_insensitive(),
            _ => false,
        }
    }

    fn write_to(&self, out: &mut String, ctx: PrintContext) {
        match self {
            Pattern::Literal(s) | Pattern::InsensitiveLiteral(s) => {
                // A quantifier binds one character, so longer literals need parens.
                let grouped = ctx == PrintContext::Operand && s.chars().nth(1).is_some();
                if grouped {
                    out.push('(');
                }
                for c in s.chars() {
                    write_escaped_char(out, c);
                }
                if grouped {
                    out.push(')');
                }
            }
            Pattern::CharBounds { min, max } => {
                out.push('[');
                write_class_char(out, *min);
                out.push('-');
                write_class_char(out, *max);
                out.push(']');
            }
            Pattern::Group(parts) => {
                let grouped = ctx == PrintContext::Operand;
                if grouped {
                    out.push('(');
                }
                for part in parts {
                    part.write_to(out, PrintContext::Sequence);
                }
                if grouped {
                    out.push(')');
                }
            }
            Pattern::Or(parts) => {
                let grouped = ctx != PrintContext::Top;
                if grouped {
                    out.push('(');
                }
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    part.write_to(out, PrintContext::Sequence);
                }
                if grouped {
                    out.push(')');
                }
            }
            Pattern::Not(inner) => {
                out.push('!');
                inner.write_to(out, PrintContext::Operand);
            }
            Pattern::Optional(inner) => {
                inner.write_to(out, PrintContext::Operand);
                out.push('?');
            }
            Pattern::Wildcard(inner) => {
                inner.write_to(out, PrintContext::Operand);
                out.push('*');
            }
            Pattern::OneOrMore(inner) => {
                inner.write_to(out, PrintContext::Operand);
                out.push('+');
            }
            Pattern::CountBounds { pattern, min, max } => {
                pattern.write_to(out, PrintContext::Operand);
                if min == max {
                    let _ = write!(out, "{{{}}}", min);
                } else if *max == UNBOUNDED {
                    let _ = write!(out, "{{{},}}", min);
                } else {
                    let _ = write!(out, "{{{},{}}}", min, max);
                }
            }
            Pattern::WholeWord(inner) => {
                out.push('`');
                inner.write_to(out, PrintContext::Top);
            }
            Pattern::Any => out.push('.'),
            Pattern::Digit => out.push_str("\\d"),
            Pattern::Letter => out.push_str("\\l"),
            Pattern::Whitespace => out.push_str("\\s"),
            Pattern::WordChar => out.push_str("\\w"),
            Pattern::Regex(src) => {
                out.push('/');
                for c in src.chars() {
                    if c == '/' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('/');
            }
            Pattern::Deferred(d) => out.push_str(d.source()),
        }
    }
}

/// Where a pattern is being printed, for parenthesization
#[derive(Clone, Copy, PartialEq, Eq)]
enum PrintContext {
    /// Whole pattern
    Top,
    /// Element of a sequence
    Sequence,
    /// Operand of a quantifier or negation
    Operand,
}

/// Characters that must be escaped in literal position
const LITERAL_SPECIALS: &str = "\\.()[]|*+?{}!~`/";

fn write_escaped_char(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        c if LITERAL_SPECIALS.contains(c) => {
            out.push('\\');
            out.push(c);
        }
        c => out.push(c),
    }
}

fn write_class_char(out: &mut String, c: char) {
    match c {
        '\\' | ']' | '-' => {
            out.push('\\');
            out.push(c);
        }
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        c => out.push(c),
    }
}

#[inline]
fn next_char(text: &str, offset: usize) -> Option<char> {
    text.get(offset..)?.chars().next()
}

#[inline]
fn chars_eq_insensitive(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Greedy repetition helper shared by the quantifier variants
///
/// Stops after `max` repetitions or on the first zero-length match, which is
/// counted once so that `x?+`-style constructions terminate.
fn repeat_greedy(pattern: &Pattern, text: &str, offset: usize, max: usize) -> (usize, usize) {
    let mut count = 0;
    let mut consumed = 0;
    while count < max {
        match pattern.is_match(text, offset + consumed) {
            Some(0) => {
                count += 1;
                break;
            }
            Some(len) => {
                consumed += len;
                count += 1;
            }
            None => break,
        }
    }
    (count, consumed)
}

/// A named, identified pattern as it appears in a grammar's ordered pattern list
///
/// `is_noise` marks matches that consume input but are excluded from the
/// result tree; `is_mergable` allows adjacent matches of this pattern that are
/// separated only by noise to coalesce into a single token.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    /// Stable numeric id (index into the grammar's pattern list)
    pub id: usize,
    /// Pattern name, used for tree node names and definition references
    pub name: String,
    /// Excluded from the tree but still consumes input
    pub is_noise: bool,
    /// Adjacent noise-separated matches coalesce into one token
    pub is_mergable: bool,
    /// The compiled pattern tree
    pub pattern: Pattern,
}

impl PatternMatcher {
    /// Compile pattern source text into a matcher
    pub fn compile(id: usize, name: &str, source: &str) -> Result<Self, GrammarError> {
        let pattern = crate::reader::PatternReader::parse(source)?;
        pattern.validate(source)?;
        Ok(Self {
            id,
            name: name.to_string(),
            is_noise: false,
            is_mergable: false,
            pattern,
        })
    }

    /// Compile lazily: validate now, build the tree on first use
    pub fn compile_deferred(id: usize, name: &str, source: &str) -> Result<Self, GrammarError> {
        let deferred = DeferredPattern::new(source)?;
        Ok(Self {
            id,
            name: name.to_string(),
            is_noise: false,
            is_mergable: false,
            pattern: Pattern::Deferred(deferred),
        })
    }

    /// Mark this pattern as noise
    pub fn noise(mut self) -> Self {
        self.is_noise = true;
        self
    }

    /// Mark this pattern as mergable
    pub fn mergable(mut self) -> Self {
        self.is_mergable = true;
        self
    }

    /// Match at `offset`, returning the consumed byte length
    #[inline]
    pub fn is_match(&self, text: &str, offset: usize) -> Option<usize> {
        self.pattern.is_match(text, offset)
    }

    /// Stable, round-trippable textual form of the pattern
    ///
    /// Parsing the returned text yields an equivalent matcher. Used for
    /// definition export and test equivalence checks.
    pub fn to_pattern_string(&self) -> String {
        // A deferred pattern keeps its original source, prefix included.
        if let Pattern::Deferred(d) = &self.pattern {
            return d.source().to_string();
        }
        let mut out = String::new();
        if self.pattern.has_insensitive() {
            out.push('~');
        }
        self.pattern.write_to(&mut out, PrintContext::Top);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Pattern {
        Pattern::Literal(s.into())
    }

    #[test]
    fn test_literal() {
        let p = lit("abc");
        assert_eq!(p.is_match("abcdef", 0), Some(3));
        assert_eq!(p.is_match("xabc", 1), Some(3));
        assert_eq!(p.is_match("ab", 0), None);
        assert_eq!(p.is_match("abc", 3), None);
    }

    #[test]
    fn test_insensitive_literal() {
        let p = Pattern::InsensitiveLiteral("AbC".into());
        assert_eq!(p.is_match("abc", 0), Some(3));
        assert_eq!(p.is_match("ABC", 0), Some(3));
        assert_eq!(p.is_match("abd", 0), None);
    }

    #[test]
    fn test_char_bounds() {
        let p = Pattern::CharBounds { min: 'a', max: 'z' };
        assert_eq!(p.is_match("m", 0), Some(1));
        assert_eq!(p.is_match("A", 0), None);
        assert_eq!(p.is_match("", 0), None);
    }

    #[test]
    fn test_group_fails_fast() {
        let p = Pattern::Group(vec![lit("a"), lit("b")]);
        assert_eq!(p.is_match("ab", 0), Some(2));
        assert_eq!(p.is_match("ac", 0), None);
    }

    #[test]
    fn test_or_first_wins() {
        let p = Pattern::Or(vec![lit("ab"), lit("a")]);
        assert_eq!(p.is_match("ab", 0), Some(2));
        assert_eq!(p.is_match("ac", 0), Some(1));
        assert_eq!(p.is_match("b", 0), None);
    }

    #[test]
    fn test_not_zero_width() {
        let p = Pattern::Not(Box::new(lit("a")));
        assert_eq!(p.is_match("b", 0), Some(0));
        assert_eq!(p.is_match("a", 0), None);
        // Out of bounds: nothing left to not-match
        assert_eq!(p.is_match("b", 1), None);
    }

    #[test]
    fn test_quantifiers() {
        let star = Pattern::Wildcard(Box::new(Pattern::Digit));
        assert_eq!(star.is_match("123a", 0), Some(3));
        assert_eq!(star.is_match("abc", 0), Some(0));

        let plus = Pattern::OneOrMore(Box::new(Pattern::Digit));
        assert_eq!(plus.is_match("123a", 0), Some(3));
        assert_eq!(plus.is_match("abc", 0), None);

        let counted = Pattern::CountBounds {
            pattern: Box::new(Pattern::Digit),
            min: 2,
            max: 3,
        };
        assert_eq!(counted.is_match("1", 0), None);
        assert_eq!(counted.is_match("12", 0), Some(2));
        // Greedy up to max, extra digits left alone
        assert_eq!(counted.is_match("12345", 0), Some(3));
    }

    #[test]
    fn test_count_bounds_short_of_max_succeeds() {
        let p = Pattern::CountBounds {
            pattern: Box::new(Pattern::Digit),
            min: 1,
            max: 5,
        };
        assert_eq!(p.is_match("12x", 0), Some(2));
    }

    #[test]
    fn test_whole_word() {
        let p = Pattern::WholeWord(Box::new(lit("cat")));
        assert_eq!(p.is_match("cat ", 0), Some(3));
        assert_eq!(p.is_match("cats", 0), None);
        assert_eq!(p.is_match("concat", 3), None);
        assert_eq!(p.is_match("a cat", 2), Some(3));
        // An offset inside a multi-byte character is a miss, not a panic.
        assert_eq!(p.is_match("écat", 1), None);
    }

    #[test]
    fn test_builtin_classes() {
        assert_eq!(Pattern::Any.is_match("é", 0), Some(2));
        assert_eq!(Pattern::Digit.is_match("7", 0), Some(1));
        assert_eq!(Pattern::Letter.is_match("x", 0), Some(1));
        assert_eq!(Pattern::Whitespace.is_match("\t", 0), Some(1));
        assert_eq!(Pattern::WordChar.is_match("_", 0), Some(1));
        assert_eq!(Pattern::WordChar.is_match("-", 0), None);
    }

    #[test]
    fn test_regex_fallback() {
        let p = Pattern::Regex("[0-9]+(?:\\.[0-9]+)?".into());
        assert_eq!(p.is_match("3.14x", 0), Some(4));
        assert_eq!(p.is_match("x3.14", 0), None);
        assert_eq!(p.is_match("x3.14", 1), Some(4));
    }

    #[test]
    fn test_deferred_compiles_once() {
        let d = DeferredPattern::new("a+b").unwrap();
        let p = Pattern::Deferred(d);
        assert_eq!(p.is_match("aab", 0), Some(3));
        assert_eq!(p.is_match("b", 0), None);
    }

    #[test]
    fn test_deferred_rejects_bad_source() {
        assert!(DeferredPattern::new("(a").is_err());
    }

    #[test]
    fn test_validate_rejects_quantified_not() {
        let p = Pattern::Wildcard(Box::new(Pattern::Not(Box::new(lit("a")))));
        assert!(matches!(
            p.validate("!a*"),
            Err(GrammarError::InfiniteQuantifier { .. })
        ));

        let p = Pattern::OneOrMore(Box::new(Pattern::Group(vec![
            Pattern::Not(Box::new(lit("a"))),
            Pattern::Not(Box::new(lit("b"))),
        ])));
        assert!(p.validate("(!a!b)+").is_err());
    }

    #[test]
    fn test_validate_accepts_consuming_quantifier() {
        let p = Pattern::OneOrMore(Box::new(Pattern::Group(vec![
            Pattern::Not(Box::new(lit("a"))),
            Pattern::Any,
        ])));
        assert!(p.validate("(!a.)+").is_ok());
    }

    #[test]
    fn test_zero_width_repeat_terminates() {
        // Optional can match zero-width; the loop must still terminate.
        let p = Pattern::Wildcard(Box::new(Pattern::Optional(Box::new(Pattern::Digit))));
        assert_eq!(p.is_match("12a", 0), Some(2));
        assert_eq!(p.is_match("a", 0), Some(0));
    }

    #[test]
    fn test_to_pattern_string_groups_quantified_literal() {
        let m = PatternMatcher::compile(0, "P", "(ab)+").unwrap();
        assert_eq!(m.to_pattern_string(), "(ab)+");
    }

    #[test]
    fn test_to_pattern_string_escapes() {
        let m = PatternMatcher::compile(0, "P", "a\\.b").unwrap();
        assert_eq!(m.to_pattern_string(), "a\\.b");
    }

    #[test]
    fn test_to_pattern_string_insensitive_prefix() {
        let m = PatternMatcher::compile(0, "Kw", "~select").unwrap();
        assert_eq!(m.to_pattern_string(), "~select");
    }
}
