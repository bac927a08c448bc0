//! Human-readable match tracing
//!
//! When a grammar sets `log_matches`, the engine records one [`TraceEvent`]
//! per fragment and pattern attempt. The trace is a flat event list with
//! recorded depth,
//! formatted on demand, so recording stays cheap enough to leave enabled
//! while debugging a grammar.

use crate::language::LanguageMatcher;
use std::fmt::Write as _;

/// Debug logging that compiles away without the `logging` feature.
#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}
pub(crate) use log_debug;

/// One recorded step of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// A fragment attempt began
    Enter { fragment: u16, offset: usize },
    /// The attempt succeeded, consuming `offset..end`
    Match {
        fragment: u16,
        offset: usize,
        end: usize,
    },
    /// The attempt failed
    Fail { fragment: u16, offset: usize },
    /// The memo table answered without evaluation
    CacheHit {
        fragment: u16,
        offset: usize,
        success: bool,
    },
    /// A pattern produced a token spanning `start..end`
    Token {
        pattern: u16,
        start: usize,
        end: usize,
    },
    /// A pattern was requested and did not match
    TokenFail { pattern: u16, offset: usize },
}

/// Event log for one match call
#[derive(Debug, Default)]
pub struct MatchTrace {
    events: Vec<(u16, TraceEvent)>,
    depth: u16,
}

impl MatchTrace {
    /// An empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events with their nesting depth
    pub fn events(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().map(|(_, e)| e)
    }

    pub(crate) fn enter(&mut self, fragment: u16, offset: usize) {
        self.events
            .push((self.depth, TraceEvent::Enter { fragment, offset }));
        self.depth += 1;
    }

    pub(crate) fn matched(&mut self, fragment: u16, offset: usize, end: usize) {
        self.depth -= 1;
        self.events.push((
            self.depth,
            TraceEvent::Match {
                fragment,
                offset,
                end,
            },
        ));
    }

    pub(crate) fn failed(&mut self, fragment: u16, offset: usize) {
        self.depth -= 1;
        self.events
            .push((self.depth, TraceEvent::Fail { fragment, offset }));
    }

    pub(crate) fn cache_hit(&mut self, fragment: u16, offset: usize, success: bool) {
        self.events.push((
            self.depth,
            TraceEvent::CacheHit {
                fragment,
                offset,
                success,
            },
        ));
    }

    pub(crate) fn token(&mut self, pattern: u16, start: usize, end: usize) {
        self.events
            .push((self.depth, TraceEvent::Token { pattern, start, end }));
    }

    pub(crate) fn token_fail(&mut self, pattern: u16, offset: usize) {
        self.events
            .push((self.depth, TraceEvent::TokenFail { pattern, offset }));
    }

    /// Render the trace over its input, one indented line per event
    pub fn format(&self, lang: &LanguageMatcher, text: &str) -> String {
        let mut out = String::new();
        for (depth, event) in &self.events {
            for _ in 0..*depth {
                out.push_str("  ");
            }
            match *event {
                TraceEvent::Enter { fragment, offset } => {
                    let _ = writeln!(out, "enter {} @{}", lang.fragment(fragment as usize).name, offset);
                }
                TraceEvent::Match {
                    fragment,
                    offset,
                    end,
                } => {
                    let _ = writeln!(
                        out,
                        "match {} @{}..{} {:?}",
                        lang.fragment(fragment as usize).name,
                        offset,
                        end,
                        text.get(offset..end).unwrap_or("")
                    );
                }
                TraceEvent::Fail { fragment, offset } => {
                    let _ = writeln!(out, "fail {} @{}", lang.fragment(fragment as usize).name, offset);
                }
                TraceEvent::CacheHit {
                    fragment,
                    offset,
                    success,
                } => {
                    let _ = writeln!(
                        out,
                        "cache {} @{} -> {}",
                        lang.fragment(fragment as usize).name,
                        offset,
                        if success { "match" } else { "fail" }
                    );
                }
                TraceEvent::Token { pattern, start, end } => {
                    let _ = writeln!(
                        out,
                        "token {} @{}..{} {:?}",
                        lang.pattern(pattern as usize).name,
                        start,
                        end,
                        text.get(start..end).unwrap_or("")
                    );
                }
                TraceEvent::TokenFail { pattern, offset } => {
                    let _ = writeln!(
                        out,
                        "token {} @{} -> fail",
                        lang.pattern(pattern as usize).name,
                        offset
                    );
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentMatcher;
    use crate::language::IndexMode;
    use crate::pattern::PatternMatcher;

    #[test]
    fn test_format_indents_by_depth() {
        let lang = LanguageMatcher::new(
            "Test",
            vec![PatternMatcher::compile(0, "A", "a").unwrap()],
            vec![FragmentMatcher::new(0, "Outer"), FragmentMatcher::new(1, "Inner")],
            0,
            IndexMode::None,
            true,
        )
        .unwrap();
        let mut trace = MatchTrace::new();
        trace.enter(0, 0);
        trace.token(0, 0, 1);
        trace.enter(1, 1);
        trace.token_fail(0, 1);
        trace.cache_hit(1, 1, false);
        trace.failed(1, 1);
        trace.matched(0, 0, 3);
        let text = trace.format(&lang, "aXc");
        assert_eq!(
            text,
            "enter Outer @0\n  token A @0..1 \"a\"\n  enter Inner @1\n    token A @1 -> fail\n    cache Inner @1 -> fail\n  fail Inner @1\nmatch Outer @0..3 \"aXc\"\n"
        );
    }
}
