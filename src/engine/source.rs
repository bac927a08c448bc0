//! Token sources
//!
//! A [`TokenSource`] hands pattern matches to the fragment evaluator. The
//! three implementations correspond to the grammar's
//! [`IndexMode`](crate::IndexMode) and are observably equivalent for any
//! grammar and input:
//!
//! - [`DirectScan`] re-runs the pattern matcher at the current offset on
//!   every request.
//! - [`LazyIndex`] appends tokens to a growing array on demand and remembers
//!   which patterns already failed at the frontier, so backtracking retries
//!   are O(1).
//! - [`EagerIndex`] tokenizes the whole input before evaluation starts and
//!   serves matches from the precomputed array. It assumes the grammar's
//!   patterns are positionally unambiguous.
//!
//! Cursors pair a byte offset with a distinct-token index so the indexed
//! sources can resume from a memoized fragment without rescanning.

use crate::language::LanguageMatcher;

/// Position of a match in both coordinate systems
///
/// `offset` is a byte offset into the input; `distinct` counts committed
/// tokens and is only meaningful to the indexed sources. Snapshotting and
/// restoring a cursor is how the evaluator backtracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Byte offset into the input
    pub offset: usize,
    /// Count of tokens committed before this position
    pub distinct: usize,
}

/// A successful pattern match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Pattern id
    pub pattern: usize,
    /// Byte offset of the first matched character, after any leading noise
    pub start: usize,
    /// Byte offset just past the last matched character
    pub end: usize,
    /// Visible text when noise was merged out of the span, `None` otherwise
    pub merged: Option<Box<str>>,
}

/// Pattern-match provider for the fragment evaluator
///
/// `match_pattern` advances the cursor past the matched token unless
/// `read_only`; on failure it leaves the cursor alone and returns the offset
/// where matching stalled, which the evaluator folds into the deepest-failure
/// diagnostic.
pub trait TokenSource {
    /// Try `pattern` at the cursor
    fn match_pattern(
        &mut self,
        cursor: &mut Cursor,
        pattern: usize,
        read_only: bool,
    ) -> Result<Token, usize>;

    /// Offset after any trailing noise at the cursor, without advancing
    ///
    /// Used by the full-text check after the root fragment succeeds.
    fn end_of_noise(&mut self, cursor: &Cursor) -> usize;
}

/// Skip noise patterns from `offset`, excluding `exclude` so a noise pattern
/// can still be requested as a token
fn skip_noise(
    text: &str,
    lang: &LanguageMatcher,
    mut offset: usize,
    exclude: Option<usize>,
) -> usize {
    'outer: loop {
        for &id in lang.noise_patterns() {
            if Some(id) == exclude {
                continue;
            }
            if let Some(len) = lang.pattern(id).is_match(text, offset) {
                if len > 0 {
                    offset += len;
                    continue 'outer;
                }
            }
        }
        return offset;
    }
}

/// Scan one token at `offset`: skip leading noise, match the pattern, then
/// extend a mergable match across further noise-separated repeats
///
/// Returns the offset the pattern failed at on error.
fn scan_token(
    text: &str,
    lang: &LanguageMatcher,
    offset: usize,
    pattern: usize,
) -> Result<Token, usize> {
    let matcher = lang.pattern(pattern);
    let start = skip_noise(text, lang, offset, Some(pattern));
    // A zero-length win counts as a failure, matching the eager tokenizer,
    // so a zero-width-capable pattern behaves the same in every index mode.
    let len = match matcher.is_match(text, start) {
        Some(len) if len > 0 => len,
        _ => return Err(start),
    };
    let mut end = start + len;
    let mut merged: Option<String> = None;
    if matcher.is_mergable && len > 0 {
        loop {
            let next = skip_noise(text, lang, end, Some(pattern));
            let piece = match matcher.is_match(text, next) {
                Some(len) if len > 0 => next..next + len,
                _ => break,
            };
            if piece.start > end && merged.is_none() {
                merged = Some(text[start..end].to_string());
            }
            if let Some(visible) = merged.as_mut() {
                visible.push_str(&text[piece.clone()]);
            }
            end = piece.end;
        }
    }
    Ok(Token {
        pattern,
        start,
        end,
        merged: merged.map(Into::into),
    })
}

/// No indexing: every request re-scans characters at the cursor
pub struct DirectScan<'a> {
    text: &'a str,
    lang: &'a LanguageMatcher,
}

impl<'a> DirectScan<'a> {
    /// A source over `text`
    pub fn new(text: &'a str, lang: &'a LanguageMatcher) -> Self {
        Self { text, lang }
    }
}

impl TokenSource for DirectScan<'_> {
    fn match_pattern(
        &mut self,
        cursor: &mut Cursor,
        pattern: usize,
        read_only: bool,
    ) -> Result<Token, usize> {
        let token = scan_token(self.text, self.lang, cursor.offset, pattern)?;
        if !read_only {
            cursor.offset = token.end;
            cursor.distinct += 1;
        }
        Ok(token)
    }

    fn end_of_noise(&mut self, cursor: &Cursor) -> usize {
        skip_noise(self.text, self.lang, cursor.offset, None)
    }
}

/// On-demand tokenization with a tried-and-failed table at the frontier
pub struct LazyIndex<'a> {
    text: &'a str,
    lang: &'a LanguageMatcher,
    tokens: Vec<Token>,
    /// Offset just past the last produced token
    frontier: usize,
    /// Per pattern id: already tried and failed at the current frontier
    tried: Vec<bool>,
}

impl<'a> LazyIndex<'a> {
    /// A source over `text`
    pub fn new(text: &'a str, lang: &'a LanguageMatcher) -> Self {
        Self {
            text,
            lang,
            tokens: Vec::new(),
            frontier: 0,
            tried: vec![false; lang.patterns.len()],
        }
    }
}

impl TokenSource for LazyIndex<'_> {
    fn match_pattern(
        &mut self,
        cursor: &mut Cursor,
        pattern: usize,
        read_only: bool,
    ) -> Result<Token, usize> {
        if let Some(token) = self.tokens.get(cursor.distinct) {
            if token.pattern != pattern {
                return Err(token.start);
            }
            let token = token.clone();
            if !read_only {
                cursor.offset = token.end;
                cursor.distinct += 1;
            }
            return Ok(token);
        }
        debug_assert_eq!(cursor.offset, self.frontier);
        if self.tried[pattern] {
            return Err(skip_noise(self.text, self.lang, self.frontier, Some(pattern)));
        }
        match scan_token(self.text, self.lang, self.frontier, pattern) {
            Ok(token) => {
                self.frontier = token.end;
                self.tried.fill(false);
                self.tokens.push(token.clone());
                if !read_only {
                    cursor.offset = token.end;
                    cursor.distinct += 1;
                }
                Ok(token)
            }
            Err(offset) => {
                self.tried[pattern] = true;
                Err(offset)
            }
        }
    }

    fn end_of_noise(&mut self, cursor: &Cursor) -> usize {
        match self.tokens.get(cursor.distinct) {
            Some(token) => token.start,
            None => skip_noise(self.text, self.lang, cursor.offset, None),
        }
    }
}

/// Full pre-tokenization: one left-to-right pass before evaluation
pub struct EagerIndex {
    tokens: Vec<Token>,
    /// Offset the tokenizer reached, including trailing noise
    scan_end: usize,
}

impl EagerIndex {
    /// Tokenize `text` up front
    ///
    /// At each position every pattern is tried in declaration order and the
    /// first non-empty match wins. Tokenization stops where no pattern
    /// matches; evaluation then fails at that offset if the grammar needs a
    /// token there. After the pass, noise-separated runs of the same mergable
    /// pattern coalesce and noise tokens are dropped.
    pub fn new(text: &str, lang: &LanguageMatcher) -> Self {
        let mut raw: Vec<Token> = Vec::new();
        let mut offset = 0;
        'scan: while offset < text.len() {
            for matcher in &lang.patterns {
                if let Some(len) = matcher.is_match(text, offset) {
                    if len > 0 {
                        raw.push(Token {
                            pattern: matcher.id,
                            start: offset,
                            end: offset + len,
                            merged: None,
                        });
                        offset += len;
                        continue 'scan;
                    }
                }
            }
            break;
        }
        let scan_end = offset;

        // Merge pass: coalesce mergable runs across noise, then drop noise.
        let mut tokens: Vec<Token> = Vec::new();
        let mut i = 0;
        while i < raw.len() {
            let token = &raw[i];
            i += 1;
            if lang.pattern(token.pattern).is_noise {
                continue;
            }
            let mut token = token.clone();
            if lang.pattern(token.pattern).is_mergable {
                let mut visible: Option<String> = None;
                let mut j = i;
                while j < raw.len() {
                    let next = &raw[j];
                    if next.pattern == token.pattern {
                        if next.start > token.end && visible.is_none() {
                            visible = Some(text[token.start..token.end].to_string());
                        }
                        if let Some(v) = visible.as_mut() {
                            v.push_str(&text[next.start..next.end]);
                        }
                        token.end = next.end;
                        i = j + 1;
                        j = i;
                    } else if lang.pattern(next.pattern).is_noise {
                        j += 1;
                    } else {
                        break;
                    }
                }
                token.merged = visible.map(Into::into);
            }
            tokens.push(token);
        }

        Self { tokens, scan_end }
    }
}

impl TokenSource for EagerIndex {
    fn match_pattern(
        &mut self,
        cursor: &mut Cursor,
        pattern: usize,
        read_only: bool,
    ) -> Result<Token, usize> {
        match self.tokens.get(cursor.distinct) {
            Some(token) if token.pattern == pattern => {
                let token = token.clone();
                if !read_only {
                    cursor.offset = token.end;
                    cursor.distinct += 1;
                }
                Ok(token)
            }
            Some(token) => Err(token.start),
            None => Err(self.scan_end),
        }
    }

    fn end_of_noise(&mut self, cursor: &Cursor) -> usize {
        match self.tokens.get(cursor.distinct) {
            Some(token) => token.start,
            None => self.scan_end.max(cursor.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::IndexMode;
    use crate::pattern::PatternMatcher;

    fn merge_lang() -> LanguageMatcher {
        LanguageMatcher::new(
            "Merge",
            vec![
                PatternMatcher::compile(0, "A", "a+").unwrap().mergable(),
                PatternMatcher::compile(1, "B", "b").unwrap().noise(),
                PatternMatcher::compile(2, "C", "c").unwrap(),
            ],
            vec![crate::fragment::FragmentMatcher::new(0, "Start")],
            0,
            IndexMode::None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_direct_scan_skips_noise() {
        let lang = merge_lang();
        let mut source = DirectScan::new("bca", &lang);
        let mut cursor = Cursor::default();
        let token = source.match_pattern(&mut cursor, 2, false).unwrap();
        assert_eq!((token.start, token.end), (1, 2));
        assert_eq!(cursor, Cursor { offset: 2, distinct: 1 });
    }

    #[test]
    fn test_direct_scan_merges_across_noise() {
        let lang = merge_lang();
        let mut source = DirectScan::new("abac", &lang);
        let mut cursor = Cursor::default();
        let token = source.match_pattern(&mut cursor, 0, false).unwrap();
        assert_eq!((token.start, token.end), (0, 3));
        assert_eq!(token.merged.as_deref(), Some("aa"));
        let token = source.match_pattern(&mut cursor, 2, false).unwrap();
        assert_eq!((token.start, token.end), (3, 4));
        assert!(token.merged.is_none());
    }

    #[test]
    fn test_read_only_does_not_advance() {
        let lang = merge_lang();
        let mut source = DirectScan::new("c", &lang);
        let mut cursor = Cursor::default();
        source.match_pattern(&mut cursor, 2, true).unwrap();
        assert_eq!(cursor, Cursor::default());
    }

    #[test]
    fn test_failure_reports_offset_after_noise() {
        let lang = merge_lang();
        let mut source = DirectScan::new("bbc", &lang);
        let mut cursor = Cursor::default();
        assert_eq!(source.match_pattern(&mut cursor, 0, false), Err(2));
        assert_eq!(cursor, Cursor::default());
    }

    #[test]
    fn test_lazy_replays_tokens_on_backtrack() {
        let lang = merge_lang();
        let mut source = LazyIndex::new("abac", &lang);
        let mut cursor = Cursor::default();
        let first = source.match_pattern(&mut cursor, 0, false).unwrap();
        let snapshot = Cursor { offset: first.end, distinct: 1 };
        assert_eq!(cursor, snapshot);
        // Backtrack and re-request: served from the array, not rescanned.
        cursor = Cursor::default();
        let replay = source.match_pattern(&mut cursor, 0, false).unwrap();
        assert_eq!((replay.start, replay.end), (first.start, first.end));
        // Wrong pattern against an existing token fails at its start.
        cursor = Cursor::default();
        assert_eq!(source.match_pattern(&mut cursor, 2, false), Err(0));
    }

    #[test]
    fn test_lazy_tried_table_short_circuits() {
        let lang = merge_lang();
        let mut source = LazyIndex::new("c", &lang);
        let mut cursor = Cursor::default();
        assert_eq!(source.match_pattern(&mut cursor, 0, false), Err(0));
        assert!(source.tried[0]);
        assert_eq!(source.match_pattern(&mut cursor, 0, false), Err(0));
        // The frontier advances on success and the table resets.
        source.match_pattern(&mut cursor, 2, false).unwrap();
        assert!(!source.tried[0]);
    }

    #[test]
    fn test_eager_tokenizes_and_merges() {
        let lang = merge_lang();
        let mut source = EagerIndex::new("abacb", &lang);
        assert_eq!(source.tokens.len(), 2);
        assert_eq!(source.tokens[0].merged.as_deref(), Some("aa"));
        let mut cursor = Cursor::default();
        source.match_pattern(&mut cursor, 0, false).unwrap();
        source.match_pattern(&mut cursor, 2, false).unwrap();
        // Trailing noise was consumed by the tokenizer.
        assert_eq!(source.end_of_noise(&cursor), 5);
        assert_eq!(source.match_pattern(&mut cursor, 2, false), Err(5));
    }

    #[test]
    fn test_eager_stalls_at_unmatched_input() {
        let lang = merge_lang();
        let source = EagerIndex::new("ax", &lang);
        assert_eq!(source.tokens.len(), 1);
        assert_eq!(source.scan_end, 1);
    }
}
