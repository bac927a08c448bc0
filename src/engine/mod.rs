//! Fragment match engine
//!
//! [`Matcher`] drives a backtracking recursive descent over a grammar's
//! fragments. All per-call mutable state (cursor, arena, memo table, scratch
//! child stack, trace) lives in a private `MatchState`, so a
//! [`LanguageMatcher`] can serve concurrent matches as long as each call gets
//! its own `Matcher::match_*` invocation.
//!
//! Fragment-level memoization is keyed by `(fragment id, start offset)` and
//! covers failures as well, the packrat trade of memory for time. It is
//! orthogonal to the token source: all three index modes share this code.

mod source;

pub use source::{Cursor, DirectScan, EagerIndex, LazyIndex, Token, TokenSource};

use crate::arena::{MatchArena, NodeId};
use crate::error::GrammarError;
use crate::expression;
use crate::fragment::{ExpressionMode, FragmentMatcher, FragmentPart, MatchMode};
use crate::language::{IndexMode, LanguageMatcher};
use crate::match_data::MatcherResult;
use crate::trace::{log_debug, MatchTrace};
use ahash::AHashMap;

/// Entry point for matching text against a compiled grammar
///
/// Holds only a grammar reference; every call builds fresh private state.
pub struct Matcher<'a> {
    lang: &'a LanguageMatcher,
}

impl<'a> Matcher<'a> {
    /// A matcher over `lang`
    pub fn new(lang: &'a LanguageMatcher) -> Self {
        Self { lang }
    }

    /// Match the whole text against the grammar's starting fragment
    pub fn match_text(&self, text: &'a str) -> MatcherResult<'a> {
        self.run(text, self.lang.starting_fragment, true)
    }

    /// Match a named fragment, optionally requiring full-text consumption
    pub fn match_fragment(
        &self,
        text: &'a str,
        fragment: &str,
        match_full_text: bool,
    ) -> Result<MatcherResult<'a>, GrammarError> {
        let id = self
            .lang
            .fragment_id(fragment)
            .ok_or_else(|| GrammarError::UnknownStartingFragment {
                name: fragment.to_string(),
            })?;
        Ok(self.run(text, id, match_full_text))
    }

    fn run(&self, text: &'a str, fragment: usize, full_text: bool) -> MatcherResult<'a> {
        log_debug!(
            "match {} fragment {} over {} bytes",
            self.lang.name,
            self.lang.fragment(fragment).name,
            text.len()
        );
        match self.lang.index_mode {
            IndexMode::None => {
                self.evaluate(text, DirectScan::new(text, self.lang), fragment, full_text)
            }
            IndexMode::Lazy => {
                self.evaluate(text, LazyIndex::new(text, self.lang), fragment, full_text)
            }
            IndexMode::Eager => {
                self.evaluate(text, EagerIndex::new(text, self.lang), fragment, full_text)
            }
        }
    }

    fn evaluate<S: TokenSource>(
        &self,
        text: &'a str,
        source: S,
        fragment: usize,
        full_text: bool,
    ) -> MatcherResult<'a> {
        let mut state = MatchState {
            text,
            lang: self.lang,
            source,
            cursor: Cursor::default(),
            failure_offset: 0,
            arena: MatchArena::for_input(text.len()),
            children: Vec::new(),
            memo: AHashMap::new(),
            trace: self.lang.log_matches.then(MatchTrace::new),
        };
        let outcome = state.eval_fragment(fragment);
        let (root, mut success) = match outcome {
            Some(node) => (node, true),
            None => (None, false),
        };
        let mut end_offset = state.cursor.offset;
        if success && full_text {
            // Trailing noise does not count against full consumption.
            let after_noise = state.source.end_of_noise(&state.cursor);
            if after_noise < text.len() {
                // Forced failure keeps the partial root for diagnostics.
                success = false;
                state.failure_offset = state.failure_offset.max(after_noise);
            } else {
                end_offset = after_noise;
            }
        }
        log_debug!(
            "match {} -> success={} end={} failure_at={}",
            self.lang.name,
            success,
            end_offset,
            state.failure_offset
        );
        MatcherResult {
            text,
            lang: self.lang,
            arena: state.arena,
            root,
            success,
            end_offset,
            failure_offset: (!success).then_some(state.failure_offset),
            trace: state.trace,
        }
    }
}

/// Memoized fragment result: the constructed node and where matching resumed
#[derive(Clone, Copy)]
struct CachedMatch {
    node: Option<NodeId>,
    end: Cursor,
}

struct MatchState<'a, S: TokenSource> {
    text: &'a str,
    lang: &'a LanguageMatcher,
    source: S,
    cursor: Cursor,
    /// Deepest offset any required match failed at, monotonic
    failure_offset: usize,
    arena: MatchArena,
    /// Scratch stack of pending children, truncated on backtrack
    children: Vec<NodeId>,
    /// `(fragment id, start offset)` to result; `None` is a proven failure
    memo: AHashMap<(usize, usize), Option<CachedMatch>>,
    trace: Option<MatchTrace>,
}

impl<S: TokenSource> MatchState<'_, S> {
    /// Evaluate a fragment at the cursor
    ///
    /// `Some(Some(node))` is a match with a tree node, `Some(None)` a match
    /// that contributes no node (a satisfied negation), `None` a failure.
    /// The cursor is advanced on success and restored on failure.
    fn eval_fragment(&mut self, id: usize) -> Option<Option<NodeId>> {
        let lang = self.lang;
        let frag = lang.fragment(id);
        let entry = self.cursor;

        if frag.cacheable {
            if let Some(cached) = self.memo.get(&(id, entry.offset)).copied() {
                if let Some(trace) = self.trace.as_mut() {
                    trace.cache_hit(id as u16, entry.offset, cached.is_some());
                }
                return match cached {
                    Some(hit) => {
                        self.cursor = hit.end;
                        Some(hit.node)
                    }
                    None => None,
                };
            }
        }

        if let Some(trace) = self.trace.as_mut() {
            trace.enter(id as u16, entry.offset);
        }

        let body = self.eval_body(frag);
        let outcome = if frag.negate {
            // Negation never consumes, whichever way the body went.
            self.cursor = entry;
            match body {
                Some(_) => None,
                None => Some(None),
            }
        } else {
            body.map(Some)
        };

        if let Some(trace) = self.trace.as_mut() {
            match outcome {
                Some(_) => trace.matched(id as u16, entry.offset, self.cursor.offset),
                None => trace.failed(id as u16, entry.offset),
            }
        }

        if frag.cacheable {
            let record = outcome.map(|node| CachedMatch {
                node,
                end: self.cursor,
            });
            self.memo.insert((id, entry.offset), record);
        }
        if outcome.is_some() && frag.clear_cache {
            self.memo.clear();
        }
        outcome
    }

    /// Bounds, padding, and parts of one fragment attempt
    fn eval_body(&mut self, frag: &FragmentMatcher) -> Option<NodeId> {
        let entry = self.cursor;
        let base = self.children.len();

        let mut start_bound: Option<Token> = None;
        if let Some(pattern) = frag.start {
            match self.try_pattern(pattern, frag.discard_bounds) {
                Ok(token) => start_bound = Some(token),
                Err(offset) => {
                    self.raise_failure(offset);
                    return None;
                }
            }
        }

        self.match_padding(frag);
        let parts_ok = match frag.mode {
            MatchMode::Ordered => self.match_ordered(frag),
            MatchMode::One => self.match_one(frag),
            MatchMode::Multiple => self.match_multiple(frag),
        };
        if !parts_ok {
            self.restore(entry, base);
            return None;
        }
        self.match_padding(frag);

        let mut end_bound: Option<Token> = None;
        if let Some(pattern) = frag.end {
            match self.try_pattern(pattern, frag.discard_bounds) {
                Ok(token) => end_bound = Some(token),
                Err(offset) => {
                    self.raise_failure(offset);
                    self.restore(entry, base);
                    return None;
                }
            }
        }

        let matched: Vec<NodeId> = self.children.split_off(base);
        let mut children = if frag.expression_mode == ExpressionMode::None {
            matched
        } else {
            expression::reshape(&mut self.arena, self.lang, frag.expression_mode, &matched)
        };
        if frag.bounds_as_parts {
            if let Some(token) = &start_bound {
                let node = self.push_token(token);
                children.insert(0, node);
            }
            if let Some(token) = &end_bound {
                let node = self.push_token(token);
                children.push(node);
            }
        }

        let span_start = match (&start_bound, frag.discard_bounds) {
            (Some(token), false) => token.start as u32,
            _ => children
                .first()
                .map(|&c| self.arena.node(c).start())
                .unwrap_or(entry.offset as u32),
        };
        let length = self.cursor.offset as u32 - span_start;
        Some(
            self.arena
                .push_fragment(frag.id as u16, span_start, length, &children),
        )
    }

    /// All parts in sequence; partial success once `min_parts` are matched
    fn match_ordered(&mut self, frag: &FragmentMatcher) -> bool {
        let min = frag.min_parts();
        let mut matched = 0;
        let mut snapshot = (self.cursor, self.children.len());
        for (i, &part) in frag.parts.iter().enumerate() {
            if i > 0 {
                snapshot = (self.cursor, self.children.len());
                if !self.match_delimiter_run(frag) {
                    self.restore(snapshot.0, snapshot.1);
                    return matched >= min;
                }
            }
            if !self.match_part(part) {
                // Rewind past the delimiter consumed for the failing part.
                self.restore(snapshot.0, snapshot.1);
                return matched >= min;
            }
            matched += 1;
        }
        matched >= min
    }

    /// First part that matches wins
    fn match_one(&mut self, frag: &FragmentMatcher) -> bool {
        for &part in &frag.parts {
            if self.match_part(part) {
                return true;
            }
        }
        frag.min_parts() == 0
    }

    /// Repeated iterations, first matching part per iteration
    fn match_multiple(&mut self, frag: &FragmentMatcher) -> bool {
        let min = frag.min_parts();
        let mut matched = 0;
        loop {
            let snapshot = (self.cursor, self.children.len());
            if matched > 0 && !self.match_delimiter_run(frag) {
                break;
            }
            let found = frag.parts.iter().any(|&part| self.match_part(part));
            if !found {
                // Drop a trailing delimiter that has no part after it.
                self.restore(snapshot.0, snapshot.1);
                break;
            }
            matched += 1;
            if self.cursor == snapshot.0 {
                // An iteration that consumed nothing would never stop.
                break;
            }
        }
        matched >= min
    }

    /// padding, delimiter, padding between two parts
    ///
    /// False only when a required delimiter is absent; the caller rewinds.
    fn match_delimiter_run(&mut self, frag: &FragmentMatcher) -> bool {
        self.match_padding(frag);
        if let Some(pattern) = frag.parts_delimiter {
            match self.try_pattern(pattern, false) {
                Ok(token) => {
                    if !self.lang.pattern(pattern).is_noise {
                        let node = self.push_token(&token);
                        self.children.push(node);
                    }
                }
                Err(offset) => {
                    if frag.parts_delimiter_required {
                        self.raise_failure(offset);
                        return false;
                    }
                }
            }
        }
        self.match_padding(frag);
        true
    }

    fn match_padding(&mut self, frag: &FragmentMatcher) {
        if let Some(pattern) = frag.parts_padding {
            // Padding is best-effort, but the attempt is still recorded.
            let _ = self.try_pattern(pattern, false);
        }
    }

    /// Request a pattern from the token source, recording the attempt
    fn try_pattern(&mut self, pattern: usize, read_only: bool) -> Result<Token, usize> {
        let result = self.source.match_pattern(&mut self.cursor, pattern, read_only);
        if let Some(trace) = self.trace.as_mut() {
            match &result {
                Ok(token) => trace.token(pattern as u16, token.start, token.end),
                Err(offset) => trace.token_fail(pattern as u16, *offset),
            }
        }
        result
    }

    /// One part: a token request or a nested fragment
    fn match_part(&mut self, part: FragmentPart) -> bool {
        let lang = self.lang;
        match part {
            FragmentPart::Pattern(id) => {
                match self.try_pattern(id, false) {
                    Ok(token) => {
                        if !lang.pattern(id).is_noise {
                            let node = self.push_token(&token);
                            self.children.push(node);
                        }
                        true
                    }
                    Err(offset) => {
                        self.raise_failure(offset);
                        false
                    }
                }
            }
            FragmentPart::Fragment(id) => match self.eval_fragment(id) {
                Some(node) => {
                    self.append_fragment(lang.fragment(id), node);
                    true
                }
                None => false,
            },
        }
    }

    /// Attach a matched fragment to the pending children, honoring noise
    /// suppression and fall-through splicing
    fn append_fragment(&mut self, frag: &FragmentMatcher, node: Option<NodeId>) {
        let Some(node) = node else { return };
        if frag.is_noise {
            return;
        }
        let child_count = self.arena.children(node).len();
        if frag.fall_through.applies(child_count) {
            let spliced = self.arena.children(node).to_vec();
            self.children.extend(spliced);
        } else {
            self.children.push(node);
        }
    }

    fn push_token(&mut self, token: &Token) -> NodeId {
        let pattern = token.pattern as u16;
        let start = token.start as u32;
        let length = (token.end - token.start) as u32;
        match &token.merged {
            Some(text) => self.arena.push_merged_token(pattern, start, length, text),
            None => self.arena.push_token(pattern, start, length),
        }
    }

    #[inline]
    fn raise_failure(&mut self, offset: usize) {
        self.failure_offset = self.failure_offset.max(offset);
    }

    #[inline]
    fn restore(&mut self, cursor: Cursor, children_len: usize) {
        self.cursor = cursor;
        self.children.truncate(children_len);
    }
}
