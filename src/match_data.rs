//! Match results and tree navigation
//!
//! A [`MatcherResult`] owns the arena of one match call, a handle to the
//! grammar, and the input it ran over. [`MatchView`] is a cheap cursor over
//! that arena for walking the tree; [`MatcherResult::to_xml`] renders the
//! canonical dump used throughout the test suite.

use crate::arena::{MatchArena, Node, NodeId};
use crate::language::LanguageMatcher;
use crate::trace::MatchTrace;

/// Outcome of a match call
///
/// On failure, `root` may still hold the partial tree matched before the
/// deepest failure, which is often the most useful diagnostic next to
/// `failure_offset`.
pub struct MatcherResult<'a> {
    pub(crate) text: &'a str,
    pub(crate) lang: &'a LanguageMatcher,
    pub(crate) arena: MatchArena,
    pub(crate) root: Option<NodeId>,
    pub(crate) success: bool,
    pub(crate) end_offset: usize,
    pub(crate) failure_offset: Option<usize>,
    pub(crate) trace: Option<MatchTrace>,
}

impl<'a> MatcherResult<'a> {
    /// Whether the match succeeded
    #[inline]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Byte offset just past the consumed input
    #[inline]
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// Deepest byte offset reached across all backtracking
    ///
    /// Present when the match failed; the single best position to point a
    /// syntax-error message at.
    #[inline]
    pub fn failure_offset(&self) -> Option<usize> {
        self.failure_offset
    }

    /// Deepest failure as a 1-based (line, column) pair
    pub fn failure_position(&self) -> Option<(usize, usize)> {
        self.failure_offset
            .map(|offset| offset_to_line_col(self.text, offset))
    }

    /// The matched tree's root, if any
    pub fn root(&self) -> Option<MatchView<'_>> {
        self.root.map(|id| MatchView { result: self, id })
    }

    /// The trace recorded under `log_matches`, rendered to text
    pub fn trace_text(&self) -> Option<String> {
        self.trace.as_ref().map(|t| t.format(self.lang, self.text))
    }

    /// The raw trace events recorded under `log_matches`
    pub fn trace(&self) -> Option<&MatchTrace> {
        self.trace.as_ref()
    }

    /// Canonical XML rendering of the tree, empty if there is no root
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root() {
            root.write_xml(&mut out);
        }
        out
    }
}

/// A node of a match tree, borrowed from its result
#[derive(Clone, Copy)]
pub struct MatchView<'a> {
    result: &'a MatcherResult<'a>,
    id: NodeId,
}

impl<'a> MatchView<'a> {
    /// Pattern or fragment name of this node
    pub fn name(&self) -> &'a str {
        match self.result.arena.node(self.id) {
            Node::Token { pattern, .. } => &self.result.lang.pattern(pattern as usize).name,
            Node::Fragment { fragment, .. } => &self.result.lang.fragment(fragment as usize).name,
        }
    }

    /// Byte offset of the node's span start
    #[inline]
    pub fn start(&self) -> usize {
        self.result.arena.node(self.id).start() as usize
    }

    /// Byte length of the node's span
    #[inline]
    pub fn length(&self) -> usize {
        self.result.arena.node(self.id).length() as usize
    }

    /// Byte offset just past the node's span
    #[inline]
    pub fn end(&self) -> usize {
        self.start() + self.length()
    }

    /// Visible text of the node
    ///
    /// For merged tokens this differs from the input slice of the span.
    pub fn text(&self) -> &'a str {
        self.result.arena.text(self.id, self.result.text)
    }

    /// Whether this node is a pattern match
    pub fn is_token(&self) -> bool {
        matches!(self.result.arena.node(self.id), Node::Token { .. })
    }

    /// Number of children
    pub fn children_len(&self) -> usize {
        self.result.arena.children(self.id).len()
    }

    /// Children in match order
    pub fn children(&self) -> impl Iterator<Item = MatchView<'a>> + '_ {
        self.result
            .arena
            .children(self.id)
            .iter()
            .map(|&id| MatchView {
                result: self.result,
                id,
            })
    }

    /// Child by position
    pub fn child(&self, index: usize) -> Option<MatchView<'a>> {
        self.result
            .arena
            .children(self.id)
            .get(index)
            .map(|&id| MatchView {
                result: self.result,
                id,
            })
    }

    /// First child with the given name
    pub fn find_child(&self, name: &str) -> Option<MatchView<'a>> {
        self.children().find(|c| c.name() == name)
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.name());
        if self.is_token() {
            out.push('>');
            write_escaped(out, self.text());
        } else if self.children_len() == 0 {
            out.push_str("/>");
            return;
        } else {
            out.push('>');
            for child in self.children() {
                child.write_xml(out);
            }
        }
        out.push_str("</");
        out.push_str(self.name());
        out.push('>');
    }
}

fn write_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

/// Convert a byte offset to a 1-based (line, column) pair
pub fn offset_to_line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let mut line = 1;
    let mut line_start = 0;
    for (i, b) in text.as_bytes()[..offset].iter().enumerate() {
        if *b == b'\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    (line, text[line_start..offset].chars().count() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentMatcher;
    use crate::language::IndexMode;
    use crate::pattern::PatternMatcher;

    fn sample<'a>(lang: &'a LanguageMatcher, text: &'a str) -> MatcherResult<'a> {
        let mut arena = MatchArena::new();
        let a = arena.push_token(0, 0, 1);
        let b = arena.push_merged_token(0, 1, 3, "aa");
        let root = arena.push_fragment(0, 0, 4, &[a, b]);
        MatcherResult {
            text,
            lang,
            arena,
            root: Some(root),
            success: true,
            end_offset: 4,
            failure_offset: None,
            trace: None,
        }
    }

    fn lang() -> LanguageMatcher {
        LanguageMatcher::new(
            "Test",
            vec![PatternMatcher::compile(0, "A", "a|<").unwrap()],
            vec![FragmentMatcher::new(0, "Start")],
            0,
            IndexMode::None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_view_navigation() {
        let lang = lang();
        let result = sample(&lang, "aaba");
        let root = result.root().unwrap();
        assert_eq!(root.name(), "Start");
        assert_eq!(root.children_len(), 2);
        assert_eq!(root.child(0).unwrap().text(), "a");
        assert_eq!(root.child(1).unwrap().text(), "aa");
        assert_eq!(root.child(1).unwrap().length(), 3);
        assert!(root.find_child("A").unwrap().is_token());
    }

    #[test]
    fn test_xml_escaping() {
        let lang = lang();
        let mut arena = MatchArena::new();
        let token = arena.push_token(0, 0, 1);
        let root = arena.push_fragment(0, 0, 1, &[token]);
        let result = MatcherResult {
            text: "<",
            lang: &lang,
            arena,
            root: Some(root),
            success: true,
            end_offset: 1,
            failure_offset: None,
            trace: None,
        };
        assert_eq!(result.to_xml(), "<Start><A>&lt;</A></Start>");
    }

    #[test]
    fn test_offset_to_line_col() {
        assert_eq!(offset_to_line_col("ab\ncd", 0), (1, 1));
        assert_eq!(offset_to_line_col("ab\ncd", 4), (2, 2));
        assert_eq!(offset_to_line_col("ab\ncd", 99), (2, 3));
    }
}
