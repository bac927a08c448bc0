//! Grammar-rule (fragment) matchers
//!
//! A [`FragmentMatcher`] is one named rule of a compiled grammar: optional
//! bounding patterns, an ordered list of parts referring to patterns or to
//! other fragments by index, and the flags that steer evaluation. Fragments
//! are immutable after grammar construction; all evaluation state lives in
//! the engine.
//!
//! Parts reference their grammar's pattern and fragment lists by index, which
//! keeps the rule graph flat and lets mutually recursive rules refer to each
//! other without reference cycles.

use serde::{Deserialize, Serialize};

/// One element of a fragment's `parts` list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentPart {
    /// Index into the grammar's pattern list
    Pattern(usize),
    /// Index into the grammar's fragment list
    Fragment(usize),
}

/// How a fragment's parts are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// All parts in sequence, delimiter between them
    #[default]
    Ordered,
    /// First part that matches wins
    One,
    /// Parts are tried repeatedly, first match per iteration
    Multiple,
}

/// Whether a successful fragment is inlined into its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallThroughMode {
    /// Appended to the parent as its own node
    #[default]
    None,
    /// Children spliced into the parent when there are at most this many
    One(usize),
    /// Children always spliced into the parent
    All,
}

impl FallThroughMode {
    /// Whether a fragment with `child_count` children is spliced rather than nested
    #[inline]
    pub fn applies(self, child_count: usize) -> bool {
        match self {
            FallThroughMode::None => false,
            FallThroughMode::One(limit) => child_count <= limit,
            FallThroughMode::All => true,
        }
    }
}

/// How a successful fragment's children are reshaped for operator precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionMode {
    /// Children kept as matched
    #[default]
    None,
    /// Left-associative binary tree ordered by `expression_order`
    BinaryTree,
    /// Binary tree, but chained same-fragment operators merge into n-ary nodes
    LikeNameTree,
}

/// A named grammar rule
///
/// `start` / `end` / `parts_delimiter` / `parts_padding` are pattern indices.
/// Evaluation semantics live in the engine; this type only carries the rule's
/// declaration.
#[derive(Debug, Clone)]
pub struct FragmentMatcher {
    /// Stable numeric id (index into the grammar's fragment list)
    pub id: usize,
    /// Rule name, used for tree node names and definition references
    pub name: String,
    /// Pattern that must match before the parts (consumption per `discard_bounds`)
    pub start: Option<usize>,
    /// Pattern that must match after the parts
    pub end: Option<usize>,
    /// Ordered parts, patterns or nested fragments
    pub parts: Vec<FragmentPart>,
    /// How the parts combine
    pub mode: MatchMode,
    /// Matched-part threshold for success; `None` uses the mode's default
    pub min_matched_parts: Option<usize>,
    /// Pattern consumed between parts
    pub parts_delimiter: Option<usize>,
    /// Whether a missing delimiter stops part matching
    pub parts_delimiter_required: bool,
    /// Pattern consumed and discarded around parts and delimiters
    pub parts_padding: Option<usize>,
    /// Successful matches are dropped from the result tree
    pub is_noise: bool,
    /// Whether children are spliced into the parent on success
    pub fall_through: FallThroughMode,
    /// Record results in the per-match memo table
    pub cacheable: bool,
    /// Wipe the entire memo table when this fragment succeeds
    pub clear_cache: bool,
    /// Post-match reshaping of the children list
    pub expression_mode: ExpressionMode,
    /// Operator precedence when this fragment appears under an expression parent
    pub expression_order: Option<usize>,
    /// Re-insert matched bounds as first/last children
    pub bounds_as_parts: bool,
    /// Match bounds without consuming them
    pub discard_bounds: bool,
    /// Invert the fragment's success, restoring the cursor either way
    pub negate: bool,
}

impl FragmentMatcher {
    /// A rule with the given identity and every flag at its default
    pub fn new(id: usize, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            start: None,
            end: None,
            parts: Vec::new(),
            mode: MatchMode::Ordered,
            min_matched_parts: None,
            parts_delimiter: None,
            parts_delimiter_required: true,
            parts_padding: None,
            is_noise: false,
            fall_through: FallThroughMode::None,
            cacheable: false,
            clear_cache: false,
            expression_mode: ExpressionMode::None,
            expression_order: None,
            bounds_as_parts: false,
            discard_bounds: false,
            negate: false,
        }
    }

    /// Matched-part threshold with the mode default applied
    ///
    /// Ordered requires every part; One and Multiple require a single match.
    #[inline]
    pub fn min_parts(&self) -> usize {
        self.min_matched_parts.unwrap_or(match self.mode {
            MatchMode::Ordered => self.parts.len(),
            MatchMode::One | MatchMode::Multiple => 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_parts_defaults() {
        let mut frag = FragmentMatcher::new(0, "Expr");
        frag.parts = vec![FragmentPart::Pattern(0), FragmentPart::Pattern(1)];
        assert_eq!(frag.min_parts(), 2);

        frag.mode = MatchMode::One;
        assert_eq!(frag.min_parts(), 1);

        frag.mode = MatchMode::Multiple;
        frag.min_matched_parts = Some(0);
        assert_eq!(frag.min_parts(), 0);
    }

    #[test]
    fn test_fall_through_applies() {
        assert!(!FallThroughMode::None.applies(0));
        assert!(FallThroughMode::All.applies(5));
        assert!(FallThroughMode::One(1).applies(1));
        assert!(!FallThroughMode::One(1).applies(2));
    }
}
