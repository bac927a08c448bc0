//! Compiled grammar container
//!
//! A [`LanguageMatcher`] holds a grammar's ordered pattern and fragment lists
//! plus the top-level matching options. It is immutable after construction
//! and may be shared across threads; each concurrent match call carries its
//! own engine state.

use crate::error::GrammarError;
use crate::fragment::{FragmentMatcher, FragmentPart};
use crate::pattern::PatternMatcher;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Token indexing strategy used by the match engine
///
/// All three produce identical results for any grammar and input; they trade
/// pre-pass work against repeated character scanning during backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Re-run the pattern matcher at the current offset on every request
    #[default]
    None,
    /// Tokenize on demand, remembering failed attempts at the frontier
    Lazy,
    /// Tokenize the whole input up front, first pattern in declaration order wins
    Eager,
}

/// An immutable compiled grammar
#[derive(Debug, Clone)]
pub struct LanguageMatcher {
    /// Grammar name
    pub name: String,
    /// Ordered pattern list; a pattern's id is its position here
    pub patterns: Vec<PatternMatcher>,
    /// Ordered fragment list; a fragment's id is its position here
    pub fragments: Vec<FragmentMatcher>,
    /// Fragment evaluated by [`Matcher::match_text`](crate::Matcher::match_text)
    pub starting_fragment: usize,
    /// Token indexing strategy
    pub index_mode: IndexMode,
    /// Record a human-readable trace during matching
    pub log_matches: bool,
    pattern_ids: HashMap<String, usize>,
    fragment_ids: HashMap<String, usize>,
    noise_patterns: Vec<usize>,
}

impl LanguageMatcher {
    /// Assemble a grammar, checking name uniqueness and id consistency
    pub fn new(
        name: &str,
        patterns: Vec<PatternMatcher>,
        fragments: Vec<FragmentMatcher>,
        starting_fragment: usize,
        index_mode: IndexMode,
        log_matches: bool,
    ) -> Result<Self, GrammarError> {
        // Tree nodes store pattern and fragment ids as u16.
        const ID_LIMIT: usize = u16::MAX as usize + 1;
        if patterns.len() > ID_LIMIT {
            return Err(GrammarError::TooManyDeclarations {
                kind: "patterns",
                count: patterns.len(),
                limit: ID_LIMIT,
            });
        }
        if fragments.len() > ID_LIMIT {
            return Err(GrammarError::TooManyDeclarations {
                kind: "fragments",
                count: fragments.len(),
                limit: ID_LIMIT,
            });
        }
        let mut pattern_ids = HashMap::with_capacity(patterns.len());
        for (id, pattern) in patterns.iter().enumerate() {
            debug_assert_eq!(pattern.id, id);
            if pattern_ids.insert(pattern.name.clone(), id).is_some() {
                return Err(GrammarError::DuplicateName {
                    name: pattern.name.clone(),
                });
            }
        }
        let mut fragment_ids = HashMap::with_capacity(fragments.len());
        for (id, fragment) in fragments.iter().enumerate() {
            debug_assert_eq!(fragment.id, id);
            if fragment_ids.insert(fragment.name.clone(), id).is_some() {
                return Err(GrammarError::DuplicateName {
                    name: fragment.name.clone(),
                });
            }
        }
        let noise_patterns = patterns
            .iter()
            .filter(|p| p.is_noise)
            .map(|p| p.id)
            .collect();
        Ok(Self {
            name: name.to_string(),
            patterns,
            fragments,
            starting_fragment,
            index_mode,
            log_matches,
            pattern_ids,
            fragment_ids,
            noise_patterns,
        })
    }

    /// Look up a pattern id by name
    #[inline]
    pub fn pattern_id(&self, name: &str) -> Option<usize> {
        self.pattern_ids.get(name).copied()
    }

    /// Look up a fragment id by name
    #[inline]
    pub fn fragment_id(&self, name: &str) -> Option<usize> {
        self.fragment_ids.get(name).copied()
    }

    /// Pattern by id
    #[inline]
    pub fn pattern(&self, id: usize) -> &PatternMatcher {
        &self.patterns[id]
    }

    /// Fragment by id
    #[inline]
    pub fn fragment(&self, id: usize) -> &FragmentMatcher {
        &self.fragments[id]
    }

    /// Ids of noise patterns, in declaration order
    #[inline]
    pub fn noise_patterns(&self) -> &[usize] {
        &self.noise_patterns
    }

    /// Check that every part reference points inside the grammar
    ///
    /// Conversion from definitions resolves names and cannot produce dangling
    /// indices, but grammars assembled programmatically go through this.
    pub fn check_references(&self) -> Result<(), GrammarError> {
        for fragment in &self.fragments {
            for part in &fragment.parts {
                match *part {
                    FragmentPart::Pattern(id) if id >= self.patterns.len() => {
                        return Err(GrammarError::UnknownPattern {
                            name: format!("#{}", id),
                            referenced_by: fragment.name.clone(),
                        });
                    }
                    FragmentPart::Fragment(id) if id >= self.fragments.len() => {
                        return Err(GrammarError::UnknownFragment {
                            name: format!("#{}", id),
                            referenced_by: fragment.name.clone(),
                        });
                    }
                    _ => {}
                }
            }
            for pattern in [
                fragment.start,
                fragment.end,
                fragment.parts_delimiter,
                fragment.parts_padding,
            ]
            .into_iter()
            .flatten()
            {
                if pattern >= self.patterns.len() {
                    return Err(GrammarError::UnknownPattern {
                        name: format!("#{}", pattern),
                        referenced_by: fragment.name.clone(),
                    });
                }
            }
        }
        if self.starting_fragment >= self.fragments.len() {
            return Err(GrammarError::UnknownStartingFragment {
                name: format!("#{}", self.starting_fragment),
            });
        }
        Ok(())
    }
}
