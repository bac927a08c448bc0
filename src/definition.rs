//! Declarative grammar definitions
//!
//! A [`LanguageDefinition`] is the serializable form of a grammar: pattern
//! source strings, fragments referencing patterns by name (or fragments by
//! `[bracketed]` name), and the top-level options. Definitions convert to
//! live [`LanguageMatcher`] graphs and back, and round-trip through JSON for
//! persistence.
//!
//! # Example
//!
//! ```rust
//! use fragmatch::{LanguageDefinition, Matcher};
//!
//! let def = LanguageDefinition::from_json(r#"{
//!     "name": "Letters",
//!     "patterns": [{ "name": "A", "pattern": "a+" }],
//!     "fragments": [{ "name": "Start", "parts": ["A"] }],
//!     "starting_fragment": "Start"
//! }"#).unwrap();
//! let lang = def.to_matcher().unwrap();
//! assert!(Matcher::new(&lang).match_text("aaa").success());
//! ```

use crate::error::GrammarError;
use crate::fragment::{
    ExpressionMode, FallThroughMode, FragmentMatcher, FragmentPart, MatchMode,
};
use crate::language::{IndexMode, LanguageMatcher};
use crate::pattern::{Pattern, PatternMatcher};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Serializable pattern declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternDefinition {
    /// Pattern name
    pub name: String,
    /// Pattern mini-language source
    pub pattern: String,
    /// Consumed but excluded from the tree
    pub is_noise: bool,
    /// Noise-separated adjacent matches coalesce
    pub is_mergable: bool,
    /// Defer tree construction until first use
    pub lazy: bool,
}

/// Serializable fragment declaration
///
/// `start`, `end`, `parts_delimiter`, and `parts_padding` name patterns;
/// `parts` entries name a pattern, or a fragment wrapped in brackets
/// (`"[Expr]"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentDefinition {
    pub name: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub parts: Vec<String>,
    pub mode: MatchMode,
    pub min_matched_parts: Option<usize>,
    pub parts_delimiter: Option<String>,
    pub parts_delimiter_required: bool,
    pub parts_padding: Option<String>,
    pub is_noise: bool,
    pub fall_through_mode: FallThroughMode,
    pub cacheable: bool,
    pub clear_cache: bool,
    pub expression_mode: ExpressionMode,
    pub expression_order: Option<usize>,
    pub bounds_as_parts: bool,
    pub discard_bounds: bool,
    pub negate: bool,
}

impl Default for FragmentDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            start: None,
            end: None,
            parts: Vec::new(),
            mode: MatchMode::Ordered,
            min_matched_parts: None,
            parts_delimiter: None,
            parts_delimiter_required: true,
            parts_padding: None,
            is_noise: false,
            fall_through_mode: FallThroughMode::None,
            cacheable: false,
            clear_cache: false,
            expression_mode: ExpressionMode::None,
            expression_order: None,
            bounds_as_parts: false,
            discard_bounds: false,
            negate: false,
        }
    }
}

/// Serializable grammar
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageDefinition {
    /// Grammar name
    pub name: String,
    /// Ordered pattern declarations
    pub patterns: Vec<PatternDefinition>,
    /// Ordered fragment declarations
    pub fragments: Vec<FragmentDefinition>,
    /// Name of the fragment matched by `match_text`
    pub starting_fragment: String,
    /// Token indexing strategy
    pub index_mode: IndexMode,
    /// Record a trace during matching
    pub log_matches: bool,
}

impl LanguageDefinition {
    /// Compile the definition into a live matcher graph
    pub fn to_matcher(&self) -> Result<LanguageMatcher, GrammarError> {
        let mut patterns = Vec::with_capacity(self.patterns.len());
        let mut pattern_ids: HashMap<&str, usize> = HashMap::with_capacity(self.patterns.len());
        for (id, def) in self.patterns.iter().enumerate() {
            let mut matcher = if def.lazy {
                PatternMatcher::compile_deferred(id, &def.name, &def.pattern)?
            } else {
                PatternMatcher::compile(id, &def.name, &def.pattern)?
            };
            matcher.is_noise = def.is_noise;
            matcher.is_mergable = def.is_mergable;
            if pattern_ids.insert(def.name.as_str(), id).is_some() {
                return Err(GrammarError::DuplicateName {
                    name: def.name.clone(),
                });
            }
            patterns.push(matcher);
        }

        // Resolution maps must reject duplicates here, before lookups run
        // against them, or a shadowed name would surface as an unknown
        // reference instead.
        let mut fragment_ids: HashMap<&str, usize> =
            HashMap::with_capacity(self.fragments.len());
        for (id, def) in self.fragments.iter().enumerate() {
            if fragment_ids.insert(def.name.as_str(), id).is_some() {
                return Err(GrammarError::DuplicateName {
                    name: def.name.clone(),
                });
            }
        }

        let resolve_pattern = |name: &Option<String>, by: &str| -> Result<Option<usize>, GrammarError> {
            match name {
                None => Ok(None),
                Some(name) => pattern_ids.get(name.as_str()).copied().map(Some).ok_or_else(
                    || GrammarError::UnknownPattern {
                        name: name.clone(),
                        referenced_by: by.to_string(),
                    },
                ),
            }
        };

        let mut fragments = Vec::with_capacity(self.fragments.len());
        for (id, def) in self.fragments.iter().enumerate() {
            let mut frag = FragmentMatcher::new(id, &def.name);
            frag.start = resolve_pattern(&def.start, &def.name)?;
            frag.end = resolve_pattern(&def.end, &def.name)?;
            frag.parts_delimiter = resolve_pattern(&def.parts_delimiter, &def.name)?;
            frag.parts_padding = resolve_pattern(&def.parts_padding, &def.name)?;
            for part in &def.parts {
                frag.parts.push(resolve_part(
                    part,
                    &pattern_ids,
                    &fragment_ids,
                    &def.name,
                )?);
            }
            frag.mode = def.mode;
            frag.min_matched_parts = def.min_matched_parts;
            frag.parts_delimiter_required = def.parts_delimiter_required;
            frag.is_noise = def.is_noise;
            frag.fall_through = def.fall_through_mode;
            frag.cacheable = def.cacheable;
            frag.clear_cache = def.clear_cache;
            frag.expression_mode = def.expression_mode;
            frag.expression_order = def.expression_order;
            frag.bounds_as_parts = def.bounds_as_parts;
            frag.discard_bounds = def.discard_bounds;
            frag.negate = def.negate;
            fragments.push(frag);
        }

        let starting = fragment_ids
            .get(self.starting_fragment.as_str())
            .copied()
            .ok_or_else(|| GrammarError::UnknownStartingFragment {
                name: self.starting_fragment.clone(),
            })?;

        LanguageMatcher::new(
            &self.name,
            patterns,
            fragments,
            starting,
            self.index_mode,
            self.log_matches,
        )
    }

    /// Export a live grammar back to its definition form
    pub fn from_matcher(lang: &LanguageMatcher) -> Self {
        let pattern_name = |id: Option<usize>| id.map(|id| lang.pattern(id).name.clone());
        Self {
            name: lang.name.clone(),
            patterns: lang
                .patterns
                .iter()
                .map(|p| PatternDefinition {
                    name: p.name.clone(),
                    pattern: p.to_pattern_string(),
                    is_noise: p.is_noise,
                    is_mergable: p.is_mergable,
                    lazy: matches!(p.pattern, Pattern::Deferred(_)),
                })
                .collect(),
            fragments: lang
                .fragments
                .iter()
                .map(|f| FragmentDefinition {
                    name: f.name.clone(),
                    start: pattern_name(f.start),
                    end: pattern_name(f.end),
                    parts: f
                        .parts
                        .iter()
                        .map(|part| match *part {
                            FragmentPart::Pattern(id) => lang.pattern(id).name.clone(),
                            FragmentPart::Fragment(id) => {
                                format!("[{}]", lang.fragment(id).name)
                            }
                        })
                        .collect(),
                    mode: f.mode,
                    min_matched_parts: f.min_matched_parts,
                    parts_delimiter: pattern_name(f.parts_delimiter),
                    parts_delimiter_required: f.parts_delimiter_required,
                    parts_padding: pattern_name(f.parts_padding),
                    is_noise: f.is_noise,
                    fall_through_mode: f.fall_through,
                    cacheable: f.cacheable,
                    clear_cache: f.clear_cache,
                    expression_mode: f.expression_mode,
                    expression_order: f.expression_order,
                    bounds_as_parts: f.bounds_as_parts,
                    discard_bounds: f.discard_bounds,
                    negate: f.negate,
                })
                .collect(),
            starting_fragment: lang.fragment(lang.starting_fragment).name.clone(),
            index_mode: lang.index_mode,
            log_matches: lang.log_matches,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn resolve_part(
    part: &str,
    pattern_ids: &HashMap<&str, usize>,
    fragment_ids: &HashMap<&str, usize>,
    referenced_by: &str,
) -> Result<FragmentPart, GrammarError> {
    if let Some(name) = part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
        return fragment_ids
            .get(name)
            .map(|&id| FragmentPart::Fragment(id))
            .ok_or_else(|| GrammarError::UnknownFragment {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            });
    }
    pattern_ids
        .get(part)
        .map(|&id| FragmentPart::Pattern(id))
        .ok_or_else(|| GrammarError::UnknownPattern {
            name: part.to_string(),
            referenced_by: referenced_by.to_string(),
        })
}
