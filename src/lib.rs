//! Grammar-driven text matching with interchangeable indexing strategies.
//!
//! `fragmatch` compiles a grammar of character-level patterns and named rule
//! fragments, then matches text by backtracking recursive descent with
//! packrat-style memoization. The result is a span tree over the input with
//! noise suppressed, mergable tokens coalesced, and operator expressions
//! reshaped by precedence. On failure the deepest offset reached across all
//! backtracking is reported, the standard PEG diagnostic position.
//!
//! Grammars come from three equivalent forms: programmatic construction,
//! a serde-backed [`LanguageDefinition`], or the compact [`grammar_text`]
//! notation. Three token indexing strategies ([`IndexMode`]) share one
//! contract and produce identical results.
//!
//! # Example
//!
//! ```rust
//! use fragmatch::{grammar_text, Matcher};
//!
//! let def = grammar_text::parse("
//!     language List
//!     Num ::= \\d+
//!     Comma ::= ,
//!     Start (delimiter Comma) := Num Num
//! ").unwrap();
//! let lang = def.to_matcher().unwrap();
//! let result = Matcher::new(&lang).match_text("4,2");
//! assert!(result.success());
//! assert_eq!(
//!     result.to_xml(),
//!     "<Start><Num>4</Num><Comma>,</Comma><Num>2</Num></Start>",
//! );
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::redundant_closure)]

pub mod arena;
pub mod definition;
pub mod engine;
pub mod error;
pub mod expression;
pub mod fragment;
pub mod grammar_text;
pub mod language;
pub mod match_data;
pub mod pattern;
pub mod reader;
mod regex_cache;
pub mod trace;

pub use arena::{MatchArena, Node, NodeId};
pub use definition::{FragmentDefinition, LanguageDefinition, PatternDefinition};
pub use engine::{Cursor, DirectScan, EagerIndex, LazyIndex, Matcher, Token, TokenSource};
pub use error::GrammarError;
pub use fragment::{ExpressionMode, FallThroughMode, FragmentMatcher, FragmentPart, MatchMode};
pub use language::{IndexMode, LanguageMatcher};
pub use match_data::{offset_to_line_col, MatchView, MatcherResult};
pub use pattern::{Pattern, PatternMatcher};
pub use reader::PatternReader;
pub use trace::{MatchTrace, TraceEvent};
