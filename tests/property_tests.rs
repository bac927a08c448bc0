//! Property-based tests using proptest
//!
//! Randomized inputs exercise the pattern mini-language, the printer
//! round-trip, and the equivalence of the three token index modes.

use fragmatch::{
    grammar_text, offset_to_line_col, IndexMode, Matcher, Pattern, PatternMatcher, PatternReader,
};
use proptest::prelude::*;

// =============================================================================
// Pattern mini-language
// =============================================================================

proptest! {
    /// `\d` matches exactly one digit
    #[test]
    fn test_digit_class(s in "[0-9]") {
        let p = PatternReader::parse("\\d").unwrap();
        prop_assert_eq!(p.is_match(&s, 0), Some(1));
    }

    /// `\l+` consumes a whole run of letters
    #[test]
    fn test_letter_run(s in "[a-zA-Z]{1,20}") {
        let p = PatternReader::parse("\\l+").unwrap();
        prop_assert_eq!(p.is_match(&s, 0), Some(s.len()));
    }

    /// `[a-z0-9_]+` agrees with a regex fallback of the same class
    #[test]
    fn test_class_agrees_with_regex(s in "[a-z0-9_]{1,20}x?") {
        let class = PatternReader::parse("[a-z0-9_]+").unwrap();
        let regex = PatternReader::parse("/[a-z0-9_]+/").unwrap();
        prop_assert_eq!(class.is_match(&s, 0), regex.is_match(&s, 0));
    }

    /// Counted repetition consumes between min and max matches
    #[test]
    fn test_counted_repetition(k in 0usize..10) {
        let p = PatternReader::parse("a{2,5}").unwrap();
        let text = "a".repeat(k);
        let expected = if k >= 2 { Some(k.min(5)) } else { None };
        prop_assert_eq!(p.is_match(&text, 0), expected);
    }

    /// A case-insensitive literal matches any casing of itself
    #[test]
    fn test_insensitive_literal(s in "[sS][eE][lL][eE][cC][tT]") {
        let p = PatternReader::parse("~select").unwrap();
        prop_assert_eq!(p.is_match(&s, 0), Some(s.len()));
    }
}

// =============================================================================
// Printer round-trip
// =============================================================================

proptest! {
    /// Any printable literal survives print-then-parse, escapes included
    #[test]
    fn test_literal_escaping_round_trip(s in "[ -~]{1,12}") {
        let matcher = PatternMatcher {
            id: 0,
            name: "Lit".to_string(),
            is_noise: false,
            is_mergable: false,
            pattern: Pattern::Literal(s.clone().into_boxed_str()),
        };
        let printed = matcher.to_pattern_string();
        let reparsed = PatternReader::parse(&printed).unwrap();
        prop_assert_eq!(
            reparsed.is_match(&s, 0),
            Some(s.len()),
            "literal {:?} printed as {:?}",
            s,
            printed
        );
    }

    /// Compiled pattern sources reprint to something that matches the same
    #[test]
    fn test_source_round_trip_on_digits(s in "[0-9]{0,8}\\.?[0-9]{0,4}") {
        let matcher = PatternMatcher::compile(0, "Num", "\\d+(\\.\\d+)?").unwrap();
        let reparsed =
            PatternMatcher::compile(0, "Num", &matcher.to_pattern_string()).unwrap();
        prop_assert_eq!(matcher.is_match(&s, 0), reparsed.is_match(&s, 0));
    }
}

// =============================================================================
// Index mode equivalence
// =============================================================================

fn list_outcome(mode: IndexMode, input: &str) -> (bool, usize, Option<usize>, String) {
    let mut def = grammar_text::parse(
        "Num ::= \\d+\n\
         Comma ::= ,\n\
         Ws (noise) ::= \\s+\n\
         List (mode multiple, delimiter Comma) := Num\n",
    )
    .unwrap();
    def.index_mode = mode;
    let lang = def.to_matcher().unwrap();
    let result = Matcher::new(&lang).match_text(input);
    (
        result.success(),
        result.end_offset(),
        result.failure_offset(),
        result.to_xml(),
    )
}

proptest! {
    /// All three index modes agree on arbitrary list-shaped input
    #[test]
    fn test_index_modes_agree(input in "([0-9]{1,3} ?,? ?){0,6}[a-z]?") {
        let direct = list_outcome(IndexMode::None, &input);
        let lazy = list_outcome(IndexMode::Lazy, &input);
        let eager = list_outcome(IndexMode::Eager, &input);
        prop_assert_eq!(&direct, &lazy, "lazy diverged on {:?}", &input);
        prop_assert_eq!(&direct, &eager, "eager diverged on {:?}", &input);
    }
}

// =============================================================================
// Offsets
// =============================================================================

proptest! {
    /// Line/column positions agree with a naive recount
    #[test]
    fn test_offset_to_line_col(text in "[a-c\\n]{0,30}", offset in 0usize..31) {
        let offset = offset.min(text.len());
        let (line, col) = offset_to_line_col(&text, offset);
        let naive_line = text[..offset].matches('\n').count() + 1;
        let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
        let naive_col = offset - line_start + 1;
        prop_assert_eq!((line, col), (naive_line, naive_col));
    }
}
