//! Grammar serialization round-trips
//!
//! A grammar should survive any path through its three forms: definition,
//! grammar text, and JSON. These tests exercise the conversions with every
//! fragment option set, minimal inputs relying on serde defaults, and the
//! error cases for bad references and duplicate names.

use fragmatch::{
    grammar_text, ExpressionMode, FallThroughMode, FragmentDefinition, GrammarError, IndexMode,
    LanguageDefinition, MatchMode, Matcher, PatternDefinition,
};

/// A grammar with every pattern flag and fragment option exercised somewhere.
fn kitchen_sink() -> LanguageDefinition {
    let pattern = |name: &str, source: &str| PatternDefinition {
        name: name.to_string(),
        pattern: source.to_string(),
        ..Default::default()
    };
    LanguageDefinition {
        name: "Sink".to_string(),
        patterns: vec![
            pattern("Word", "\\l+"),
            PatternDefinition {
                is_noise: true,
                ..pattern("Ws", "\\s+")
            },
            PatternDefinition {
                is_mergable: true,
                ..pattern("Digits", "\\d+")
            },
            PatternDefinition {
                lazy: true,
                ..pattern("Key", "~`let")
            },
            pattern("Comma", ","),
            pattern("LParen", "\\("),
            pattern("RParen", "\\)"),
            pattern("PlusOp", "\\+"),
        ],
        fragments: vec![
            FragmentDefinition {
                name: "Start".to_string(),
                parts: vec!["[List]".to_string(), "[Expr]".to_string()],
                mode: MatchMode::One,
                ..Default::default()
            },
            FragmentDefinition {
                name: "List".to_string(),
                start: Some("LParen".to_string()),
                end: Some("RParen".to_string()),
                parts: vec!["Word".to_string(), "Digits".to_string()],
                mode: MatchMode::Multiple,
                min_matched_parts: Some(0),
                parts_delimiter: Some("Comma".to_string()),
                parts_delimiter_required: false,
                parts_padding: Some("Ws".to_string()),
                bounds_as_parts: true,
                cacheable: true,
                ..Default::default()
            },
            FragmentDefinition {
                name: "Expr".to_string(),
                parts: vec!["[Num]".to_string(), "[Add]".to_string()],
                mode: MatchMode::Multiple,
                expression_mode: ExpressionMode::BinaryTree,
                clear_cache: true,
                ..Default::default()
            },
            FragmentDefinition {
                name: "Num".to_string(),
                parts: vec!["Digits".to_string()],
                fall_through_mode: FallThroughMode::One(1),
                ..Default::default()
            },
            FragmentDefinition {
                name: "Add".to_string(),
                start: Some("PlusOp".to_string()),
                expression_order: Some(1),
                ..Default::default()
            },
            FragmentDefinition {
                name: "NotKey".to_string(),
                parts: vec!["Key".to_string()],
                negate: true,
                is_noise: true,
                discard_bounds: true,
                ..Default::default()
            },
        ],
        starting_fragment: "Start".to_string(),
        index_mode: IndexMode::Eager,
        log_matches: true,
    }
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn test_json_round_trip_preserves_everything() {
    let def = kitchen_sink();
    let json = def.to_json().unwrap();
    let parsed = LanguageDefinition::from_json(&json).unwrap();
    assert_eq!(def.to_json().unwrap(), parsed.to_json().unwrap());
    assert!(parsed.to_matcher().is_ok());
}

#[test]
fn test_json_defaults_fill_missing_fields() {
    let def = LanguageDefinition::from_json(
        r#"{
            "name": "Tiny",
            "patterns": [{ "name": "A", "pattern": "a" }],
            "fragments": [{ "name": "Start", "parts": ["A"] }],
            "starting_fragment": "Start"
        }"#,
    )
    .unwrap();
    assert_eq!(def.index_mode, IndexMode::None);
    assert!(!def.log_matches);
    let frag = &def.fragments[0];
    assert_eq!(frag.mode, MatchMode::Ordered);
    assert!(frag.parts_delimiter_required);
    assert_eq!(frag.fall_through_mode, FallThroughMode::None);
    let lang = def.to_matcher().unwrap();
    assert!(Matcher::new(&lang).match_text("a").success());
}

#[test]
fn test_enums_serialize_as_snake_case() {
    let json = kitchen_sink().to_json().unwrap();
    assert!(json.contains("\"index_mode\": \"eager\""));
    assert!(json.contains("\"mode\": \"multiple\""));
    assert!(json.contains("\"expression_mode\": \"binary_tree\""));
}

// ============================================================================
// Matcher export
// ============================================================================

#[test]
fn test_matcher_export_reproduces_definition() {
    let def = kitchen_sink();
    let lang = def.to_matcher().unwrap();
    let exported = LanguageDefinition::from_matcher(&lang);
    // Pattern sources are reprinted from the compiled trees, so compare by
    // recompiling rather than by string.
    assert_eq!(exported.fragments.len(), def.fragments.len());
    assert_eq!(exported.starting_fragment, "Start");
    assert!(exported.patterns[3].lazy);
    assert_eq!(exported.fragments[1].parts_delimiter.as_deref(), Some("Comma"));
    let lang2 = exported.to_matcher().unwrap();
    for input in ["(ab, 12)", "1+2+3", "()", "1+"] {
        let r1 = Matcher::new(&lang).match_text(input);
        let r2 = Matcher::new(&lang2).match_text(input);
        assert_eq!(r1.success(), r2.success(), "on {:?}", input);
        assert_eq!(r1.to_xml(), r2.to_xml(), "on {:?}", input);
    }
}

// ============================================================================
// Grammar text
// ============================================================================

#[test]
fn test_grammar_text_round_trip() {
    let def = kitchen_sink();
    let text = grammar_text::write(&def);
    let reparsed = grammar_text::parse(&text).unwrap();
    assert_eq!(def.to_json().unwrap(), reparsed.to_json().unwrap());
}

#[test]
fn test_grammar_text_to_json_and_back() {
    let text = "\
        language Letters\n\
        A ::= a+\n\
        Start := A\n";
    let def = grammar_text::parse(text).unwrap();
    let json = def.to_json().unwrap();
    let reparsed = LanguageDefinition::from_json(&json).unwrap();
    let lang = reparsed.to_matcher().unwrap();
    assert!(Matcher::new(&lang).match_text("aaa").success());
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_unknown_reference_errors_name_both_sides() {
    let mut def = kitchen_sink();
    def.fragments[0].parts = vec!["[Ghost]".to_string()];
    match def.to_matcher().unwrap_err() {
        GrammarError::UnknownFragment {
            name,
            referenced_by,
        } => {
            assert_eq!(name, "Ghost");
            assert_eq!(referenced_by, "Start");
        }
        other => panic!("unexpected error {}", other),
    }

    let mut def = kitchen_sink();
    def.fragments[1].parts_padding = Some("Ghost".to_string());
    assert!(matches!(
        def.to_matcher(),
        Err(GrammarError::UnknownPattern { .. })
    ));
}

#[test]
fn test_duplicate_names_rejected() {
    let mut def = kitchen_sink();
    def.patterns[1].name = "Word".to_string();
    assert!(matches!(
        def.to_matcher(),
        Err(GrammarError::DuplicateName { .. })
    ));

    let mut def = kitchen_sink();
    def.fragments[5].name = "Start".to_string();
    assert!(matches!(
        def.to_matcher(),
        Err(GrammarError::DuplicateName { .. })
    ));
}

#[test]
fn test_bad_pattern_source_surfaces_position() {
    let mut def = kitchen_sink();
    def.patterns[0].pattern = "a(b".to_string();
    match def.to_matcher().unwrap_err() {
        GrammarError::PatternSyntax { position, .. } => assert_eq!(position, 3),
        other => panic!("unexpected error {}", other),
    }
}
