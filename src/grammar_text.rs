//! Compact grammar-text form
//!
//! A line-oriented notation for whole grammars, compiled through the same
//! pattern mini-language as [`LanguageDefinition`](crate::LanguageDefinition)
//! and round-trip convertible with it:
//!
//! ```text
//! language Calc
//! index lazy
//! start Expr
//!
//! # patterns use ::=, the right side is pattern source to end of line
//! Digits ::= \d+
//! Ws (noise) ::= \s+
//! PlusOp ::= \+
//!
//! # fragments use :=, parts name patterns or [fragments]
//! Expr (mode multiple, expression like_name) := [Num] [Add]
//! Num := Digits
//! Add (start PlusOp, order 1) :=
//! ```
//!
//! Flags and options sit in parentheses after the name. Lines starting with
//! `#` are comments; inline comments are not supported because `#` is legal
//! inside pattern source.

use crate::definition::{FragmentDefinition, LanguageDefinition, PatternDefinition};
use crate::error::GrammarError;
use crate::fragment::{ExpressionMode, FallThroughMode, MatchMode};
use crate::language::IndexMode;
use std::fmt::Write as _;

/// Parse grammar text into a definition
pub fn parse(text: &str) -> Result<LanguageDefinition, GrammarError> {
    let mut def = LanguageDefinition::default();
    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((head, source)) = line.split_once("::=") {
            def.patterns.push(parse_pattern(head, source, line_no)?);
        } else if let Some((head, parts)) = line.split_once(":=") {
            def.fragments.push(parse_fragment(head, parts, line_no)?);
        } else {
            parse_directive(&mut def, line, line_no)?;
        }
    }
    if def.starting_fragment.is_empty() {
        match def.fragments.first() {
            Some(first) => def.starting_fragment = first.name.clone(),
            None => {
                return Err(GrammarError::GrammarSyntax {
                    line: 0,
                    message: "grammar has no fragments".to_string(),
                })
            }
        }
    }
    Ok(def)
}

fn parse_directive(
    def: &mut LanguageDefinition,
    line: &str,
    line_no: usize,
) -> Result<(), GrammarError> {
    let mut words = line.split_whitespace();
    let keyword = words.next().unwrap_or("");
    let argument = words.next();
    let extra = words.next();
    if extra.is_some() {
        return Err(syntax(line_no, format!("unexpected text after {:?}", keyword)));
    }
    match (keyword, argument) {
        ("language", Some(name)) => def.name = name.to_string(),
        ("start", Some(name)) => def.starting_fragment = name.to_string(),
        ("index", Some(mode)) => {
            def.index_mode = match mode {
                "none" => IndexMode::None,
                "lazy" => IndexMode::Lazy,
                "eager" => IndexMode::Eager,
                other => return Err(syntax(line_no, format!("unknown index mode {:?}", other))),
            }
        }
        ("log", Some("matches")) => def.log_matches = true,
        _ => return Err(syntax(line_no, format!("unrecognized line {:?}", line))),
    }
    Ok(())
}

fn parse_pattern(
    head: &str,
    source: &str,
    line_no: usize,
) -> Result<PatternDefinition, GrammarError> {
    let (name, options) = parse_head(head, line_no)?;
    let mut def = PatternDefinition {
        name,
        pattern: source.trim().to_string(),
        ..Default::default()
    };
    if def.pattern.is_empty() {
        return Err(syntax(line_no, format!("pattern {} has no source", def.name)));
    }
    for option in &options {
        let option: Vec<&str> = option.iter().map(String::as_str).collect();
        match option.as_slice() {
            ["noise"] => def.is_noise = true,
            ["mergable"] => def.is_mergable = true,
            ["lazy"] => def.lazy = true,
            other => {
                return Err(syntax(
                    line_no,
                    format!("unknown pattern flag {:?}", other.join(" ")),
                ))
            }
        }
    }
    Ok(def)
}

fn parse_fragment(
    head: &str,
    parts: &str,
    line_no: usize,
) -> Result<FragmentDefinition, GrammarError> {
    let (name, options) = parse_head(head, line_no)?;
    let mut def = FragmentDefinition {
        name,
        ..Default::default()
    };
    for part in parts.split_whitespace() {
        let valid = match part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
            Some(fragment) => is_ident(fragment),
            None => is_ident(part),
        };
        if !valid {
            return Err(syntax(line_no, format!("malformed part {:?}", part)));
        }
        def.parts.push(part.to_string());
    }
    for option in &options {
        let option: Vec<&str> = option.iter().map(String::as_str).collect();
        match option.as_slice() {
            ["mode", "ordered"] => def.mode = MatchMode::Ordered,
            ["mode", "one"] => def.mode = MatchMode::One,
            ["mode", "multiple"] => def.mode = MatchMode::Multiple,
            ["min", n] => def.min_matched_parts = Some(parse_number(n, line_no)?),
            ["start", p] => def.start = Some(p.to_string()),
            ["end", p] => def.end = Some(p.to_string()),
            ["delimiter", p] => def.parts_delimiter = Some(p.to_string()),
            ["optional_delimiter"] => def.parts_delimiter_required = false,
            ["padding", p] => def.parts_padding = Some(p.to_string()),
            ["noise"] => def.is_noise = true,
            ["negate"] => def.negate = true,
            ["cacheable"] => def.cacheable = true,
            ["clear_cache"] => def.clear_cache = true,
            ["expression", "binary"] => def.expression_mode = ExpressionMode::BinaryTree,
            ["expression", "like_name"] => def.expression_mode = ExpressionMode::LikeNameTree,
            ["order", n] => def.expression_order = Some(parse_number(n, line_no)?),
            ["fall_through", "all"] => def.fall_through_mode = FallThroughMode::All,
            ["fall_through", n] => {
                def.fall_through_mode = FallThroughMode::One(parse_number(n, line_no)?)
            }
            ["bounds_as_parts"] => def.bounds_as_parts = true,
            ["discard_bounds"] => def.discard_bounds = true,
            other => {
                return Err(syntax(
                    line_no,
                    format!("unknown fragment option {:?}", other.join(" ")),
                ))
            }
        }
    }
    Ok(def)
}

/// `Name` or `Name (option, option)` before the defining operator
fn parse_head(head: &str, line_no: usize) -> Result<(String, Vec<Vec<String>>), GrammarError> {
    let head = head.trim();
    let (name, options) = match head.split_once('(') {
        None => (head, Vec::new()),
        Some((name, rest)) => {
            let inner = rest
                .trim_end()
                .strip_suffix(')')
                .ok_or_else(|| syntax(line_no, "unclosed option list".to_string()))?;
            let options = inner
                .split(',')
                .map(|o| o.split_whitespace().map(str::to_string).collect())
                .collect();
            (name.trim_end(), options)
        }
    };
    if !is_ident(name) {
        return Err(syntax(line_no, format!("invalid name {:?}", name)));
    }
    Ok((name.to_string(), options))
}

fn parse_number(text: &str, line_no: usize) -> Result<usize, GrammarError> {
    text.parse()
        .map_err(|_| syntax(line_no, format!("expected a number, found {:?}", text)))
}

fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn syntax(line: usize, message: String) -> GrammarError {
    GrammarError::GrammarSyntax { line, message }
}

/// Render a definition as grammar text
///
/// Only non-default options are written, so `parse(write(def))` reproduces
/// the definition.
pub fn write(def: &LanguageDefinition) -> String {
    let mut out = String::new();
    if !def.name.is_empty() {
        let _ = writeln!(out, "language {}", def.name);
    }
    if def.index_mode != IndexMode::None {
        let mode = match def.index_mode {
            IndexMode::None => "none",
            IndexMode::Lazy => "lazy",
            IndexMode::Eager => "eager",
        };
        let _ = writeln!(out, "index {}", mode);
    }
    if !def.starting_fragment.is_empty() {
        let _ = writeln!(out, "start {}", def.starting_fragment);
    }
    if def.log_matches {
        out.push_str("log matches\n");
    }
    out.push('\n');
    for pattern in &def.patterns {
        let mut flags = Vec::new();
        if pattern.is_noise {
            flags.push("noise".to_string());
        }
        if pattern.is_mergable {
            flags.push("mergable".to_string());
        }
        if pattern.lazy {
            flags.push("lazy".to_string());
        }
        let _ = writeln!(
            out,
            "{}{} ::= {}",
            pattern.name,
            format_options(&flags),
            pattern.pattern
        );
    }
    out.push('\n');
    for fragment in &def.fragments {
        let mut options = Vec::new();
        match fragment.mode {
            MatchMode::Ordered => {}
            MatchMode::One => options.push("mode one".to_string()),
            MatchMode::Multiple => options.push("mode multiple".to_string()),
        }
        if let Some(min) = fragment.min_matched_parts {
            options.push(format!("min {}", min));
        }
        if let Some(p) = &fragment.start {
            options.push(format!("start {}", p));
        }
        if let Some(p) = &fragment.end {
            options.push(format!("end {}", p));
        }
        if let Some(p) = &fragment.parts_delimiter {
            options.push(format!("delimiter {}", p));
        }
        if !fragment.parts_delimiter_required {
            options.push("optional_delimiter".to_string());
        }
        if let Some(p) = &fragment.parts_padding {
            options.push(format!("padding {}", p));
        }
        if fragment.is_noise {
            options.push("noise".to_string());
        }
        if fragment.negate {
            options.push("negate".to_string());
        }
        if fragment.cacheable {
            options.push("cacheable".to_string());
        }
        if fragment.clear_cache {
            options.push("clear_cache".to_string());
        }
        match fragment.expression_mode {
            ExpressionMode::None => {}
            ExpressionMode::BinaryTree => options.push("expression binary".to_string()),
            ExpressionMode::LikeNameTree => options.push("expression like_name".to_string()),
        }
        if let Some(order) = fragment.expression_order {
            options.push(format!("order {}", order));
        }
        match fragment.fall_through_mode {
            FallThroughMode::None => {}
            FallThroughMode::One(n) => options.push(format!("fall_through {}", n)),
            FallThroughMode::All => options.push("fall_through all".to_string()),
        }
        if fragment.bounds_as_parts {
            options.push("bounds_as_parts".to_string());
        }
        if fragment.discard_bounds {
            options.push("discard_bounds".to_string());
        }
        let _ = writeln!(
            out,
            "{}{} := {}",
            fragment.name,
            format_options(&options),
            fragment.parts.join(" ")
        );
    }
    out
}

fn format_options(options: &[String]) -> String {
    if options.is_empty() {
        String::new()
    } else {
        format!(" ({})", options.join(", "))
    }
}
