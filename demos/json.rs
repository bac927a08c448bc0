//! Match a JSON document against a grammar written in grammar text and print
//! the resulting tree as XML.
//!
//! Run with: cargo run --example json

use fragmatch::{grammar_text, Matcher};

const GRAMMAR: &str = r#"language Json
start Value

Ws (noise) ::= \s+
LBrace ::= \{
RBrace ::= \}
LBrack ::= \[
RBrack ::= \]
Colon ::= :
Comma ::= ,
String ::= "(\\.|!".)*"
Number ::= -?\d+(\.\d+)?
True ::= true
False ::= false
Null ::= null

Value (mode one) := [Object] [Array] String Number True False Null
Object (start LBrace, end RBrace, mode multiple, delimiter Comma, min 0) := [Member]
Member (delimiter Colon) := String [Value]
Array (start LBrack, end RBrack, mode multiple, delimiter Comma, min 0) := [Value]
"#;

const DOCUMENT: &str = r#"{
    "name": "fragmatch",
    "tags": ["grammar", "matcher"],
    "scores": [1, -2.5, null],
    "nested": { "ok": true }
}"#;

fn main() {
    let definition = grammar_text::parse(GRAMMAR).unwrap_or_else(|e| {
        eprintln!("bad grammar: {}", e);
        std::process::exit(1);
    });
    let language = definition.to_matcher().unwrap_or_else(|e| {
        eprintln!("grammar did not compile: {}", e);
        std::process::exit(1);
    });

    let result = Matcher::new(&language).match_text(DOCUMENT);
    if result.success() {
        println!("{}", result.to_xml());
    } else if let Some((line, col)) = result.failure_position() {
        eprintln!("no match past line {}, column {}", line, col);
        std::process::exit(1);
    }
}
