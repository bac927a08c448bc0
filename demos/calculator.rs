//! Evaluate arithmetic by walking the matched tree.
//!
//! The expression grammar reshapes the flat operand/operator list into a
//! binary tree, so evaluation is a straightforward recursive walk keyed by
//! fragment name.
//!
//! Run with: cargo run --example calculator

use fragmatch::{grammar_text, MatchView, Matcher};

const GRAMMAR: &str = r"language Calc
start Expr

Digits ::= \d+
Ws (noise) ::= \s+
LParen ::= \(
RParen ::= \)
MulOp ::= \*
DivOp ::= \/
PlusOp ::= \+
MinusOp ::= -

Expr (mode multiple, expression binary) := [Operand] [Mul] [Div] [Add] [Sub]
Operand (mode one, fall_through all) := [Paren] [Num]
Num := Digits
Paren (start LParen, end RParen) := [Expr]
Mul (start MulOp, order 1) :=
Div (start DivOp, order 1) :=
Add (start PlusOp, order 2) :=
Sub (start MinusOp, order 2) :=
";

fn eval(view: MatchView) -> f64 {
    match view.name() {
        "Expr" | "Paren" => eval(view.child(0).unwrap()),
        "Num" => view.text().parse().unwrap(),
        "Mul" => eval(view.child(0).unwrap()) * eval(view.child(1).unwrap()),
        "Div" => eval(view.child(0).unwrap()) / eval(view.child(1).unwrap()),
        "Add" => eval(view.child(0).unwrap()) + eval(view.child(1).unwrap()),
        "Sub" => eval(view.child(0).unwrap()) - eval(view.child(1).unwrap()),
        other => panic!("unexpected node {}", other),
    }
}

fn main() {
    let language = grammar_text::parse(GRAMMAR)
        .and_then(|def| def.to_matcher())
        .unwrap_or_else(|e| {
            eprintln!("grammar did not compile: {}", e);
            std::process::exit(1);
        });
    let matcher = Matcher::new(&language);

    for input in ["1 + 2 * 3", "(1 + 2) * 3", "10 / 4 - 1", "2 * (3 + 4) / 7"] {
        let result = matcher.match_text(input);
        if result.success() {
            println!("{} = {}", input, eval(result.root().unwrap()));
        } else {
            println!("{} did not match (offset {:?})", input, result.failure_offset());
        }
    }
}
