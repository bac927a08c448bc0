//! Pattern mini-language reader
//!
//! Compiles pattern source text into a [`Pattern`] tree. The language is a
//! small regex-like surface:
//!
//! ```text
//! pattern     := '~'? '`'? alternation
//! alternation := sequence ('|' sequence)*
//! sequence    := unit+
//! unit        := '!'* atom quantifier?
//! atom        := '(' alternation ')' | '[' class ']' | '/' regex '/'
//!              | escape | '.' | char
//! quantifier  := '*' | '+' | '?' | '{' m (',' n?)? '}'
//! ```
//!
//! A leading `~` makes alphabetic literals case-insensitive; a leading
//! backtick requires the whole match to sit on word boundaries. Escapes are
//! `\d` `\l` `\s` `\w` for character classes, `\n` `\t` `\r` for control
//! characters, and `\<punct>` for literal metacharacters. `/…/` embeds a
//! regex for anything the mini-language cannot express.
//!
//! Quantifiers bind the single preceding unit, so `ab+` matches `a` followed
//! by one or more `b`.

use crate::error::GrammarError;
use crate::pattern::{Pattern, UNBOUNDED};
use crate::regex_cache;

/// Recursive-descent reader over pattern source text
pub struct PatternReader<'a> {
    source: &'a str,
    pos: usize,
    insensitive: bool,
}

impl<'a> PatternReader<'a> {
    /// Parse pattern source into a pattern tree
    pub fn parse(source: &'a str) -> Result<Pattern, GrammarError> {
        let mut reader = PatternReader {
            source,
            pos: 0,
            insensitive: false,
        };
        reader.read_pattern()
    }

    fn read_pattern(&mut self) -> Result<Pattern, GrammarError> {
        if self.eat('~') {
            self.insensitive = true;
        }
        let whole_word = self.eat('`');
        let pattern = self.read_alternation()?;
        if let Some(c) = self.peek() {
            return Err(self.err(format!("unexpected {:?}", c)));
        }
        Ok(if whole_word {
            Pattern::WholeWord(Box::new(pattern))
        } else {
            pattern
        })
    }

    fn read_alternation(&mut self) -> Result<Pattern, GrammarError> {
        let mut alternatives = vec![self.read_sequence()?];
        while self.eat('|') {
            alternatives.push(self.read_sequence()?);
        }
        Ok(if alternatives.len() == 1 {
            alternatives.pop().unwrap()
        } else {
            Pattern::Or(alternatives)
        })
    }

    fn read_sequence(&mut self) -> Result<Pattern, GrammarError> {
        let mut units: Vec<Pattern> = Vec::new();
        while !matches!(self.peek(), None | Some(')') | Some('|')) {
            let unit = self.read_unit()?;
            // Adjacent plain literals coalesce into one substring match.
            match (units.last_mut(), &unit) {
                (Some(Pattern::Literal(prev)), Pattern::Literal(next)) => {
                    let mut merged = prev.to_string();
                    merged.push_str(next);
                    *prev = merged.into();
                }
                (Some(Pattern::InsensitiveLiteral(prev)), Pattern::InsensitiveLiteral(next)) => {
                    let mut merged = prev.to_string();
                    merged.push_str(next);
                    *prev = merged.into();
                }
                _ => units.push(unit),
            }
        }
        match units.len() {
            0 => Err(self.err("empty pattern".to_string())),
            1 => Ok(units.pop().unwrap()),
            _ => Ok(Pattern::Group(units)),
        }
    }

    fn read_unit(&mut self) -> Result<Pattern, GrammarError> {
        let mut negations = 0;
        while self.eat('!') {
            negations += 1;
        }
        let atom = self.read_atom()?;
        let mut pattern = self.read_quantifier(atom)?;
        for _ in 0..negations {
            pattern = Pattern::Not(Box::new(pattern));
        }
        Ok(pattern)
    }

    fn read_atom(&mut self) -> Result<Pattern, GrammarError> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Err(self.err("expected a pattern atom".to_string())),
        };
        match c {
            '(' => {
                self.bump();
                let inner = self.read_alternation()?;
                if !self.eat(')') {
                    return Err(self.err("unclosed group".to_string()));
                }
                Ok(inner)
            }
            '[' => {
                self.bump();
                self.read_class()
            }
            '/' => {
                self.bump();
                self.read_regex()
            }
            '\\' => {
                self.bump();
                self.read_escape()
            }
            '.' => {
                self.bump();
                Ok(Pattern::Any)
            }
            '*' | '+' | '?' | '{' => Err(self.err(format!("dangling quantifier {:?}", c))),
            ']' | '}' | '~' | '`' => Err(self.err(format!("unexpected {:?}", c))),
            c => {
                self.bump();
                Ok(self.literal(c))
            }
        }
    }

    fn read_escape(&mut self) -> Result<Pattern, GrammarError> {
        let c = match self.bump() {
            Some(c) => c,
            None => return Err(self.err("trailing backslash".to_string())),
        };
        Ok(match c {
            'd' => Pattern::Digit,
            'l' => Pattern::Letter,
            's' => Pattern::Whitespace,
            'w' => Pattern::WordChar,
            'n' => Pattern::Literal("\n".into()),
            't' => Pattern::Literal("\t".into()),
            'r' => Pattern::Literal("\r".into()),
            c if c.is_ascii_alphanumeric() => {
                return Err(self.err(format!("unknown escape \\{}", c)));
            }
            c => Pattern::Literal(c.to_string().into()),
        })
    }

    fn read_class(&mut self) -> Result<Pattern, GrammarError> {
        let mut items: Vec<Pattern> = Vec::new();
        loop {
            let c = match self.bump() {
                Some(']') => break,
                Some(c) => self.class_char(c)?,
                None => return Err(self.err("unclosed character class".to_string())),
            };
            // A `-` between two characters makes an inclusive range.
            if self.peek() == Some('-') && self.peek_at(1) != Some(']') {
                self.bump();
                let max = match self.bump() {
                    Some(c) => self.class_char(c)?,
                    None => return Err(self.err("unclosed character class".to_string())),
                };
                if max < c {
                    return Err(self.err(format!("inverted range {:?}-{:?}", c, max)));
                }
                items.push(Pattern::CharBounds { min: c, max });
            } else {
                items.push(Pattern::Literal(c.to_string().into()));
            }
        }
        match items.len() {
            0 => Err(self.err("empty character class".to_string())),
            1 => Ok(items.pop().unwrap()),
            _ => Ok(Pattern::Or(items)),
        }
    }

    fn class_char(&mut self, c: char) -> Result<char, GrammarError> {
        if c != '\\' {
            return Ok(c);
        }
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some(c) => Ok(c),
            None => Err(self.err("trailing backslash".to_string())),
        }
    }

    fn read_regex(&mut self) -> Result<Pattern, GrammarError> {
        let start = self.pos;
        let mut src = String::new();
        loop {
            match self.bump() {
                Some('/') => break,
                Some('\\') => match self.bump() {
                    // Only the delimiter is unescaped; regex escapes pass through.
                    Some('/') => src.push('/'),
                    Some(c) => {
                        src.push('\\');
                        src.push(c);
                    }
                    None => return Err(self.err("unclosed regex".to_string())),
                },
                Some(c) => src.push(c),
                None => return Err(self.err("unclosed regex".to_string())),
            }
        }
        if regex_cache::get_or_compile(&src).is_none() {
            return Err(GrammarError::PatternSyntax {
                pattern: self.source.to_string(),
                position: start,
                message: format!("invalid regex {:?}", src),
            });
        }
        Ok(Pattern::Regex(src.into()))
    }

    fn read_quantifier(&mut self, atom: Pattern) -> Result<Pattern, GrammarError> {
        let pattern = match self.peek() {
            Some('*') => {
                self.bump();
                Pattern::Wildcard(Box::new(atom))
            }
            Some('+') => {
                self.bump();
                Pattern::OneOrMore(Box::new(atom))
            }
            Some('?') => {
                self.bump();
                Pattern::Optional(Box::new(atom))
            }
            Some('{') => {
                self.bump();
                let min = self.read_count()?;
                let max = if self.eat(',') {
                    if self.peek() == Some('}') {
                        UNBOUNDED
                    } else {
                        self.read_count()?
                    }
                } else {
                    min
                };
                if !self.eat('}') {
                    return Err(self.err("unclosed repetition count".to_string()));
                }
                if max < min {
                    return Err(self.err(format!("inverted repetition count {}..{}", min, max)));
                }
                Pattern::CountBounds {
                    pattern: Box::new(atom),
                    min,
                    max,
                }
            }
            _ => atom,
        };
        Ok(pattern)
    }

    fn read_count(&mut self) -> Result<usize, GrammarError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        self.source[start..self.pos]
            .parse()
            .map_err(|_| self.err("expected a repetition count".to_string()))
    }

    #[inline]
    fn literal(&self, c: char) -> Pattern {
        if self.insensitive && c.is_alphabetic() {
            Pattern::InsensitiveLiteral(c.to_string().into())
        } else {
            Pattern::Literal(c.to_string().into())
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    #[inline]
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn err(&self, message: String) -> GrammarError {
        GrammarError::PatternSyntax {
            pattern: self.source.to_string(),
            position: self.pos,
            message,
        }
    }
}
