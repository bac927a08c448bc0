//! Thread-local cache of compiled regex fallbacks
//!
//! Regex compilation is expensive relative to a match attempt, and the same
//! fallback source is matched at many offsets during a single parse. Compiled
//! regexes are cached per thread keyed by source text. `regex::Regex` is
//! internally reference-counted, so handing out clones is cheap.

use regex::Regex;
use std::cell::RefCell;

thread_local! {
    static CACHE: RefCell<hashbrown::HashMap<String, Option<Regex>>> =
        RefCell::new(hashbrown::HashMap::new());
}

/// Compile `source` anchored at the match position, memoizing the result
///
/// Returns `None` if the source is not valid regex syntax. Failures are
/// cached too so a bad pattern is not re-compiled on every attempt.
pub fn get_or_compile(source: &str) -> Option<Regex> {
    CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(entry) = cache.get(source) {
            return entry.clone();
        }
        let compiled = Regex::new(&format!("\\A(?:{})", source)).ok();
        cache.insert(source.to_string(), compiled.clone());
        compiled
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_match() {
        let regex = get_or_compile("[0-9]+").unwrap();
        assert!(regex.find("12x").is_some_and(|m| m.range() == (0..2)));
        assert!(regex.find("x12").is_none());
    }

    #[test]
    fn test_invalid_source_cached_as_none() {
        assert!(get_or_compile("(unclosed").is_none());
        assert!(get_or_compile("(unclosed").is_none());
    }
}
