//! # Path Tokenizer
//!
//! Maps the relative path of every column in a layout to a small integer so
//! that sparse fields can reference declared paths with a one-byte varint.
//! Token `0` is always the empty path. Paths not in the table are written
//! inline as `token_count + byte_len` followed by the UTF-8 text.

use hashbrown::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTokenizer {
    tokens: HashMap<String, u64>,
    strings: Vec<String>,
}

impl Default for StringTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTokenizer {
    pub fn new() -> Self {
        let mut tokenizer = Self {
            tokens: HashMap::new(),
            strings: Vec::new(),
        };
        tokenizer.add("");
        tokenizer
    }

    /// Returns the token for `path`, assigning the next one if it is new.
    pub fn add(&mut self, path: &str) -> u64 {
        if let Some(&token) = self.tokens.get(path) {
            return token;
        }
        let token = self.strings.len() as u64;
        self.tokens.insert(path.to_string(), token);
        self.strings.push(path.to_string());
        token
    }

    pub fn find_token(&self, path: &str) -> Option<u64> {
        self.tokens.get(path).copied()
    }

    pub fn string(&self, token: u64) -> Option<&str> {
        self.strings.get(token as usize).map(String::as_str)
    }

    pub fn count(&self) -> u64 {
        self.strings.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_token_zero() {
        let t = StringTokenizer::new();
        assert_eq!(t.find_token(""), Some(0));
        assert_eq!(t.count(), 1);
    }

    #[test]
    fn tokens_are_dense_and_deduplicated() {
        let mut t = StringTokenizer::new();
        assert_eq!(t.add("name"), 1);
        assert_eq!(t.add("age"), 2);
        assert_eq!(t.add("name"), 1);
        assert_eq!(t.count(), 3);
        assert_eq!(t.string(2), Some("age"));
        assert_eq!(t.string(3), None);
    }
}
