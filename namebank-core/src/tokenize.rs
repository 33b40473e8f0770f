//! Identifier name tokenization.
//!
//! The store calls a [`Tokenizer`] once per new identifier name and persists
//! the resulting token sequence. Reads never re-tokenize.

use serde::{Deserialize, Serialize};

/// Splits an identifier name into its component words, in order.
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    fn tokenize(&self, name: &str) -> Vec<String>;
}

/// How aggressively [`IdentifierTokenizer`] splits names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerOptions {
    /// Also split at letter/digit boundaries (`utf8Decoder` → `utf`, `8`, `Decoder`).
    pub recursive_split: bool,
    /// Expand modal contractions into two tokens (`cantStop` → `can`, `not`, `Stop`).
    pub modal_expansion: bool,
}

/// Default tokenizer: separators, camelCase and acronym boundaries.
#[derive(Debug, Clone, Default)]
pub struct IdentifierTokenizer {
    options: TokenizerOptions,
}

impl IdentifierTokenizer {
    pub fn new(options: TokenizerOptions) -> Self {
        Self { options }
    }

    fn split_word(&self, word: &str, tokens: &mut Vec<String>) {
        let chars: Vec<char> = word.chars().collect();
        let mut current = String::new();

        for (i, &ch) in chars.iter().enumerate() {
            if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
                let next = chars.get(i + 1).copied();
                let camel = ch.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit());
                // HTMLParser: the last capital of a run starts the next word
                let acronym_end = ch.is_uppercase()
                    && prev.is_uppercase()
                    && next.is_some_and(char::is_lowercase);
                let digit_edge =
                    self.options.recursive_split && ch.is_ascii_digit() != prev.is_ascii_digit();

                if (camel || acronym_end || digit_edge) && !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            current.push(ch);
        }

        if !current.is_empty() {
            tokens.push(current);
        }
    }
}

impl Tokenizer for IdentifierTokenizer {
    fn tokenize(&self, name: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in name.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            self.split_word(word, &mut tokens);
        }
        if self.options.modal_expansion {
            tokens = tokens
                .into_iter()
                .flat_map(|token| match contraction(&token.to_lowercase()) {
                    Some((modal, negation)) => vec![modal.to_string(), negation.to_string()],
                    None => vec![token],
                })
                .collect();
        }
        tokens
    }
}

const MODAL_CONTRACTIONS: &[(&str, &str, &str)] = &[
    ("arent", "are", "not"),
    ("cant", "can", "not"),
    ("couldnt", "could", "not"),
    ("didnt", "did", "not"),
    ("doesnt", "does", "not"),
    ("dont", "do", "not"),
    ("hadnt", "had", "not"),
    ("hasnt", "has", "not"),
    ("havent", "have", "not"),
    ("isnt", "is", "not"),
    ("mightnt", "might", "not"),
    ("mustnt", "must", "not"),
    ("neednt", "need", "not"),
    ("shant", "shall", "not"),
    ("shouldnt", "should", "not"),
    ("wasnt", "was", "not"),
    ("werent", "were", "not"),
    ("wont", "will", "not"),
    ("wouldnt", "would", "not"),
];

fn contraction(word: &str) -> Option<(&'static str, &'static str)> {
    MODAL_CONTRACTIONS
        .iter()
        .find(|(contraction, _, _)| *contraction == word)
        .map(|(_, modal, negation)| (*modal, *negation))
}

/// Replace each modal contraction with its two-word expansion.
pub fn modal_expand(tokens: &[String]) -> Vec<String> {
    let mut expanded = Vec::with_capacity(tokens.len());
    for token in tokens {
        match contraction(token) {
            Some((modal, negation)) => {
                expanded.push(modal.to_string());
                expanded.push(negation.to_string());
            }
            None => expanded.push(token.clone()),
        }
    }
    expanded
}

/// Merge the particle `sub` with the token that follows it:
/// `topic sub menu` becomes `topic submenu`.
pub fn sub_concatenate(tokens: &[String]) -> Vec<String> {
    let mut merged = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if token == "sub" {
            if let Some(next) = iter.next() {
                merged.push(format!("{token}{next}"));
                continue;
            }
        }
        merged.push(token.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(name: &str) -> Vec<String> {
        IdentifierTokenizer::default().tokenize(name)
    }

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    #[test]
    fn splits_camel_case() {
        assert_eq!(split("getFooBar"), strings(&["get", "Foo", "Bar"]));
        assert_eq!(split("FooBar"), strings(&["Foo", "Bar"]));
    }

    #[test]
    fn splits_separators() {
        assert_eq!(split("MAX_VALUE"), strings(&["MAX", "VALUE"]));
        assert_eq!(split("$tmp_count"), strings(&["tmp", "count"]));
        assert_eq!(split("__init__"), strings(&["init"]));
    }

    #[test]
    fn keeps_acronyms_together() {
        assert_eq!(split("getHTMLParser"), strings(&["get", "HTML", "Parser"]));
        assert_eq!(split("URL"), strings(&["URL"]));
    }

    #[test]
    fn digits_stay_attached_by_default() {
        assert_eq!(split("utf8Decoder"), strings(&["utf8", "Decoder"]));
    }

    #[test]
    fn recursive_split_separates_digits() {
        let tokenizer = IdentifierTokenizer::new(TokenizerOptions {
            recursive_split: true,
            modal_expansion: false,
        });
        assert_eq!(
            tokenizer.tokenize("utf8Decoder"),
            strings(&["utf", "8", "Decoder"])
        );
    }

    #[test]
    fn modal_expansion_option_expands_while_splitting() {
        let tokenizer = IdentifierTokenizer::new(TokenizerOptions {
            recursive_split: false,
            modal_expansion: true,
        });
        assert_eq!(
            tokenizer.tokenize("cantStop"),
            strings(&["can", "not", "Stop"])
        );
    }

    #[test]
    fn empty_and_symbol_only_names() {
        assert!(split("").is_empty());
        assert!(split("#").is_empty());
    }

    #[test]
    fn modal_expansion() {
        assert_eq!(
            modal_expand(&strings(&["cant", "stop"])),
            strings(&["can", "not", "stop"])
        );
        assert_eq!(modal_expand(&strings(&["stop"])), strings(&["stop"]));
    }

    #[test]
    fn sub_concatenation() {
        assert_eq!(
            sub_concatenate(&strings(&["topic", "sub", "menu"])),
            strings(&["topic", "submenu"])
        );
        assert_eq!(
            sub_concatenate(&strings(&["menu", "sub"])),
            strings(&["menu", "sub"])
        );
    }
}
