use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9']+").expect("valid regex"));

/// Curated low-information words dropped from indexing and matching.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "is", "it",
    "of", "on", "or", "that", "the", "this", "to", "was", "were", "what", "when", "where",
    "which", "who", "why", "will", "with",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Lowercase `text` and split it into maximal runs of ASCII letters, digits
/// and apostrophes. Everything else separates tokens.
pub fn tokenize(text: &str, remove_stopwords: bool) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|tok| !remove_stopwords || !is_stopword(tok))
        .map(str::to_string)
        .collect()
}

pub fn term_frequencies(tokens: &[String]) -> HashMap<String, usize> {
    let mut tf = HashMap::new();
    for token in tokens {
        *tf.entry(token.clone()).or_insert(0) += 1;
    }
    tf
}

/// Number of documents each term occurs in at least once.
pub fn document_frequency<'a, I>(documents: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a Vec<String>>,
{
    let mut df = HashMap::new();
    for tokens in documents {
        let unique: HashSet<&String> = tokens.iter().collect();
        for token in unique {
            *df.entry(token.clone()).or_insert(0) += 1;
        }
    }
    df
}

pub fn unique_preserve_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
