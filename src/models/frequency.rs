use std::collections::{HashMap, HashSet};

use super::AlignmentRow;

/// Structural tokens that never count as words
const STRUCTURAL_TOKENS: [&str; 2] = ["//", "--"];

/// Corpus word with its frequency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// The set of most frequent surface tokens in the corpus
#[derive(Debug, Clone, Default)]
pub struct FrequentWords {
    words: HashSet<String>,
}

impl FrequentWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Count A-side detokenized tokens and keep the `n` most frequent.
/// Ties keep the order of first appearance.
pub fn count_top_words(rows: &[AlignmentRow], n: usize) -> Vec<WordCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for token in rows.iter().flat_map(|r| r.a.tokens.iter()) {
        if STRUCTURAL_TOKENS.contains(&token.as_str()) {
            continue;
        }
        let count = counts.entry(token.as_str()).or_insert_with(|| {
            order.push(token.as_str());
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(usize, &str)> = order.into_iter().enumerate().collect();
    ranked.sort_by(|(ia, wa), (ib, wb)| counts[wb].cmp(&counts[wa]).then(ia.cmp(ib)));

    ranked
        .into_iter()
        .take(n)
        .map(|(_, word)| WordCount {
            word: word.to_string(),
            count: counts[word],
        })
        .collect()
}
