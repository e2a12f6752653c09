//! Immutable set of normalised phrases.

use std::collections::BTreeSet;

use super::normalize;

/// A set of normalised phrases (one or more tokens each).
///
/// Built once per engine and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordSet {
    phrases: BTreeSet<String>,
    /// Token count of the longest phrase, bounds the token-window scan.
    max_tokens: usize,
}

impl WordSet {
    /// Normalise and collect `words`. Entries that normalise to empty are dropped.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases: BTreeSet<String> = words
            .into_iter()
            .map(|w| normalize(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        let max_tokens = phrases
            .iter()
            .map(|p| p.split(' ').count())
            .max()
            .unwrap_or(0);
        Self {
            phrases,
            max_tokens,
        }
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Whole-utterance membership. `text` must already be normalised.
    pub fn contains(&self, text: &str) -> bool {
        self.phrases.contains(text)
    }

    /// `text` is a non-empty prefix of (or equal to) some phrase: `"sto"` → `"stop"`.
    pub fn is_prefix_of_any(&self, text: &str) -> bool {
        !text.is_empty() && self.phrases.iter().any(|p| p.starts_with(text))
    }

    /// Some phrase is a prefix of `text`, i.e. the utterance is still growing
    /// past a complete phrase: `"stop"` → `"stop it"`.
    pub fn any_is_prefix_of(&self, text: &str) -> bool {
        !text.is_empty() && self.phrases.iter().any(|p| text.starts_with(p.as_str()))
    }

    /// First phrase found on token boundaries inside `text`.
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
        for start in 0..tokens.len() {
            let widest = self.max_tokens.min(tokens.len() - start);
            for width in (1..=widest).rev() {
                let window = tokens[start..start + width].join(" ");
                if let Some(found) = self.phrases.get(&window) {
                    return Some(found.as_str());
                }
            }
        }
        None
    }

    /// `text` is non-empty and made up entirely of phrases from this set
    /// (`"yeah yeah ok"`, `"uh hmm"`). Longest phrase wins at each position.
    pub fn covers(&self, text: &str) -> bool {
        let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            return false;
        }

        let mut pos = 0;
        'outer: while pos < tokens.len() {
            let widest = self.max_tokens.min(tokens.len() - pos);
            for width in (1..=widest).rev() {
                if self.phrases.contains(&tokens[pos..pos + width].join(" ")) {
                    pos += width;
                    continue 'outer;
                }
            }
            return false;
        }
        true
    }

    /// Phrases present in both sets, sorted.
    pub fn intersection(&self, other: &WordSet) -> Vec<String> {
        self.phrases.intersection(&other.phrases).cloned().collect()
    }
}
