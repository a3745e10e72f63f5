//! Token counting and top-k ranking.
//!
//! Ties in count are broken by first occurrence: of two tokens seen equally
//! often, the one that appeared earlier in the text ranks first. The same
//! order drives word-cloud layout, so both outputs are deterministic.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Number of keywords returned when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 5;

/// Token → count mapping that remembers the order tokens were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyMap {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` occurrences of `token`. A token's position is fixed by its
    /// first insertion, even when `n` is zero.
    pub fn add(&mut self, token: &str, n: usize) {
        match self.index.get(token) {
            Some(&slot) => self.entries[slot].1 += n,
            None => {
                self.index.insert(token.to_owned(), self.entries.len());
                self.entries.push((token.to_owned(), n));
            }
        }
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.index.get(token).map(|&slot| self.entries[slot].1)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn max_count(&self) -> usize {
        self.entries.iter().map(|&(_, n)| n).max().unwrap_or(0)
    }

    /// Entries in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(token, n)| (token.as_str(), *n))
    }

    /// Entries by descending count, ties in first-occurrence order.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self.iter().collect();
        // sort_by is stable, which is what makes the tie-break hold.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

impl<S: AsRef<str>> FromIterator<(S, usize)> for FrequencyMap {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        let mut map = FrequencyMap::new();
        for (token, n) in iter {
            map.add(token.as_ref(), n);
        }
        map
    }
}

impl Serialize for FrequencyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (token, n) in &self.entries {
            map.serialize_entry(token, n)?;
        }
        map.end()
    }
}

/// Multiset count of `tokens`.
pub fn count<I, S>(tokens: I) -> FrequencyMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut map = FrequencyMap::new();
    for token in tokens {
        map.add(token.as_ref(), 1);
    }
    map
}

/// The `k` most frequent tokens, most frequent first.
pub fn top_k(freq: &FrequencyMap, k: usize) -> Vec<String> {
    top_k_with_counts(freq, k)
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

pub fn top_k_with_counts(freq: &FrequencyMap, k: usize) -> Vec<(String, usize)> {
    freq.ranked()
        .into_iter()
        .take(k)
        .map(|(token, n)| (token.to_owned(), n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_a_multiset() {
        let freq = count(["台灣", "選舉", "台灣", "政治", "台灣", "選舉"]);
        assert_eq!(freq.get("台灣"), Some(3));
        assert_eq!(freq.get("選舉"), Some(2));
        assert_eq!(freq.get("政治"), Some(1));
        assert_eq!(freq.get("經濟"), None);
        assert_eq!(freq.len(), 3);
        assert_eq!(freq.total(), 6);
        assert_eq!(freq.max_count(), 3);
    }

    #[test]
    fn counts_do_not_depend_on_order() {
        let a = count(["甲", "乙", "甲"]);
        let b = count(["乙", "甲", "甲"]);
        for token in ["甲", "乙"] {
            assert_eq!(a.get(token), b.get(token));
        }
    }

    #[test]
    fn ties_keep_first_occurrence_order() {
        let freq: FrequencyMap = [("測試", 3), ("文章", 3), ("內容", 1)].into_iter().collect();
        assert_eq!(top_k(&freq, 2), vec!["測試", "文章"]);

        let freq: FrequencyMap = [("文章", 3), ("測試", 3), ("內容", 1)].into_iter().collect();
        assert_eq!(top_k(&freq, 2), vec!["文章", "測試"]);
    }

    #[test]
    fn top_k_is_bounded_by_distinct_tokens() {
        let freq = count(["a", "b", "a"]);
        assert_eq!(top_k(&freq, DEFAULT_TOP_K), vec!["a", "b"]);
        assert!(top_k(&freq, 0).is_empty());
        assert!(top_k(&FrequencyMap::new(), 3).is_empty());
    }

    #[test]
    fn top_k_with_counts_reports_counts() {
        let freq = count(["x", "y", "y", "z", "y", "x"]);
        assert_eq!(
            top_k_with_counts(&freq, 2),
            vec![("y".to_owned(), 3), ("x".to_owned(), 2)]
        );
    }

    #[test]
    fn serializes_in_first_occurrence_order() {
        let freq = count(["乙", "甲", "甲"]);
        assert_eq!(serde_json::to_string(&freq).unwrap(), r#"{"乙":1,"甲":2}"#);
    }
}
