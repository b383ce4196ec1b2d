use std::cmp::Ordering;

use crate::error::AdvisorError;
use crate::matcher::{dedup_preserving_order, effective_top_n, SymptomMatcher};

/// Lexical matcher: tiered string similarity instead of embeddings.
///
/// Scoring tiers, best first: exact phrase match, label contained in the
/// phrase, phrase contained in the label, then word-level overlap with a
/// bounded edit-distance fallback for near-misses. The top-N labels are
/// returned by rank regardless of absolute score; ties fall back to
/// vocabulary insertion order.
pub struct LexicalMatcher {
    vocabulary: Vec<String>,
    lowercase: Vec<String>,
}

impl LexicalMatcher {
    pub fn new(vocabulary: Vec<String>) -> Result<Self, AdvisorError> {
        let vocabulary = dedup_preserving_order(vocabulary);
        if vocabulary.is_empty() {
            return Err(AdvisorError::EmptyVocabulary);
        }
        let lowercase = vocabulary.iter().map(|l| l.to_lowercase()).collect();
        Ok(Self {
            vocabulary,
            lowercase,
        })
    }
}

impl SymptomMatcher for LexicalMatcher {
    fn resolve(&self, phrase: &str, top_n: usize) -> Result<Vec<String>, AdvisorError> {
        let k = effective_top_n(top_n, self.vocabulary.len())?;
        let phrase_lower = phrase.to_lowercase();

        let mut scored: Vec<(usize, f32)> = self
            .lowercase
            .iter()
            .enumerate()
            .map(|(idx, label)| (idx, similarity(&phrase_lower, label)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(idx, _)| self.vocabulary[idx].clone())
            .collect())
    }

    fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }
}

/// Both inputs must already be lowercased.
fn similarity(phrase: &str, label: &str) -> f32 {
    if phrase == label {
        return 1.0;
    }
    if !label.is_empty() && phrase.contains(label) {
        return 0.9;
    }
    if !phrase.is_empty() && label.contains(phrase) {
        return 0.8;
    }

    // Word-level overlap, capped below the whole-string tiers.
    let mut word_score: f32 = 0.0;
    for pw in phrase.split_whitespace() {
        for lw in label.split_whitespace() {
            if pw == lw {
                word_score += 0.5;
            } else if lw.starts_with(pw) || pw.starts_with(lw) {
                word_score += 0.3;
            } else {
                let max_dist = lw.chars().count().max(pw.chars().count()) / 3;
                if max_dist > 0 {
                    let lw_chars: Vec<char> = lw.chars().collect();
                    if levenshtein_with_max(pw, &lw_chars, max_dist) <= max_dist {
                        word_score += 0.2;
                    }
                }
            }
        }
    }
    word_score.min(0.6)
}

/// Levenshtein distance with an early-exit cap: returns a value within
/// `max_dist` when the true distance fits the bound, `max_dist + 1`
/// otherwise. Two-row dynamic programming over chars.
fn levenshtein_with_max(value: &str, needle_chars: &[char], max_dist: usize) -> usize {
    let n = needle_chars.len();
    if n == 0 {
        return 0;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, c) in value.chars().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for j in 1..=n {
            let cost = usize::from(c != needle_chars[j - 1]);
            let d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            curr[j] = d;
            row_min = row_min.min(d);
        }

        if row_min > max_dist {
            return max_dist + 1;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
