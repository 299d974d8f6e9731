//! Weighted lexeme index stored on each article and the free-text query
//! matched against it.
//!
//! The stored form mirrors a PostgreSQL `tsvector` literal
//! (`'lexeme':1A,4C 'other':2B`) so candidates can be narrowed with a plain
//! `LIKE` on any backend before ranking happens here.

use std::collections::BTreeMap;
use std::fmt;

use crate::models::shared::escape_like;

/// Positions kept per lexeme.
const MAX_POSITIONS: usize = 256;
/// Highest position recorded; later tokens share it.
const MAX_POSITION: u32 = 16_383;
/// Lexemes longer than this are not indexed.
const MAX_LEXEME_LEN: usize = 64;

const EXACT_QUALITY: f64 = 1.0;
const PREFIX_QUALITY: f64 = 0.8;
const FREQUENCY_FACTOR: f64 = 0.05;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "s", "same", "she", "should",
    "so", "some", "such", "t", "than", "that", "the", "their", "theirs", "them", "themselves",
    "then", "there", "these", "they", "this", "those", "through", "to", "too", "under", "until",
    "up", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "you", "your", "yours", "yourself", "yourselves",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Split on anything that is not alphanumeric and lower-case the pieces.
///
/// Markup, query operators and punctuation all act as separators.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Relevance class of the field a lexeme came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Weight {
    /// Title.
    A,
    /// Excerpt.
    B,
    /// Body.
    C,
}

impl Weight {
    pub fn factor(self) -> f64 {
        match self {
            Weight::A => 1.0,
            Weight::B => 0.4,
            Weight::C => 0.2,
        }
    }

    fn letter(self) -> char {
        match self {
            Weight::A => 'A',
            Weight::B => 'B',
            Weight::C => 'C',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c {
            'A' => Some(Weight::A),
            'B' => Some(Weight::B),
            'C' | 'D' => Some(Weight::C),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occurrence {
    pub position: u32,
    pub weight: Weight,
}

/// Lexemes of one article with their positions and weights.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchDocument {
    lexemes: BTreeMap<String, Vec<Occurrence>>,
}

impl SearchDocument {
    /// Index title (A), excerpt (B) and body (C) as one document.
    pub fn build(title: &str, excerpt: Option<&str>, content: &str) -> Self {
        let mut doc = Self::default();
        let mut position = 0u32;
        doc.add_field(title, Weight::A, &mut position);
        if let Some(excerpt) = excerpt {
            doc.add_field(excerpt, Weight::B, &mut position);
        }
        doc.add_field(content, Weight::C, &mut position);
        doc
    }

    fn add_field(&mut self, text: &str, weight: Weight, position: &mut u32) {
        for token in tokens(text) {
            *position = (*position + 1).min(MAX_POSITION);
            if token.chars().count() > MAX_LEXEME_LEN || is_stop_word(&token) {
                continue;
            }
            let occurrences = self.lexemes.entry(token).or_default();
            if occurrences.len() < MAX_POSITIONS {
                occurrences.push(Occurrence {
                    position: *position,
                    weight,
                });
            }
        }
    }

    /// Parse the stored text form. Malformed entries are skipped.
    pub fn parse(stored: &str) -> Self {
        let mut doc = Self::default();
        for entry in stored.split_whitespace() {
            let Some((quoted, positions)) = entry.rsplit_once(':') else {
                continue;
            };
            let Some(lexeme) = quoted
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .filter(|s| !s.is_empty())
            else {
                continue;
            };

            let occurrences: Vec<Occurrence> = positions
                .split(',')
                .filter_map(|p| {
                    let weight = p.chars().last().and_then(Weight::from_letter)?;
                    let position = p[..p.len() - 1].parse().ok()?;
                    Some(Occurrence { position, weight })
                })
                .collect();

            if !occurrences.is_empty() {
                doc.lexemes.insert(lexeme.to_string(), occurrences);
            }
        }
        doc
    }

    pub fn is_empty(&self) -> bool {
        self.lexemes.is_empty()
    }

    pub fn occurrences(&self, lexeme: &str) -> Option<&[Occurrence]> {
        self.lexemes.get(lexeme).map(Vec::as_slice)
    }

    /// Entries whose lexeme starts with `prefix`, in lexeme order.
    fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Vec<Occurrence>)> + 'a {
        self.lexemes
            .range(prefix.to_string()..)
            .take_while(move |(lexeme, _)| lexeme.starts_with(prefix))
    }
}

impl fmt::Display for SearchDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (lexeme, occurrences)) in self.lexemes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "'{lexeme}':")?;
            for (j, occ) in occurrences.iter().enumerate() {
                if j > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}{}", occ.position, occ.weight.letter())?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryTerm {
    pub lexeme: String,
    /// Matches any indexed lexeme starting with `lexeme`.
    pub prefix: bool,
}

/// Sanitized free-text query: every term must match, the last one as a prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    terms: Vec<QueryTerm>,
}

impl SearchQuery {
    /// Returns `None` when nothing searchable is left after sanitizing,
    /// in which case callers fall back to the default listing.
    pub fn parse(raw: &str) -> Option<Self> {
        let words: Vec<String> = tokens(raw)
            .filter(|t| t.chars().count() <= MAX_LEXEME_LEN && !is_stop_word(t))
            .collect();
        let last = words.len().checked_sub(1)?;

        let mut terms: Vec<QueryTerm> = Vec::with_capacity(words.len());
        for (i, lexeme) in words.into_iter().enumerate() {
            let prefix = i == last;
            match terms.iter_mut().find(|t| t.lexeme == lexeme) {
                // An exact requirement is stricter than a prefix one.
                Some(existing) => existing.prefix &= prefix,
                None => terms.push(QueryTerm { lexeme, prefix }),
            }
        }
        Some(Self { terms })
    }

    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }

    /// `LIKE` patterns over the stored index that every match must satisfy.
    ///
    /// Patterns use `\` as the escape character.
    pub fn like_patterns(&self) -> Vec<String> {
        self.terms
            .iter()
            .map(|term| {
                let lexeme = escape_like(&term.lexeme);
                if term.prefix {
                    format!("%'{lexeme}%")
                } else {
                    format!("%'{lexeme}':%")
                }
            })
            .collect()
    }

    /// Relevance of `doc`, or `None` if some term does not occur in it.
    pub fn score(&self, doc: &SearchDocument) -> Option<f64> {
        self.terms
            .iter()
            .map(|term| term_score(term, doc))
            .sum::<Option<f64>>()
    }
}

fn term_score(term: &QueryTerm, doc: &SearchDocument) -> Option<f64> {
    let mut best: Option<f64> = None;
    let mut count = 0usize;

    let mut consider = |quality: f64, occurrences: &[Occurrence]| {
        for occ in occurrences {
            let value = occ.weight.factor() * quality;
            best = Some(best.map_or(value, |b| b.max(value)));
        }
        count += occurrences.len();
    };

    if term.prefix {
        for (lexeme, occurrences) in doc.with_prefix(&term.lexeme) {
            let quality = if *lexeme == term.lexeme {
                EXACT_QUALITY
            } else {
                PREFIX_QUALITY
            };
            consider(quality, occurrences);
        }
    } else if let Some(occurrences) = doc.occurrences(&term.lexeme) {
        consider(EXACT_QUALITY, occurrences);
    }

    best.map(|b| b + FREQUENCY_FACTOR * (1.0 + count as f64).ln())
}
