//! Sentence search over a document's visible text

use regex::{Regex, RegexBuilder};

/// Options controlling [`Document::search`](super::Document::search)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Match letter case exactly
    pub case_sensitive: bool,

    /// Match the query as one phrase; when false any single query word matches
    pub whole_sentence: bool,

    /// Maximum snippet length in characters; 0 disables truncation
    pub sentence_limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            whole_sentence: true,
            sentence_limit: 80,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escapes a query word, anchoring each edge that is a word character
///
/// Non-word edges such as the `+` in `C++` stay unanchored; a boundary
/// there would demand a word character on the far side.
fn bounded(word: &str) -> String {
    let mut pattern = String::new();
    if word.chars().next().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(word));
    if word.chars().last().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern
}

/// Builds the query regex, or `None` if the query has no words
///
/// A whole-sentence query matches the phrase anywhere, words separated by
/// any whitespace. Otherwise each word matches on its own, on word
/// boundaries.
fn build_regex(query: &str, options: &SearchOptions) -> Option<Regex> {
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }

    let pattern = if options.whole_sentence {
        words
            .iter()
            .map(|word| regex::escape(word))
            .collect::<Vec<_>>()
            .join(r"\s+")
    } else {
        let alternatives: Vec<String> = words.iter().map(|word| bounded(word)).collect();
        format!("(?:{})", alternatives.join("|"))
    };

    match RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!("Search query '{}' did not compile: {}", query, e);
            None
        }
    }
}

/// Cuts `sentence` to `limit` characters, centred on the byte range of a hit
///
/// The window is shifted back inside the sentence when centring would run
/// past either end.
fn truncate_around(sentence: &str, hit_start: usize, hit_end: usize, limit: usize) -> String {
    let total = sentence.chars().count();
    if limit == 0 || total <= limit {
        return sentence.to_string();
    }

    let start_char = sentence[..hit_start].chars().count();
    let hit_chars = sentence[hit_start..hit_end].chars().count();
    let centre = start_char + hit_chars / 2;
    let window_start = centre.saturating_sub(limit / 2).min(total - limit);

    sentence.chars().skip(window_start).take(limit).collect()
}

/// Ranks matching sentences by hit count, most hits first
///
/// Sentences with equal counts keep their original order.
pub(crate) fn search_sentences<'a, I>(sentences: I, query: &str, options: &SearchOptions) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(regex) = build_regex(query, options) else {
        return Vec::new();
    };

    let mut ranked: Vec<(usize, String)> = sentences
        .into_iter()
        .filter_map(|sentence| {
            let mut hits = regex.find_iter(sentence);
            let first = hits.next()?;
            let count = 1 + hits.count();
            let snippet = truncate_around(sentence, first.start(), first.end(), options.sentence_limit);
            Some((count, snippet))
        })
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, snippet)| snippet).collect()
}
