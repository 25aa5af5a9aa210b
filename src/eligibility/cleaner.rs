use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::config::DomainConfig;
use crate::util::char_len;
use crate::TARGET_SEGMENT;

lazy_static! {
    // ALL-CAPS section headings such as DISEASE or CHARACTERISTICS
    static ref HEADING: Regex = Regex::new(r"^[A-Z]{6,}(?: [A-Z]+)?").unwrap();
    // "1. Foo" and "1.Foo"
    static ref LEADING_ENUMERATOR: Regex = Regex::new(r"^\d+\. *").unwrap();
}

const TOKEN_EDGE: &[char] = &[':', '-', ','];
const SENTENCE_EDGE: &[char] = &['.', ',', ';', ':'];

/// Normalizes a single criterion fragment.
///
/// Tokens are dropped on their own merits only, so a genuine sentence that
/// starts with "Exclusion of ..." loses its first word. Callers rely on that
/// behaviour being stable.
#[derive(Debug, Clone, Copy)]
pub struct SentenceCleaner<'a> {
    config: &'a DomainConfig,
}

impl<'a> SentenceCleaner<'a> {
    pub fn new(config: &'a DomainConfig) -> Self {
        Self { config }
    }

    /// Cleans `fragment`, returning `None` when nothing informative is left.
    pub fn clean(&self, fragment: &str) -> Option<String> {
        let filtered = self.strip_tokens(fragment);
        let cleaned = strip_leading_enumerator(&filtered);

        if char_len(cleaned) <= 2 {
            return None;
        }
        if self.config.skip_phrases.contains(cleaned) {
            trace!(target: TARGET_SEGMENT, "Skipping noise phrase '{}'", cleaned);
            return None;
        }
        Some(cleaned.to_string())
    }

    /// Whether `token` is a heading or boilerplate word. Surrounding `:`, `-`
    /// and `,` are ignored for the check only.
    pub fn is_noise_token(&self, token: &str) -> bool {
        let word = token.trim_matches(TOKEN_EDGE);
        HEADING.is_match(word) || self.config.boilerplate_words.contains(&word.to_lowercase())
    }

    fn strip_tokens(&self, fragment: &str) -> String {
        let kept: Vec<&str> = fragment
            .split_whitespace()
            .filter(|token| !self.is_noise_token(token))
            .collect();
        kept.join(" ").trim_matches(SENTENCE_EDGE).to_string()
    }
}

/// Removes a leading "<digits>." enumerator and the spaces after it.
pub fn strip_leading_enumerator(sentence: &str) -> &str {
    match LEADING_ENUMERATOR.find(sentence) {
        Some(m) => &sentence[m.end()..],
        None => sentence,
    }
}
