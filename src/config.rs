//! Vocabulary assets and processing switches.
//!
//! The word and phrase sets used by cleaning and rewriting are plain data. They
//! are passed to the algorithms explicitly so a caller can override any of them
//! per call; `DomainConfig::default()` carries the curated built-in lists.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::environment::{get_env_var_as_vec, get_env_var_path};

/// Header and structural words dropped from every criterion token stream.
pub const BOILERPLATE_WORDS: &[&str] = &[
    "criteria",
    "include",
    "exclude",
    "inclusion",
    "exclusion",
    "eligibility",
];

/// Recurring sentences (as they look after cleaning) that carry no criterion.
pub const SKIP_PHRASES: &[&str] = &[
    "Other protocol defined inclusion/exclusion criteria may apply",
    "Other protocol defined inclusion/exclusion may apply",
    "Other protocol defined inclusion/",
    "Other protocol-defined inclusion/",
    "may apply",
    "PRIOR",
    "N/A",
    "None",
    "Not applicable",
];

/// Mentions that link to the wrong concept often enough that they are never aliased.
pub const EXCLUDED_ALIAS_TERMS: &[&str] = &[
    "yo", "girl", "boy", "er", "changes", "patient", "male", "female", "age",
];

/// Words that make the text before a negated span unusable as a prefix.
pub const WEAK_ENDINGS: &[&str] = &[
    "be", "have", "to", "with", "for", "of", "no", "not", "other", "been",
];

pub const DOMAIN_CONFIG_ENV: &str = "CTELIG_DOMAIN_CONFIG";
pub const EXTRA_SKIP_PHRASES_ENV: &str = "CTELIG_EXTRA_SKIP_PHRASES";
pub const EXTRA_EXCLUDED_TERMS_ENV: &str = "CTELIG_EXTRA_EXCLUDED_TERMS";

fn to_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Static vocabulary consulted by the cleaner and the rewriters.
///
/// Fields missing from a JSON file fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Lowercase tokens removed during sentence cleaning
    pub boilerplate_words: HashSet<String>,
    /// Exact cleaned sentences that are filtered out
    pub skip_phrases: HashSet<String>,
    /// Lowercase mention stems that are never alias-expanded
    pub excluded_terms: HashSet<String>,
    /// Last words that mark a weak prefix before a negated span
    pub weak_endings: HashSet<String>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            boilerplate_words: to_set(BOILERPLATE_WORDS),
            skip_phrases: to_set(SKIP_PHRASES),
            excluded_terms: to_set(EXCLUDED_ALIAS_TERMS),
            weak_endings: to_set(WEAK_ENDINGS),
        }
    }
}

impl DomainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_phrase(mut self, phrase: &str) -> Self {
        self.skip_phrases.insert(phrase.to_string());
        self
    }

    pub fn with_excluded_term(mut self, term: &str) -> Self {
        self.excluded_terms.insert(term.to_lowercase());
        self
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json_data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read domain config {}", path.display()))?;
        let config: DomainConfig = serde_json::from_str(&json_data)
            .with_context(|| format!("Failed to parse domain config {}", path.display()))?;

        info!(
            "Loaded domain config from {} ({} skip phrases, {} excluded terms)",
            path.display(),
            config.skip_phrases.len(),
            config.excluded_terms.len()
        );
        Ok(config)
    }

    /// Builds the configuration from the environment.
    ///
    /// `CTELIG_DOMAIN_CONFIG` names a JSON file replacing the defaults, and the
    /// semicolon-separated `CTELIG_EXTRA_SKIP_PHRASES` and
    /// `CTELIG_EXTRA_EXCLUDED_TERMS` extend whatever was loaded.
    pub fn from_env() -> Result<Self> {
        let mut config = match get_env_var_path(DOMAIN_CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        for phrase in get_env_var_as_vec(EXTRA_SKIP_PHRASES_ENV, ';') {
            debug!("Adding skip phrase from environment: {}", phrase);
            config.skip_phrases.insert(phrase);
        }
        for term in get_env_var_as_vec(EXTRA_EXCLUDED_TERMS_ENV, ';') {
            debug!("Adding excluded alias term from environment: {}", term);
            config.excluded_terms.insert(term.to_lowercase());
        }

        Ok(config)
    }
}

/// Switches for the document pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Produce alias-expanded criterion lists
    pub expand: bool,
    /// Relocate negated spans between the inclusion and exclusion sides
    pub move_negations: bool,
    /// Aliases kept per entity at the annotation boundary
    pub max_aliases: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            expand: true,
            move_negations: true,
            max_aliases: 2,
        }
    }
}
