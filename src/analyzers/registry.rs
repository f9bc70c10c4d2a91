use std::collections::{BTreeSet, HashMap};

use crate::analyzers::base::{Analyzer, LanguageAnalyzer};
use crate::analyzers::generic::GenericAnalyzer;

/// Language tag → analyzer lookup. Built once, then shared read-only.
#[derive(Debug, Clone)]
pub struct AnalyzerRegistry {
    by_language: HashMap<String, Analyzer>,
    fallback: Analyzer,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AnalyzerRegistry {
    /// A registry that resolves every tag to the generic analyzer.
    pub fn empty() -> Self {
        Self {
            by_language: HashMap::new(),
            fallback: Analyzer::Generic(GenericAnalyzer),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for analyzer in Analyzer::defaults() {
            registry.register(analyzer);
        }
        registry
    }

    /// Index `analyzer` under each of its language tags. A later registration
    /// for the same tag replaces the earlier one.
    pub fn register(&mut self, analyzer: Analyzer) {
        for tag in analyzer.supported_languages() {
            let tag = normalize_tag(tag);
            if let Some(previous) = self.by_language.insert(tag.clone(), analyzer) {
                if previous != analyzer {
                    tracing::debug!(language = %tag, previous = previous.name(), next = analyzer.name(), "analyzer replaced");
                }
            }
        }
    }

    /// The analyzer for `language`, or the generic fallback.
    pub fn resolve(&self, language: &str) -> &Analyzer {
        self.by_language
            .get(&normalize_tag(language))
            .unwrap_or(&self.fallback)
    }

    pub fn is_registered(&self, language: &str) -> bool {
        self.by_language.contains_key(&normalize_tag(language))
    }

    /// Registered tags, sorted.
    pub fn languages(&self) -> Vec<String> {
        self.by_language
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}
