use crate::analyzers::base::LanguageAnalyzer;
use crate::core::records::{CodeFile, Entity, GraphBatch};

/// Fallback for languages without a dedicated analyzer: the file entity and nothing else.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenericAnalyzer;

impl LanguageAnalyzer for GenericAnalyzer {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &["unknown"]
    }

    fn analyze(&self, _file: &CodeFile, file_entity: &Entity) -> GraphBatch {
        GraphBatch {
            entities: vec![file_entity.clone()],
            relationships: Vec::new(),
        }
    }
}
