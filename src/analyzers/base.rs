use crate::analyzers::generic::GenericAnalyzer;
use crate::analyzers::go::GoAnalyzer;
use crate::analyzers::java::JavaAnalyzer;
use crate::analyzers::json::JsonAnalyzer;
use crate::analyzers::python::PythonAnalyzer;
use crate::analyzers::typescript::TypeScriptAnalyzer;
use crate::core::records::{CodeFile, Entity, GraphBatch};

pub trait LanguageAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Normalized (lowercase) language tags this analyzer handles.
    fn supported_languages(&self) -> &'static [&'static str];

    /// Turn one file into entities and relationships.
    ///
    /// The first returned entity is `file_entity`, unchanged. Never fails:
    /// unmatched or malformed content yields a reduced result.
    fn analyze(&self, file: &CodeFile, file_entity: &Entity) -> GraphBatch;
}

/// The closed set of analyzers shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analyzer {
    Go(GoAnalyzer),
    TypeScript(TypeScriptAnalyzer),
    Python(PythonAnalyzer),
    Java(JavaAnalyzer),
    Json(JsonAnalyzer),
    Generic(GenericAnalyzer),
}

impl Analyzer {
    pub fn defaults() -> Vec<Analyzer> {
        vec![
            Analyzer::Go(GoAnalyzer),
            Analyzer::TypeScript(TypeScriptAnalyzer),
            Analyzer::Python(PythonAnalyzer),
            Analyzer::Java(JavaAnalyzer),
            Analyzer::Json(JsonAnalyzer),
            Analyzer::Generic(GenericAnalyzer),
        ]
    }

    fn inner(&self) -> &dyn LanguageAnalyzer {
        match self {
            Analyzer::Go(a) => a,
            Analyzer::TypeScript(a) => a,
            Analyzer::Python(a) => a,
            Analyzer::Java(a) => a,
            Analyzer::Json(a) => a,
            Analyzer::Generic(a) => a,
        }
    }
}

impl LanguageAnalyzer for Analyzer {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        self.inner().supported_languages()
    }

    fn analyze(&self, file: &CodeFile, file_entity: &Entity) -> GraphBatch {
        self.inner().analyze(file, file_entity)
    }
}
