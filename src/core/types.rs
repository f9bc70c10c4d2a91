use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    File,
    Directory,
    Package,
    Module,
    Namespace,
    Class,
    Function,
    Method,
    Interface,
    Type,
    Enum,
    Constant,
    Variable,
    Property,
    Parameter,
    Import,
    Export,
    Annotation,
    Comment,
    Test,
    Dependency,
    ApiEndpoint,
    DatabaseTable,
    Configuration,
}

impl EntityType {
    pub const ALL: [EntityType; 24] = [
        EntityType::File,
        EntityType::Directory,
        EntityType::Package,
        EntityType::Module,
        EntityType::Namespace,
        EntityType::Class,
        EntityType::Function,
        EntityType::Method,
        EntityType::Interface,
        EntityType::Type,
        EntityType::Enum,
        EntityType::Constant,
        EntityType::Variable,
        EntityType::Property,
        EntityType::Parameter,
        EntityType::Import,
        EntityType::Export,
        EntityType::Annotation,
        EntityType::Comment,
        EntityType::Test,
        EntityType::Dependency,
        EntityType::ApiEndpoint,
        EntityType::DatabaseTable,
        EntityType::Configuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::File => "FILE",
            EntityType::Directory => "DIRECTORY",
            EntityType::Package => "PACKAGE",
            EntityType::Module => "MODULE",
            EntityType::Namespace => "NAMESPACE",
            EntityType::Class => "CLASS",
            EntityType::Function => "FUNCTION",
            EntityType::Method => "METHOD",
            EntityType::Interface => "INTERFACE",
            EntityType::Type => "TYPE",
            EntityType::Enum => "ENUM",
            EntityType::Constant => "CONSTANT",
            EntityType::Variable => "VARIABLE",
            EntityType::Property => "PROPERTY",
            EntityType::Parameter => "PARAMETER",
            EntityType::Import => "IMPORT",
            EntityType::Export => "EXPORT",
            EntityType::Annotation => "ANNOTATION",
            EntityType::Comment => "COMMENT",
            EntityType::Test => "TEST",
            EntityType::Dependency => "DEPENDENCY",
            EntityType::ApiEndpoint => "API_ENDPOINT",
            EntityType::DatabaseTable => "DATABASE_TABLE",
            EntityType::Configuration => "CONFIGURATION",
        }
    }

    /// Functions and methods are the targets of call-site detection.
    pub fn is_callable(&self) -> bool {
        matches!(self, EntityType::Function | EntityType::Method)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        EntityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown entity type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    InheritsFrom,
    Implements,
    Extends,
    Calls,
    Uses,
    Imports,
    Exports,
    DependsOn,
    Contains,
    BelongsTo,
    Defines,
    References,
    Overrides,
    Instantiates,
    Throws,
    Catches,
    Returns,
    Accepts,
    Configures,
    Tests,
    Documents,
    Annotates,
    Modifies,
    Accesses,
    Invokes,
    SubscribesTo,
    Publishes,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 27] = [
        RelationshipType::InheritsFrom,
        RelationshipType::Implements,
        RelationshipType::Extends,
        RelationshipType::Calls,
        RelationshipType::Uses,
        RelationshipType::Imports,
        RelationshipType::Exports,
        RelationshipType::DependsOn,
        RelationshipType::Contains,
        RelationshipType::BelongsTo,
        RelationshipType::Defines,
        RelationshipType::References,
        RelationshipType::Overrides,
        RelationshipType::Instantiates,
        RelationshipType::Throws,
        RelationshipType::Catches,
        RelationshipType::Returns,
        RelationshipType::Accepts,
        RelationshipType::Configures,
        RelationshipType::Tests,
        RelationshipType::Documents,
        RelationshipType::Annotates,
        RelationshipType::Modifies,
        RelationshipType::Accesses,
        RelationshipType::Invokes,
        RelationshipType::SubscribesTo,
        RelationshipType::Publishes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::InheritsFrom => "INHERITS_FROM",
            RelationshipType::Implements => "IMPLEMENTS",
            RelationshipType::Extends => "EXTENDS",
            RelationshipType::Calls => "CALLS",
            RelationshipType::Uses => "USES",
            RelationshipType::Imports => "IMPORTS",
            RelationshipType::Exports => "EXPORTS",
            RelationshipType::DependsOn => "DEPENDS_ON",
            RelationshipType::Contains => "CONTAINS",
            RelationshipType::BelongsTo => "BELONGS_TO",
            RelationshipType::Defines => "DEFINES",
            RelationshipType::References => "REFERENCES",
            RelationshipType::Overrides => "OVERRIDES",
            RelationshipType::Instantiates => "INSTANTIATES",
            RelationshipType::Throws => "THROWS",
            RelationshipType::Catches => "CATCHES",
            RelationshipType::Returns => "RETURNS",
            RelationshipType::Accepts => "ACCEPTS",
            RelationshipType::Configures => "CONFIGURES",
            RelationshipType::Tests => "TESTS",
            RelationshipType::Documents => "DOCUMENTS",
            RelationshipType::Annotates => "ANNOTATES",
            RelationshipType::Modifies => "MODIFIES",
            RelationshipType::Accesses => "ACCESSES",
            RelationshipType::Invokes => "INVOKES",
            RelationshipType::SubscribesTo => "SUBSCRIBES_TO",
            RelationshipType::Publishes => "PUBLISHES",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        RelationshipType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown relationship type: {s}"))
    }
}
