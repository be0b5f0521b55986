//! Core type definitions shared by every pipeline stage
//!
//! Symbols, members, references and relationships. Everything here is plain
//! data: cheap to clone, ordered, and serializable so graph snapshots can be
//! diffed and shipped to a rendering host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique key of a declaration, see [`NamingScheme`](super::NamingScheme)
pub type QualifiedName = String;

/// Kind of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Class,
    Interface,
    Enum,
    TypeAlias,
}

impl SymbolKind {
    /// UML stereotype shown above the name, if the kind has one
    pub fn stereotype(&self) -> Option<&'static str> {
        match self {
            SymbolKind::Class => None,
            SymbolKind::Interface => Some("interface"),
            SymbolKind::Enum => Some("enumeration"),
            SymbolKind::TypeAlias => Some("type"),
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Class => write!(f, "class"),
            SymbolKind::Interface => write!(f, "interface"),
            SymbolKind::Enum => write!(f, "enum"),
            SymbolKind::TypeAlias => write!(f, "type-alias"),
        }
    }
}

/// Visibility modifier for members
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    Public, // +
    Protected, // #
    Private,   // -
}

impl Visibility {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Visibility::Public => '+',
            Visibility::Protected => '#',
            Visibility::Private => '-',
        }
    }
}

/// Kind of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemberKind {
    Field,
    Method,
    EnumVariant,
}

/// A method or constructor parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_text: Option<String>,
    pub optional: bool,
    pub rest: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_text: None,
            optional: false,
            rest: false,
        }
    }

    pub fn with_type(mut self, t: impl Into<String>) -> Self {
        self.type_text = Some(t.into());
        self
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rest {
            write!(f, "...")?;
        }
        write!(f, "{}", self.name)?;
        if self.optional {
            write!(f, "?")?;
        }
        if let Some(t) = &self.type_text {
            write!(f, ": {}", t)?;
        }
        Ok(())
    }
}

/// A member of a declaration (field, method, or enum variant)
///
/// Equality over the whole struct is the "member signature" used for change
/// detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
    /// Declared type (field type or method return type) as written
    pub type_text: Option<String>,
    pub parameters: Vec<Parameter>,
    pub optional: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub readonly: bool,
}

impl Member {
    fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            type_text: None,
            parameters: Vec::new(),
            optional: false,
            is_static: false,
            is_abstract: false,
            readonly: false,
        }
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Field)
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Method)
    }

    pub fn variant(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::EnumVariant)
    }

    pub fn with_visibility(mut self, v: Visibility) -> Self {
        self.visibility = v;
        self
    }

    pub fn with_type(mut self, t: impl Into<String>) -> Self {
        self.type_text = Some(t.into());
        self
    }

    pub fn with_parameter(mut self, p: Parameter) -> Self {
        self.parameters.push(p);
        self
    }

    /// Display line for a diagram box, e.g. `+area(r: number): number` or
    /// `-count: number$`. Static members end in `$`, abstract ones in `*`.
    pub fn display(&self) -> String {
        let suffix = if self.is_static {
            "$"
        } else if self.is_abstract {
            "*"
        } else {
            ""
        };

        match self.kind {
            MemberKind::EnumVariant => self.name.clone(),
            MemberKind::Field => {
                let opt = if self.optional { "?" } else { "" };
                match &self.type_text {
                    Some(t) => format!(
                        "{}{}{}: {}{}",
                        self.visibility.to_char(),
                        self.name,
                        opt,
                        t,
                        suffix
                    ),
                    None => format!("{}{}{}{}", self.visibility.to_char(), self.name, opt, suffix),
                }
            }
            MemberKind::Method => {
                let params = self
                    .parameters
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                match &self.type_text {
                    Some(t) => format!(
                        "{}{}({}): {}{}",
                        self.visibility.to_char(),
                        self.name,
                        params,
                        t,
                        suffix
                    ),
                    None => format!(
                        "{}{}({}){}",
                        self.visibility.to_char(),
                        self.name,
                        params,
                        suffix
                    ),
                }
            }
        }
    }
}

/// Declaration-level modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub is_abstract: bool,
    pub exported: bool,
    pub is_default: bool,
}

/// A declared type: class, interface, enum or type alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub qualified_name: QualifiedName,
    pub name: String,
    pub kind: SymbolKind,
    /// Declaring file (normalized workspace path)
    pub path: String,
    pub members: Vec<Member>,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<String>,
    /// 1-based line of the declaration keyword
    pub line: usize,
    /// Set by the graph builder when another declaration claims the same key
    pub conflicting: bool,
}

impl Symbol {
    pub fn new(
        qualified_name: impl Into<String>,
        name: impl Into<String>,
        kind: SymbolKind,
        path: impl Into<String>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            name: name.into(),
            kind,
            path: path.into(),
            members: Vec::new(),
            modifiers: Modifiers::default(),
            type_parameters: Vec::new(),
            line: 1,
            conflicting: false,
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Equality used by change detection: kind and member signatures only.
    /// Path, position and modifier differences are ignored.
    pub fn same_shape(&self, other: &Symbol) -> bool {
        self.kind == other.kind && self.members == other.members
    }
}

/// Syntactic role a type name was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceRole {
    Extends,
    Implements,
    FieldType,
    Parameter,
    ReturnType,
}

impl ReferenceRole {
    /// Relationship kind this role produces when the name resolves
    pub fn relationship_kind(self) -> RelationshipKind {
        match self {
            ReferenceRole::Extends => RelationshipKind::Inheritance,
            ReferenceRole::Implements => RelationshipKind::Implementation,
            ReferenceRole::FieldType => RelationshipKind::Association,
            ReferenceRole::Parameter | ReferenceRole::ReturnType => RelationshipKind::Dependency,
        }
    }
}

/// An unresolved type name found in one file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Qualified name of the declaration the reference appears in
    pub source: QualifiedName,
    /// Name as written, possibly dotted (`shapes.Circle`)
    pub name: String,
    pub role: ReferenceRole,
    /// Found inside a known homogeneous container (`T[]`, `Array<T>`, ...)
    pub many: bool,
    pub line: usize,
    pub column: usize,
}

/// What an import binding pulls out of its module
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportedName {
    Named(String),
    Default,
    Namespace,
}

/// `import { Engine as Motor } from "./engine"` binds `Motor`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImportBinding {
    pub alias: String,
    pub imported: ImportedName,
    pub module: String,
}

/// Export statements that are not declarations
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportBinding {
    /// `export { Local as Exported }` or `export default Local`
    Local { local: String, exported: String },
    /// `export { Imported as Exported } from "module"`
    From {
        imported: String,
        exported: String,
        module: String,
    },
    /// `export * from "module"`
    All { module: String },
}

/// Relationship type between declarations, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    Inheritance,
    Implementation,
    Association,
    Dependency,
}

impl RelationshipKind {
    /// Higher wins when several kinds apply to one ordered pair
    pub fn precedence(self) -> u8 {
        match self {
            RelationshipKind::Inheritance => 4,
            RelationshipKind::Implementation => 3,
            RelationshipKind::Association => 2,
            RelationshipKind::Dependency => 1,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipKind::Inheritance => write!(f, "inheritance"),
            RelationshipKind::Implementation => write!(f, "implementation"),
            RelationshipKind::Association => write!(f, "association"),
            RelationshipKind::Dependency => write!(f, "dependency"),
        }
    }
}

/// A resolved, typed link between two symbols
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub source: QualifiedName,
    pub target: QualifiedName,
    pub kind: RelationshipKind,
    /// `"1"` or `"*"` for associations
    pub multiplicity: Option<String>,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            multiplicity: None,
        }
    }

    pub fn with_multiplicity(mut self, m: impl Into<String>) -> Self {
        self.multiplicity = Some(m.into());
        self
    }

    pub fn key(&self) -> (QualifiedName, QualifiedName) {
        (self.source.clone(), self.target.clone())
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.kind, self.target)?;
        if let Some(m) = &self.multiplicity {
            write!(f, " ({})", m)?;
        }
        Ok(())
    }
}
