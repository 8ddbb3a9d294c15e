//! In-memory model of the analyzed program.
//!
//! A [`Program`] is an immutable snapshot of compilation units. Each unit is one
//! Rust module (a source file or an inline `mod` block) with its documentation
//! comment, its `use` imports and its declarations. Declarations are addressed
//! by [`DeclId`], an index pair into the program's unit arena, so the schema
//! resolver can refer to them without borrowing.

use std::collections::HashMap;
use std::path::PathBuf;

/// Module path separator used in module identifiers (`crate::models`).
pub const MODULE_SEPARATOR: &str = "::";

/// Index of a declaration: unit position plus declaration position inside the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId {
    pub unit: usize,
    pub index: usize,
}

/// The loaded program: a root module identifier and its compilation units.
#[derive(Debug, Clone)]
pub struct Program {
    root: String,
    units: Vec<CompilationUnit>,
    /// (module, identifier) -> declaration; first declaration wins
    index: HashMap<(String, String), DeclId>,
    /// identifier -> modules declaring a record with that identifier
    records_by_ident: HashMap<String, Vec<String>>,
}

/// One module's parsed declarations plus its documentation comment.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    /// Full module path, e.g. `crate::api::pets`
    pub module: String,
    /// Source file this unit was loaded from, if any
    pub path: Option<PathBuf>,
    /// Leading (inner) documentation comment lines
    pub doc: Vec<String>,
    /// `use` imports, flattened
    pub imports: Vec<Import>,
    /// Declarations in source order
    pub declarations: Vec<Declaration>,
}

/// A flattened `use` import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Name the import is visible under; `None` for glob imports
    pub alias: Option<String>,
    /// Imported path segments, e.g. `["crate", "models", "Pet"]`
    pub path: Vec<String>,
}

/// A named item declared in a compilation unit.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    /// Outer documentation comment lines
    pub doc: Vec<String>,
    pub kind: DeclKind,
}

/// What a declaration is, as far as schema resolution cares.
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// A struct with named fields (or a unit struct)
    Record(Vec<Field>),
    /// A `type` alias or a single-field tuple struct
    Alias(TypeExpr),
    /// An enum whose variants carry no data
    Enum(Vec<String>),
    /// A function or method; only its documentation matters
    Function,
    /// Anything else (traits, data-carrying enums, consts)
    Other,
}

/// A named field of a record.
#[derive(Debug, Clone)]
pub struct Field {
    /// Identifier in source
    pub ident: String,
    /// Name the field is serialized under (honors `#[serde(rename)]`)
    pub name: String,
    pub doc: Vec<String>,
    pub ty: TypeExpr,
}

/// A field type, reduced to what schema classification needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A possibly qualified type path such as `String`, `Pet` or `models::Pet`
    Named(TypePath),
    /// A sequence (`Vec<T>`, `[T; N]`, `&[T]`, sets)
    Array(Box<TypeExpr>),
    /// A map keyed by strings (`HashMap<K, V>`, `BTreeMap<K, V>`)
    Map(Box<TypeExpr>),
    /// A type with no schema equivalent (tuples, fn pointers, trait objects)
    Other(String),
}

/// A type path split into its qualifier and final identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePath {
    pub qualifier: Vec<String>,
    pub name: String,
}

impl TypePath {
    pub fn new(qualifier: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier,
            name: name.into(),
        }
    }

    /// A path with no qualifier.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(Vec::new(), name)
    }
}

impl std::fmt::Display for TypePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.qualifier {
            write!(f, "{}{}", segment, MODULE_SEPARATOR)?;
        }
        write!(f, "{}", self.name)
    }
}

impl CompilationUnit {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    /// Every documentation block of the unit: its own leading comment first,
    /// then each declaration's comment in source order.
    pub fn doc_blocks(&self) -> impl Iterator<Item = &[String]> {
        std::iter::once(self.doc.as_slice())
            .chain(self.declarations.iter().map(|decl| decl.doc.as_slice()))
    }
}

impl Program {
    /// Creates an empty program rooted at `root` (usually `crate`).
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            units: Vec::new(),
            index: HashMap::new(),
            records_by_ident: HashMap::new(),
        }
    }

    /// Adds a compilation unit and indexes its declarations.
    pub fn add_unit(&mut self, unit: CompilationUnit) {
        let unit_index = self.units.len();
        for (index, decl) in unit.declarations.iter().enumerate() {
            if matches!(decl.kind, DeclKind::Function) {
                continue;
            }
            self.index
                .entry((unit.module.clone(), decl.name.clone()))
                .or_insert(DeclId {
                    unit: unit_index,
                    index,
                });
            if matches!(decl.kind, DeclKind::Record(_)) {
                let modules = self.records_by_ident.entry(decl.name.clone()).or_default();
                if !modules.contains(&unit.module) {
                    modules.push(unit.module.clone());
                }
            }
        }
        self.units.push(unit);
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    pub fn unit(&self, index: usize) -> &CompilationUnit {
        &self.units[index]
    }

    pub fn declaration(&self, id: DeclId) -> &Declaration {
        &self.units[id.unit].declarations[id.index]
    }

    /// Finds a type declaration by module path and identifier.
    pub fn lookup(&self, module: &str, name: &str) -> Option<DeclId> {
        self.index
            .get(&(module.to_string(), name.to_string()))
            .copied()
    }

    /// Whether any unit of the program is the given module.
    pub fn has_module(&self, module: &str) -> bool {
        self.units.iter().any(|unit| unit.module == module)
    }

    /// Whether records with this identifier exist in more than one module.
    pub fn is_ambiguous_record(&self, name: &str) -> bool {
        self.records_by_ident
            .get(name)
            .map_or(false, |modules| modules.len() > 1)
    }

    /// Module path relative to the root, joined with dots (`api.v2`).
    pub fn relative_module(&self, module: &str) -> String {
        if module == self.root {
            return String::new();
        }
        let prefix = format!("{}{}", self.root, MODULE_SEPARATOR);
        let relative = module.strip_prefix(prefix.as_str()).unwrap_or(module);
        relative.split(MODULE_SEPARATOR).collect::<Vec<_>>().join(".")
    }
}

/// Joins module path segments into a module identifier.
pub fn join_module(segments: &[String]) -> String {
    segments.join(MODULE_SEPARATOR)
}
