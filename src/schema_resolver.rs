//! Turns declarations into schemas, discovering referenced declarations.
//!
//! Field types are classified into a [`FieldType`] by one function,
//! [`SchemaResolver::classify_field`]. Records are never expanded in place:
//! a reference to a record yields a `$ref` plus a [`PendingDeclaration`], and
//! [`SchemaResolver::resolve_pending`] expands pending records until no new
//! ones turn up. A record's name is put into the definitions before its fields
//! are walked, so self-referencing and mutually referencing records terminate.

use crate::directives::{
    strfmt_name, AnnotationKind, DirectiveValue, SCHEMA_FIELD_DIRECTIVES,
};
use crate::directives::{find_annotation, Annotation};
use crate::error::{Error, Result};
use crate::program::{join_module, DeclId, DeclKind, Program, TypeExpr, TypePath, MODULE_SEPARATOR};
use crate::sectioned::SectionedParser;
use crate::spec::Schema;
use log::debug;
use std::collections::BTreeMap;

/// Crates whose types are never part of the analyzed program.
const STD_CRATES: &[&str] = &["std", "core", "alloc"];

/// A referenced record waiting to be turned into a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeclaration {
    pub id: DeclId,
    /// Definition name the record is published under
    pub name: String,
}

/// Classification of a field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A built-in scalar
    Primitive {
        kind: &'static str,
        format: Option<&'static str>,
    },
    /// A string with a named format (`swagger:strfmt`)
    Formatted(String),
    /// A string restricted to the variant names of a unit-only enum
    Enumeration(Vec<String>),
    /// A record, published as a named definition
    Reference(PendingDeclaration),
    Array(Box<FieldType>),
    /// A string-keyed map of values
    Map(Box<FieldType>),
    /// Anything without a schema equivalent
    Untyped,
}

/// Maps a primitive type name to its schema type and format.
///
/// Integer widths without a schema format (`i128`, `u128`) are left untyped.
pub fn primitive(name: &str) -> Option<FieldType> {
    let (kind, format) = match name {
        "bool" => ("boolean", None),
        "String" | "str" | "char" => ("string", None),
        "i8" => ("integer", Some("int8")),
        "i16" => ("integer", Some("int16")),
        "i32" => ("integer", Some("int32")),
        "i64" | "isize" => ("integer", Some("int64")),
        "u8" => ("integer", Some("uint8")),
        "u16" => ("integer", Some("uint16")),
        "u32" => ("integer", Some("uint32")),
        "u64" | "usize" => ("integer", Some("uint64")),
        "f32" => ("number", Some("float")),
        "f64" => ("number", Some("double")),
        "i128" | "u128" => return Some(FieldType::Untyped),
        _ => return None,
    };
    Some(FieldType::Primitive { kind, format })
}

/// Resolves field types against a program and accumulates pending records.
pub struct SchemaResolver<'p> {
    program: &'p Program,
    pending: Vec<PendingDeclaration>,
}

impl<'p> SchemaResolver<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            pending: Vec::new(),
        }
    }

    /// Records discovered but not yet published.
    pub fn pending(&self) -> &[PendingDeclaration] {
        &self.pending
    }

    /// Classifies the type of a field declared in `unit`.
    ///
    /// # Arguments
    ///
    /// * `unit` - Index of the compilation unit the field is declared in
    /// * `ty` - The field's type expression
    /// * `strfmt` - Format named by a `swagger:strfmt` line in the field's own comment
    ///
    /// # Errors
    ///
    /// Fails when a referenced type cannot be found or an alias chain loops.
    pub fn classify_field(
        &self,
        unit: usize,
        ty: &TypeExpr,
        strfmt: Option<&str>,
    ) -> Result<FieldType> {
        if let Some(format) = strfmt {
            return Ok(FieldType::Formatted(format.to_string()));
        }
        self.classify_expr(unit, ty, &mut Vec::new())
    }

    fn classify_expr(&self, unit: usize, ty: &TypeExpr, visited: &mut Vec<DeclId>) -> Result<FieldType> {
        match ty {
            TypeExpr::Named(path) => self.classify_path(unit, path, visited),
            TypeExpr::Array(inner) => Ok(FieldType::Array(Box::new(
                self.classify_expr(unit, inner, visited)?,
            ))),
            TypeExpr::Map(inner) => Ok(FieldType::Map(Box::new(
                self.classify_expr(unit, inner, visited)?,
            ))),
            TypeExpr::Other(_) => Ok(FieldType::Untyped),
        }
    }

    fn classify_path(&self, unit: usize, path: &TypePath, visited: &mut Vec<DeclId>) -> Result<FieldType> {
        let from_std = self.is_std_path(unit, path);
        if path.qualifier.is_empty() || from_std {
            if let Some(field_type) = primitive(&path.name) {
                if self.program.lookup(&self.program.unit(unit).module, &path.name).is_none() || from_std {
                    return Ok(field_type);
                }
            }
        }
        if from_std {
            return Ok(FieldType::Untyped);
        }
        let id = self.resolve_path(unit, path)?;
        self.classify_declaration(id, visited)
    }

    /// Whether `path` names an item of a std crate, written out or through a `use` alias.
    fn is_std_path(&self, unit: usize, path: &TypePath) -> bool {
        let is_std_root = |root: &String| STD_CRATES.contains(&root.as_str());
        let first = path.qualifier.first().unwrap_or(&path.name);
        if is_std_root(first) {
            return true;
        }
        self.program
            .unit(unit)
            .imports
            .iter()
            .find(|import| import.alias.as_deref() == Some(first.as_str()))
            .and_then(|import| import.path.first())
            .map_or(false, is_std_root)
    }

    fn classify_declaration(&self, id: DeclId, visited: &mut Vec<DeclId>) -> Result<FieldType> {
        let decl = self.program.declaration(id);
        if let Some(format) = strfmt_name(&decl.doc) {
            return Ok(FieldType::Formatted(format));
        }
        match &decl.kind {
            DeclKind::Record(_) => Ok(FieldType::Reference(PendingDeclaration {
                id,
                name: self.definition_name(id),
            })),
            DeclKind::Alias(target) => {
                if visited.contains(&id) {
                    return Err(Error::AliasCycle(format!(
                        "{}{}{}",
                        self.program.unit(id.unit).module,
                        MODULE_SEPARATOR,
                        decl.name
                    )));
                }
                visited.push(id);
                self.classify_expr(id.unit, target, visited)
            }
            DeclKind::Enum(variants) => Ok(FieldType::Enumeration(variants.clone())),
            DeclKind::Function | DeclKind::Other => Ok(FieldType::Untyped),
        }
    }

    /// Resolves a type path in the scope of `unit`.
    ///
    /// Bare identifiers are looked up in the unit itself, then among its named
    /// imports, then through its glob imports. Qualified paths may start at
    /// `crate`, `self`, `super`, an imported module or a child module.
    pub fn resolve_path(&self, unit: usize, path: &TypePath) -> Result<DeclId> {
        let from = &self.program.unit(unit).module;
        if path.qualifier.is_empty() {
            return self.resolve_ident(unit, &path.name);
        }
        let module = self
            .resolve_module(unit, &path.qualifier)
            .ok_or_else(|| Error::UnknownModule {
                path: path.to_string(),
                from: from.clone(),
            })?;
        self.program
            .lookup(&module, &path.name)
            .ok_or_else(|| Error::UnresolvedType {
                name: path.name.clone(),
                module,
            })
    }

    fn resolve_ident(&self, unit: usize, name: &str) -> Result<DeclId> {
        let scope = self.program.unit(unit);
        if let Some(id) = self.program.lookup(&scope.module, name) {
            return Ok(id);
        }
        if let Some(import) = scope
            .imports
            .iter()
            .find(|import| import.alias.as_deref() == Some(name))
        {
            // `use Name;` names an external crate, never an item of this program
            let unresolved = || Error::UnresolvedType {
                name: name.to_string(),
                module: scope.module.clone(),
            };
            let (item, qualifier) = import.path.split_last().ok_or_else(unresolved)?;
            if qualifier.is_empty() {
                return Err(unresolved());
            }
            return self.resolve_path(unit, &TypePath::new(qualifier.to_vec(), item.clone()));
        }
        for import in scope.imports.iter().filter(|import| import.alias.is_none()) {
            if let Some(module) = self.resolve_module(unit, &import.path) {
                if let Some(id) = self.program.lookup(&module, name) {
                    return Ok(id);
                }
            }
        }
        Err(Error::UnresolvedType {
            name: name.to_string(),
            module: scope.module.clone(),
        })
    }

    /// Resolves module path segments written in `unit` to a module of the program.
    fn resolve_module(&self, unit: usize, segments: &[String]) -> Option<String> {
        self.resolve_module_via(unit, segments, &mut Vec::new())
    }

    /// `aliases` holds the import aliases already followed; meeting one again is a loop.
    fn resolve_module_via(
        &self,
        unit: usize,
        segments: &[String],
        aliases: &mut Vec<String>,
    ) -> Option<String> {
        let scope = self.program.unit(unit);
        let (first, rest) = segments.split_first()?;
        let mut module = match first.as_str() {
            "crate" => self.program.root().to_string(),
            "self" => scope.module.clone(),
            "super" => parent_module(&scope.module)?,
            _ => {
                let child = format!("{}{}{}", scope.module, MODULE_SEPARATOR, first);
                if self.program.has_module(&child) {
                    child
                } else if let Some(import) = scope
                    .imports
                    .iter()
                    .find(|import| import.alias.as_deref() == Some(first.as_str()))
                {
                    if aliases.contains(first) {
                        return None;
                    }
                    aliases.push(first.clone());
                    self.resolve_module_via(unit, &import.path, aliases)?
                } else {
                    return None;
                }
            }
        };
        for segment in rest {
            module = if segment == "super" {
                parent_module(&module)?
            } else {
                join_module(&[module, segment.clone()])
            };
        }
        self.program.has_module(&module).then_some(module)
    }

    /// The definition name a declaration is published under.
    ///
    /// A `swagger:model <name>` annotation wins; otherwise the identifier,
    /// qualified with its module path when another module declares a record
    /// with the same identifier.
    pub fn definition_name(&self, id: DeclId) -> String {
        let decl = self.program.declaration(id);
        if let Some(Annotation::Model(Some(name))) = find_annotation(&decl.doc, AnnotationKind::Model) {
            return name;
        }
        if self.program.is_ambiguous_record(&decl.name) {
            let module = self.program.relative_module(&self.program.unit(id.unit).module);
            if !module.is_empty() {
                return format!("{}.{}", module, decl.name);
            }
        }
        decl.name.clone()
    }

    /// Converts a classification into a schema, queueing referenced records.
    pub fn schema_for(&mut self, field_type: FieldType) -> Schema {
        match field_type {
            FieldType::Primitive { kind, format } => Schema::typed(kind, format),
            FieldType::Formatted(format) => Schema::typed("string", Some(&format)),
            FieldType::Enumeration(variants) => {
                let mut schema = Schema::typed("string", None);
                schema.enum_values = variants;
                schema
            }
            FieldType::Reference(pending) => {
                let schema = Schema::reference_to(&pending.name);
                self.enqueue(pending);
                schema
            }
            FieldType::Array(inner) => {
                let mut schema = Schema::typed("array", None);
                schema.items = Some(Box::new(self.schema_for(*inner)));
                schema
            }
            FieldType::Map(inner) => {
                let mut schema = Schema::typed("object", None);
                schema.additional_properties = Some(Box::new(self.schema_for(*inner)));
                schema
            }
            FieldType::Untyped => Schema::default(),
        }
    }

    /// Queues a record for publication unless it is already queued.
    pub fn enqueue(&mut self, pending: PendingDeclaration) {
        if !self.pending.iter().any(|p| p.name == pending.name) {
            debug!("Discovered model {}", pending.name);
            self.pending.push(pending);
        }
    }

    /// Builds the schema of a record declaration.
    ///
    /// Title and description come from the declaration comment; each field is
    /// published under its serialized name with the validations written in its
    /// own comment. `required: true|false` lines add or remove that field from
    /// the record's required set.
    pub fn build_record_schema(&mut self, id: DeclId) -> Result<Schema> {
        let program = self.program;
        let decl = program.declaration(id);
        let DeclKind::Record(fields) = &decl.kind else {
            return Err(Error::NotARecord {
                annotation: AnnotationKind::Model.as_str().to_string(),
                name: decl.name.clone(),
            });
        };

        let sections = SectionedParser::new(&[])
            .with_annotation(AnnotationKind::Model)
            .with_title()
            .parse(&decl.doc);
        let mut schema = Schema::typed("object", None);
        schema.title = sections.title_text();
        schema.description = sections.description_text();

        let field_parser =
            SectionedParser::new(SCHEMA_FIELD_DIRECTIVES).with_annotation(AnnotationKind::StrFmt);
        for field in fields {
            let field_sections = field_parser.parse(&field.doc);
            let strfmt = match &field_sections.annotation {
                Some(Annotation::StrFmt(format)) => Some(format.as_str()),
                _ => None,
            };
            let field_type = self.classify_field(id.unit, &field.ty, strfmt)?;
            let mut property = self.schema_for(field_type);
            property.description = field_sections.description_text();

            for value in field_sections.values()? {
                match value {
                    DirectiveValue::Required(true) => schema.add_required(&field.name),
                    DirectiveValue::Required(false) => schema.remove_required(&field.name),
                    DirectiveValue::ReadOnly(read_only) => property.read_only = read_only,
                    other => {
                        other.apply_validation(&mut property);
                    }
                }
            }
            schema.properties.insert(field.name.clone(), property);
        }
        Ok(schema)
    }

    /// Publishes pending records into `definitions` until none are left.
    ///
    /// Names already present are skipped, so definitions supplied by a base
    /// document are never overwritten. Returns how many definitions were added.
    pub fn resolve_pending(&mut self, definitions: &mut BTreeMap<String, Schema>) -> Result<usize> {
        let mut added = 0;
        while !self.pending.is_empty() {
            let queue = std::mem::take(&mut self.pending);
            for pending in queue {
                if definitions.contains_key(&pending.name) {
                    continue;
                }
                // placeholder so references back to this record stop here
                definitions.insert(pending.name.clone(), Schema::default());
                let schema = self.build_record_schema(pending.id)?;
                debug!("Resolved model {}", pending.name);
                definitions.insert(pending.name, schema);
                added += 1;
            }
        }
        Ok(added)
    }
}

fn parent_module(module: &str) -> Option<String> {
    module
        .rsplit_once(MODULE_SEPARATOR)
        .map(|(parent, _)| parent.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;

    fn program(sources: &[(&str, &str)]) -> Program {
        AstParser::load_program("crate", sources).unwrap()
    }

    fn first_record(program: &Program, module: &str, name: &str) -> DeclId {
        program.lookup(module, name).unwrap()
    }

    #[test]
    fn test_primitive_mapping() {
        assert_eq!(
            primitive("i32"),
            Some(FieldType::Primitive {
                kind: "integer",
                format: Some("int32")
            })
        );
        assert_eq!(
            primitive("usize"),
            Some(FieldType::Primitive {
                kind: "integer",
                format: Some("uint64")
            })
        );
        assert_eq!(
            primitive("f32"),
            Some(FieldType::Primitive {
                kind: "number",
                format: Some("float")
            })
        );
        assert_eq!(primitive("u128"), Some(FieldType::Untyped));
        assert_eq!(primitive("Pet"), None);
    }

    #[test]
    fn test_field_strfmt_wins() {
        let program = program(&[("crate", "pub struct Pet { pub born: i64 }")]);
        let resolver = SchemaResolver::new(&program);
        let ty = TypeExpr::Named(TypePath::ident("i64"));
        assert_eq!(
            resolver.classify_field(0, &ty, Some("date-time")).unwrap(),
            FieldType::Formatted("date-time".to_string())
        );
    }

    #[test]
    fn test_self_reference_terminates() {
        let program = program(&[(
            "crate",
            r#"
            /// A node.
            pub struct Node {
                pub value: String,
                pub children: Vec<Node>,
                pub parent: Option<Box<Node>>,
            }
            "#,
        )]);
        let mut resolver = SchemaResolver::new(&program);
        let id = first_record(&program, "crate", "Node");
        resolver.enqueue(PendingDeclaration {
            id,
            name: resolver.definition_name(id),
        });
        let mut definitions = BTreeMap::new();
        assert_eq!(resolver.resolve_pending(&mut definitions).unwrap(), 1);

        let node = &definitions["Node"];
        assert_eq!(node.title.as_deref(), Some("A node."));
        assert_eq!(
            node.properties["children"].items.as_ref().unwrap().reference.as_deref(),
            Some("#/definitions/Node")
        );
        assert_eq!(
            node.properties["parent"].reference.as_deref(),
            Some("#/definitions/Node")
        );
    }

    #[test]
    fn test_alias_chain_across_modules() {
        let program = program(&[
            (
                "crate",
                r#"
                mod types {
                    pub type Id = Raw;
                    pub type Raw = u64;
                    /// swagger:strfmt uuid
                    pub struct Uuid(String);
                }
                use types::{Id, Uuid};
                pub struct Pet { pub id: Id, pub tag: Uuid, pub kind: types::Id }
                "#,
            ),
        ]);
        let mut resolver = SchemaResolver::new(&program);
        let id = first_record(&program, "crate", "Pet");
        let schema = resolver.build_record_schema(id).unwrap();
        assert_eq!(schema.properties["id"].kind.as_deref(), Some("integer"));
        assert_eq!(schema.properties["id"].format.as_deref(), Some("uint64"));
        assert_eq!(schema.properties["tag"].format.as_deref(), Some("uuid"));
        assert_eq!(schema.properties["kind"].format.as_deref(), Some("uint64"));
    }

    #[test]
    fn test_alias_cycle_detected() {
        let program = program(&[(
            "crate",
            "pub type A = B; pub type B = A; pub struct Pet { pub a: A }",
        )]);
        let mut resolver = SchemaResolver::new(&program);
        let id = first_record(&program, "crate", "Pet");
        assert!(matches!(
            resolver.build_record_schema(id),
            Err(Error::AliasCycle(_))
        ));
    }

    #[test]
    fn test_unknown_module_and_type() {
        let program = program(&[(
            "crate",
            "pub struct Pet { pub owner: people::Owner } pub struct Toy { pub maker: Maker }",
        )]);
        let mut resolver = SchemaResolver::new(&program);
        let pet = first_record(&program, "crate", "Pet");
        assert!(matches!(
            resolver.build_record_schema(pet),
            Err(Error::UnknownModule { .. })
        ));
        let toy = first_record(&program, "crate", "Toy");
        assert!(matches!(
            resolver.build_record_schema(toy),
            Err(Error::UnresolvedType { .. })
        ));
    }

    #[test]
    fn test_import_loops_are_unknown() {
        let program = program(&[(
            "crate",
            r#"
            use chrono;
            use Uuid;
            use left as right;
            use right as left;

            pub struct Pet { pub born: chrono::NaiveDate }
            pub struct Tag { pub id: Uuid }
            pub struct Toy { pub maker: right::Maker }
            "#,
        )]);
        let mut resolver = SchemaResolver::new(&program);

        let pet = first_record(&program, "crate", "Pet");
        assert!(matches!(
            resolver.build_record_schema(pet),
            Err(Error::UnknownModule { path, .. }) if path == "chrono::NaiveDate"
        ));
        let tag = first_record(&program, "crate", "Tag");
        assert!(matches!(
            resolver.build_record_schema(tag),
            Err(Error::UnresolvedType { name, .. }) if name == "Uuid"
        ));
        let toy = first_record(&program, "crate", "Toy");
        assert!(matches!(
            resolver.build_record_schema(toy),
            Err(Error::UnknownModule { .. })
        ));
    }

    #[test]
    fn test_std_types_are_untyped_however_written() {
        let program = program(&[(
            "crate",
            r#"
            use std::net;
            use std::string::String;
            use std::time::SystemTime;

            pub struct Event {
                pub at: SystemTime,
                pub logged_at: std::time::SystemTime,
                pub peer: net::IpAddr,
                pub name: String,
            }
            "#,
        )]);
        let mut resolver = SchemaResolver::new(&program);
        let event = first_record(&program, "crate", "Event");
        let schema = resolver.build_record_schema(event).unwrap();

        for field in ["at", "logged_at", "peer"] {
            assert_eq!(schema.properties[field], Schema::default(), "field {}", field);
        }
        assert_eq!(schema.properties["name"], Schema::typed("string", None));
        assert!(resolver.pending().is_empty());
    }

    #[test]
    fn test_ambiguous_names_are_qualified() {
        let program = program(&[
            ("crate::v1", "pub struct Pet { pub name: String }"),
            ("crate::v2", "pub struct Pet { pub name: String }"),
            ("crate::v3", "/// swagger:model LegacyPet\npub struct Pet { pub name: String }"),
        ]);
        let resolver = SchemaResolver::new(&program);
        assert_eq!(
            resolver.definition_name(first_record(&program, "crate::v1", "Pet")),
            "v1.Pet"
        );
        assert_eq!(
            resolver.definition_name(first_record(&program, "crate::v2", "Pet")),
            "v2.Pet"
        );
        assert_eq!(
            resolver.definition_name(first_record(&program, "crate::v3", "Pet")),
            "LegacyPet"
        );
    }

    #[test]
    fn test_required_and_validations_on_fields() {
        let program = program(&[(
            "crate",
            r#"
            pub struct Pet {
                /// The pet's name
                /// required: true
                /// required: true
                /// max length: 50
                pub name: String,
                /// required: true
                /// required: false
                pub nickname: Option<String>,
                /// read only: true
                pub id: i64,
                pub status: Status,
                pub labels: std::collections::HashMap<String, String>,
            }
            pub enum Status { Available, Sold }
            "#,
        )]);
        let mut resolver = SchemaResolver::new(&program);
        let schema = resolver
            .build_record_schema(first_record(&program, "crate", "Pet"))
            .unwrap();
        assert_eq!(schema.required, vec!["name"]);
        let name = &schema.properties["name"];
        assert_eq!(name.description.as_deref(), Some("The pet's name"));
        assert_eq!(name.validations.max_length, Some(50));
        assert!(schema.properties["id"].read_only);
        assert_eq!(schema.properties["status"].enum_values, vec!["Available", "Sold"]);
        assert_eq!(
            schema.properties["labels"]
                .additional_properties
                .as_ref()
                .and_then(|s| s.kind.as_deref()),
            Some("string")
        );
        let keys: Vec<&String> = schema.properties.keys().collect();
        assert_eq!(keys, vec!["name", "nickname", "id", "status", "labels"]);
    }

    #[test]
    fn test_base_definitions_are_not_overwritten() {
        let program = program(&[("crate", "pub struct Pet { pub name: String }")]);
        let mut resolver = SchemaResolver::new(&program);
        let id = first_record(&program, "crate", "Pet");
        resolver.enqueue(PendingDeclaration {
            id,
            name: "Pet".to_string(),
        });
        let mut definitions = BTreeMap::new();
        let mut existing = Schema::typed("object", None);
        existing.description = Some("kept".to_string());
        definitions.insert("Pet".to_string(), existing.clone());
        assert_eq!(resolver.resolve_pending(&mut definitions).unwrap(), 0);
        assert_eq!(definitions["Pet"], existing);
    }
}
