//! Directive extraction.
//!
//! Each extractor reads one kind of directive from a compilation unit and
//! writes what it finds into the shared [`ScanContext`]:
//!
//! - [`parameters::ParametersExtractor`]: `swagger:parameters` records
//! - [`responses::ResponsesExtractor`]: `swagger:response` records
//! - [`routes::RoutesExtractor`]: `swagger:route` blocks
//! - [`meta::MetaExtractor`]: the `swagger:meta` block of a unit
//!
//! # Example
//!
//! ```
//! use swagger_from_docs::extractor::{Extractor, ScanContext, routes::RoutesExtractor};
//! use swagger_from_docs::parser::AstParser;
//! use swagger_from_docs::spec::SpecDocument;
//!
//! let program = AstParser::load_program(
//!     "crate",
//!     &[("crate", "/// swagger:route GET /pets pets listPets\npub fn list_pets() {}")],
//! )
//! .unwrap();
//! let mut context = ScanContext::new(&program, SpecDocument::default());
//! RoutesExtractor.extract(0, &mut context).unwrap();
//! assert!(context.operations.contains_key("listPets"));
//! ```

pub mod meta;
pub mod parameters;
pub mod responses;
pub mod routes;

use crate::error::Result;
use crate::program::Program;
use crate::schema_resolver::{FieldType, SchemaResolver};
use crate::spec::{HttpMethod, Operation, Schema, SpecDocument};
use log::warn;
use std::collections::{BTreeMap, HashMap};

/// Trait for extracting one kind of directive from a compilation unit.
pub trait Extractor {
    /// Extracts directives from the unit at `unit` into `context`.
    ///
    /// # Arguments
    ///
    /// * `unit` - Index of the compilation unit in the context's program
    /// * `context` - Scan state receiving operations, responses and discovered models
    ///
    /// # Errors
    ///
    /// Returns an error when a directive is malformed or references something unknown.
    fn extract(&self, unit: usize, context: &mut ScanContext<'_>) -> Result<()>;
}

/// Where an operation sits inside the document's paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub path: String,
    pub method: HttpMethod,
}

/// Mutable state of one scan.
///
/// Operations are kept by id while scanning and only placed into the
/// document's paths once every route has been read.
pub struct ScanContext<'p> {
    pub program: &'p Program,
    pub resolver: SchemaResolver<'p>,
    /// The document being built; starts as the caller's base document
    pub document: SpecDocument,
    /// Operations by id
    pub operations: BTreeMap<String, Operation>,
    /// Placements of operations that came from the base document
    pub base_placements: HashMap<String, Placement>,
    /// Placements assigned by route directives during this scan
    pub routed: HashMap<String, Placement>,
}

impl<'p> ScanContext<'p> {
    /// Creates the scan state, moving operations with an id out of the base document's paths.
    pub fn new(program: &'p Program, mut document: SpecDocument) -> Self {
        let mut operations = BTreeMap::new();
        let mut base_placements = HashMap::new();
        for (path, item) in document.paths.iter_mut() {
            for method in HttpMethod::ALL {
                let slot = item.slot_mut(method);
                if slot.as_ref().map_or(false, |op| !op.id.is_empty()) {
                    if let Some(op) = slot.take() {
                        base_placements.insert(
                            op.id.clone(),
                            Placement {
                                path: path.clone(),
                                method,
                            },
                        );
                        operations.insert(op.id.clone(), op);
                    }
                }
            }
        }

        Self {
            program,
            resolver: SchemaResolver::new(program),
            document,
            operations,
            base_placements,
            routed: HashMap::new(),
        }
    }

    /// The operation registered under `id`, created on first use.
    pub fn operation_mut(&mut self, id: &str) -> &mut Operation {
        self.operations
            .entry(id.to_string())
            .or_insert_with(|| Operation::new(id))
    }
}

/// Inline type of a non-body parameter or a header.
///
/// Records and maps have no such representation and are left untyped.
pub(crate) fn simple_schema(resolver: &mut SchemaResolver<'_>, field_type: FieldType, name: &str) -> Schema {
    match field_type {
        FieldType::Reference(_) | FieldType::Map(_) => {
            warn!("Field {} has no simple type outside a body, leaving it untyped", name);
            Schema::default()
        }
        other => resolver.schema_for(other),
    }
}
