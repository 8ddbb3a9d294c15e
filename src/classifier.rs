use crate::config::ModuleFilter;
use crate::directives::{find_annotation, Annotation, AnnotationKind};
use crate::program::{CompilationUnit, Program};
use log::debug;

/// Sorts compilation units by the directives they carry.
///
/// The `Classifier` makes one pass over a program and records, for each kind
/// of top-level directive, which units carry it. Units whose module is
/// rejected by the [`ModuleFilter`] are skipped. Units holding plain models
/// are not classified; models are reached through discovery instead.
pub struct Classifier<'a> {
    filter: &'a ModuleFilter,
}

/// Unit indexes grouped by directive kind, in program order.
///
/// A unit carrying several kinds of directive appears in several groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Units whose own leading comment carries `swagger:meta`
    pub meta: Vec<usize>,
    /// Units with a declaration annotated `swagger:parameters`
    pub parameters: Vec<usize>,
    /// Units with a declaration annotated `swagger:response`
    pub responses: Vec<usize>,
    /// Units with a `swagger:route` in any comment
    pub routes: Vec<usize>,
}

impl<'a> Classifier<'a> {
    pub fn new(filter: &'a ModuleFilter) -> Self {
        Self { filter }
    }

    /// Classifies every unit of `program` the filter allows.
    ///
    /// # Arguments
    ///
    /// * `program` - The loaded program
    ///
    /// # Returns
    ///
    /// Returns a `Classification` listing unit indexes per directive kind.
    pub fn classify(&self, program: &Program) -> Classification {
        let mut classification = Classification::default();

        for (index, unit) in program.units().iter().enumerate() {
            if !self.filter.allows(&unit.module) {
                debug!("Skipping filtered module {}", unit.module);
                continue;
            }
            if find_annotation(&unit.doc, AnnotationKind::Meta).is_some() {
                classification.meta.push(index);
            }
            if has_declaration_annotation(unit, AnnotationKind::Parameters) {
                classification.parameters.push(index);
            }
            if has_declaration_annotation(unit, AnnotationKind::Response) {
                classification.responses.push(index);
            }
            if unit
                .doc_blocks()
                .any(|block| find_annotation(block, AnnotationKind::Route).is_some())
            {
                classification.routes.push(index);
            }
        }

        debug!(
            "Classified units: {} meta, {} parameters, {} responses, {} routes",
            classification.meta.len(),
            classification.parameters.len(),
            classification.responses.len(),
            classification.routes.len()
        );
        classification
    }
}

fn has_declaration_annotation(unit: &CompilationUnit, kind: AnnotationKind) -> bool {
    unit.declarations
        .iter()
        .any(|decl| find_annotation(&decl.doc, kind).is_some())
}

/// Whether the unit's leading comment is a meta block.
pub fn is_meta_unit(unit: &CompilationUnit) -> bool {
    matches!(
        find_annotation(&unit.doc, AnnotationKind::Meta),
        Some(Annotation::Meta)
    )
}
