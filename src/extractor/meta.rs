use super::{Extractor, ScanContext};
use crate::classifier::is_meta_unit;
use crate::directives::{AnnotationKind, DirectiveValue, META_DIRECTIVES};
use crate::error::Result;
use crate::sectioned::SectionedParser;
use log::debug;

/// Extracts document metadata from a unit's `swagger:meta` comment.
///
/// Only the unit's own leading (`//!`) comment is read. Its title and
/// description become `info.title` and `info.description`; directive
/// sections fill the remaining document fields:
///
/// ```text
/// //! Petstore API.
/// //!
/// //! The purpose of this application is to provide pets.
/// //!
/// //!     Schemes: http, https
/// //!     Host: petstore.example.com
/// //!     Base path: /v1
/// //!     Version: 1.0.0
/// //!     License: MIT http://opensource.org/licenses/MIT
/// //!     Contact: John Doe <john.doe@example.com> http://john.doe.com
/// //!
/// //!     Consumes:
/// //!     - application/json
/// //!
/// //! swagger:meta
/// ```
pub struct MetaExtractor;

impl Extractor for MetaExtractor {
    fn extract(&self, unit: usize, context: &mut ScanContext<'_>) -> Result<()> {
        let program = context.program;
        let compilation_unit = program.unit(unit);
        if !is_meta_unit(compilation_unit) {
            return Ok(());
        }
        debug!("Reading document metadata from {}", compilation_unit.module);

        let sections = SectionedParser::new(META_DIRECTIVES)
            .with_annotation(AnnotationKind::Meta)
            .with_title()
            .parse(&compilation_unit.doc);

        let document = &mut context.document;
        if let Some(title) = sections.title_text() {
            document.info.title = title;
        }
        if let Some(description) = sections.description_text() {
            document.info.description = Some(description);
        }
        for value in sections.values()? {
            match value {
                DirectiveValue::Consumes(consumes) => document.consumes = consumes,
                DirectiveValue::Produces(produces) => document.produces = produces,
                DirectiveValue::Schemes(schemes) => document.schemes = schemes,
                DirectiveValue::Security(security) => document.security = security,
                DirectiveValue::Version(version) => document.info.version = version,
                DirectiveValue::Host(host) => document.host = Some(host),
                DirectiveValue::BasePath(base_path) => document.base_path = Some(base_path),
                DirectiveValue::License(license) => document.info.license = Some(license),
                DirectiveValue::Contact(contact) => document.info.contact = Some(contact),
                DirectiveValue::TermsOfService(terms) => {
                    document.info.terms_of_service = Some(terms)
                }
                _ => {}
            }
        }
        Ok(())
    }
}
