use super::{simple_schema, Extractor, ScanContext};
use crate::directives::{
    find_annotation, Annotation, AnnotationKind, DirectiveValue, PARAMETER_FIELD_DIRECTIVES,
};
use crate::error::{Error, Result};
use crate::program::DeclKind;
use crate::sectioned::SectionedParser;
use crate::spec::{Header, ParameterLocation, Response};
use log::debug;

/// Extracts `swagger:response` records into named responses.
///
/// The struct comment is the response description. The field marked
/// `in: body` supplies the response schema; every other field becomes a
/// response header named after the field. A response name that already
/// exists in the document is left as it is.
pub struct ResponsesExtractor;

impl Extractor for ResponsesExtractor {
    fn extract(&self, unit: usize, context: &mut ScanContext<'_>) -> Result<()> {
        let program = context.program;
        for decl in &program.unit(unit).declarations {
            let Some(Annotation::Response(name)) =
                find_annotation(&decl.doc, AnnotationKind::Response)
            else {
                continue;
            };
            let DeclKind::Record(fields) = &decl.kind else {
                return Err(Error::NotARecord {
                    annotation: AnnotationKind::Response.as_str().to_string(),
                    name: decl.name.clone(),
                });
            };
            let name = name.unwrap_or_else(|| decl.name.clone());
            if context.document.responses.contains_key(&name) {
                debug!("Response {} already defined, skipping {}", name, decl.name);
                continue;
            }

            let sections = SectionedParser::new(&[])
                .with_annotation(AnnotationKind::Response)
                .parse(&decl.doc);
            let mut response = Response {
                description: sections.description_text().unwrap_or_default(),
                ..Default::default()
            };

            let field_parser = SectionedParser::new(PARAMETER_FIELD_DIRECTIVES)
                .with_annotation(AnnotationKind::StrFmt);
            for field in fields {
                let field_sections = field_parser.parse(&field.doc);
                let values = field_sections.values()?;
                let strfmt = match &field_sections.annotation {
                    Some(Annotation::StrFmt(format)) => Some(format.as_str()),
                    _ => None,
                };
                let field_type = context.resolver.classify_field(unit, &field.ty, strfmt)?;

                let in_body = values
                    .iter()
                    .any(|value| *value == DirectiveValue::In(ParameterLocation::Body));
                if in_body {
                    let mut schema = context.resolver.schema_for(field_type);
                    for value in &values {
                        value.apply_validation(&mut schema);
                    }
                    response.schema = Some(Box::new(schema));
                    continue;
                }

                let schema = simple_schema(&mut context.resolver, field_type, &field.name);
                let mut header = Header {
                    description: field_sections.description_text(),
                    kind: schema.kind,
                    format: schema.format,
                    items: schema.items,
                    ..Default::default()
                };
                for value in &values {
                    value.apply_operation_validation(&mut header);
                }
                response.headers.insert(field.name.clone(), header);
            }

            debug!("Registered response {}", name);
            context.document.responses.insert(name, response);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::program::Program;
    use crate::spec::SpecDocument;

    fn program(source: &str) -> Program {
        AstParser::load_program("crate", &[("crate", source)]).unwrap()
    }

    #[test]
    fn test_body_and_headers() {
        let program = program(
            r#"
            pub struct Pet { pub name: String }

            /// A list of pets.
            /// swagger:response petsResponse
            pub struct PetsResponse {
                /// in: body
                pub body: Vec<Pet>,
                /// Rate limit for the caller
                /// maximum: 100
                #[serde(rename = "X-Rate-Limit")]
                pub rate_limit: u32,
            }
            "#,
        );
        let mut context = ScanContext::new(&program, SpecDocument::default());
        ResponsesExtractor.extract(0, &mut context).unwrap();

        let response = &context.document.responses["petsResponse"];
        assert_eq!(response.description, "A list of pets.");
        let schema = response.schema.as_ref().unwrap();
        assert_eq!(schema.kind.as_deref(), Some("array"));
        assert_eq!(
            schema.items.as_ref().and_then(|s| s.reference.as_deref()),
            Some("#/definitions/Pet")
        );

        let header = &response.headers["X-Rate-Limit"];
        assert_eq!(header.description.as_deref(), Some("Rate limit for the caller"));
        assert_eq!(header.kind.as_deref(), Some("integer"));
        assert_eq!(header.format.as_deref(), Some("uint32"));
        assert_eq!(header.validations.maximum, Some(100.0));
    }

    #[test]
    fn test_unnamed_response_uses_identifier() {
        let program = program(
            r#"
            /// swagger:response
            pub struct NotFound {}
            "#,
        );
        let mut context = ScanContext::new(&program, SpecDocument::default());
        ResponsesExtractor.extract(0, &mut context).unwrap();
        assert!(context.document.responses.contains_key("NotFound"));
    }

    #[test]
    fn test_existing_response_is_kept() {
        let program = program(
            r#"
            /// Replacement.
            /// swagger:response errorResponse
            pub struct ErrorResponse {}
            "#,
        );
        let mut base = SpecDocument::default();
        base.responses.insert(
            "errorResponse".to_string(),
            Response {
                description: "Original".to_string(),
                ..Default::default()
            },
        );
        let mut context = ScanContext::new(&program, base);
        ResponsesExtractor.extract(0, &mut context).unwrap();
        assert_eq!(context.document.responses["errorResponse"].description, "Original");
    }
}
