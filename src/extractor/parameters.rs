use super::{simple_schema, Extractor, ScanContext};
use crate::directives::{
    find_annotation, Annotation, AnnotationKind, DirectiveValue, PARAMETER_FIELD_DIRECTIVES,
};
use crate::error::{Error, Result};
use crate::program::{DeclKind, Field};
use crate::sectioned::SectionedParser;
use crate::spec::{Parameter, ParameterLocation};
use log::debug;

/// Extracts `swagger:parameters` records.
///
/// Every field of an annotated struct becomes one parameter of each operation
/// the annotation names. Fields default to `in: query`; body parameters carry
/// a schema, all others an inline type.
///
/// ```text
/// /// swagger:parameters getPet deletePet
/// pub struct PetId {
///     /// The pet id
///     /// in: path
///     /// required: true
///     pub id: i64,
/// }
/// ```
pub struct ParametersExtractor;

impl Extractor for ParametersExtractor {
    fn extract(&self, unit: usize, context: &mut ScanContext<'_>) -> Result<()> {
        let program = context.program;
        for decl in &program.unit(unit).declarations {
            let Some(Annotation::Parameters(operation_ids)) =
                find_annotation(&decl.doc, AnnotationKind::Parameters)
            else {
                continue;
            };
            let DeclKind::Record(fields) = &decl.kind else {
                return Err(Error::NotARecord {
                    annotation: AnnotationKind::Parameters.as_str().to_string(),
                    name: decl.name.clone(),
                });
            };

            let mut parameters = Vec::with_capacity(fields.len());
            for field in fields {
                parameters.push(build_parameter(unit, field, context)?);
            }

            for id in &operation_ids {
                debug!(
                    "Registering {} parameter(s) from {} for operation {}",
                    parameters.len(),
                    decl.name,
                    id
                );
                let operation = context.operation_mut(id);
                for parameter in &parameters {
                    operation.upsert_parameter(parameter.clone());
                }
            }
        }
        Ok(())
    }
}

fn build_parameter(unit: usize, field: &Field, context: &mut ScanContext<'_>) -> Result<Parameter> {
    let sections = SectionedParser::new(PARAMETER_FIELD_DIRECTIVES)
        .with_annotation(AnnotationKind::StrFmt)
        .parse(&field.doc);
    let values = sections.values()?;

    let location = values
        .iter()
        .rev()
        .find_map(|value| match value {
            DirectiveValue::In(location) => Some(*location),
            _ => None,
        })
        .unwrap_or_default();

    let mut parameter = Parameter {
        name: field.name.clone(),
        location,
        description: sections.description_text(),
        required: location == ParameterLocation::Path,
        ..Default::default()
    };

    let strfmt = match &sections.annotation {
        Some(Annotation::StrFmt(format)) => Some(format.as_str()),
        _ => None,
    };
    let field_type = context.resolver.classify_field(unit, &field.ty, strfmt)?;
    if location == ParameterLocation::Body {
        parameter.schema = Some(Box::new(context.resolver.schema_for(field_type)));
    } else {
        let schema = simple_schema(&mut context.resolver, field_type, &field.name);
        parameter.kind = schema.kind;
        parameter.format = schema.format;
        parameter.items = schema.items;
    }

    for value in &values {
        match value {
            DirectiveValue::In(_) => {}
            DirectiveValue::Required(required) => parameter.required = *required,
            other => {
                other.apply_operation_validation(&mut parameter);
            }
        }
    }
    Ok(parameter)
}
