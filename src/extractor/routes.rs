use super::{Extractor, Placement, ScanContext};
use crate::directives::{
    resolve_responses, Annotation, AnnotationKind, DirectiveValue, RouteAnnotation,
    ROUTE_DIRECTIVES,
};
use crate::error::{Error, Result};
use crate::sectioned::SectionedParser;
use crate::spec::HttpMethod;
use log::debug;

/// Extracts operations from `swagger:route` blocks.
///
/// The lines following a route annotation, up to the next route annotation in
/// the same comment, describe the operation:
///
/// ```text
/// /// swagger:route GET /pets/{id} pets getPet
/// ///
/// /// Gets a pet by id.
/// ///
/// /// Returns 404 when the pet does not exist.
/// ///
/// /// Produces:
/// /// - application/json
/// ///
/// /// Responses:
/// ///   200: petResponse
/// ///   404: notFound
/// ```
///
/// Responses are resolved against the named responses and definitions known
/// when routes are read, so parameters and responses must be extracted first.
pub struct RoutesExtractor;

impl Extractor for RoutesExtractor {
    fn extract(&self, unit: usize, context: &mut ScanContext<'_>) -> Result<()> {
        let program = context.program;
        for block in program.unit(unit).doc_blocks() {
            let starts: Vec<usize> = block
                .iter()
                .enumerate()
                .filter(|(_, line)| {
                    matches!(Annotation::parse(line), Some(Annotation::Route(_)))
                })
                .map(|(index, _)| index)
                .collect();

            for (n, start) in starts.iter().enumerate() {
                let end = starts.get(n + 1).copied().unwrap_or(block.len());
                extract_route(&block[*start..end], context)?;
            }
        }
        Ok(())
    }
}

fn extract_route(lines: &[String], context: &mut ScanContext<'_>) -> Result<()> {
    let sections = SectionedParser::new(ROUTE_DIRECTIVES)
        .with_annotation(AnnotationKind::Route)
        .with_title()
        .parse(lines);
    let Some(Annotation::Route(route)) = sections.annotation.clone() else {
        return Ok(());
    };
    let RouteAnnotation {
        method,
        path,
        tags,
        operation_id,
    } = route;

    let method = HttpMethod::parse(&method).ok_or_else(|| Error::UnsupportedMethod {
        method: method.clone(),
        operation_id: operation_id.clone(),
    })?;
    if context.routed.contains_key(&operation_id) {
        return Err(Error::DuplicateOperationId(operation_id));
    }

    let values = sections.values()?;
    let mut responses = None;
    for value in &values {
        if let DirectiveValue::Responses(entries) = value {
            responses = Some(resolve_responses(
                entries,
                &operation_id,
                &context.document.responses,
                &context.document.definitions,
            )?);
        }
    }

    let operation = context.operation_mut(&operation_id);
    if let Some(summary) = sections.title_text() {
        operation.summary = Some(summary);
    }
    if let Some(description) = sections.description_text() {
        operation.description = Some(description);
    }
    for tag in tags {
        if !operation.tags.contains(&tag) {
            operation.tags.push(tag);
        }
    }
    for value in values {
        match value {
            DirectiveValue::Consumes(consumes) => operation.consumes = consumes,
            DirectiveValue::Produces(produces) => operation.produces = produces,
            DirectiveValue::Schemes(schemes) => operation.schemes = schemes,
            DirectiveValue::Security(security) => operation.security = security,
            _ => {}
        }
    }
    if let Some(responses) = responses {
        operation.responses = responses;
    }

    debug!("Routed {} {} {}", method.as_str(), path, operation_id);
    context.routed.insert(operation_id, Placement { path, method });
    Ok(())
}
