use crate::classifier::{Classification, Classifier};
use crate::config::ScanOptions;
use crate::error::{Error, Result};
use crate::extractor::{
    meta::MetaExtractor, parameters::ParametersExtractor, responses::ResponsesExtractor,
    routes::RoutesExtractor, Extractor, ScanContext,
};
use crate::program::Program;
use crate::spec::SpecDocument;
use log::{debug, info};

/// Scans a program and builds a Swagger document from its directives.
///
/// This is a convenience wrapper around [`AppScanner`].
///
/// # Arguments
///
/// * `program` - The loaded program
/// * `base` - Document to merge into; an empty document when `None`
/// * `options` - Include/exclude filters for classification
///
/// # Errors
///
/// Returns an error if a directive is malformed, a referenced response,
/// operation or type cannot be found, or a filter pattern is invalid. No
/// partial document is returned.
///
/// # Example
///
/// ```
/// use swagger_from_docs::config::ScanOptions;
/// use swagger_from_docs::parser::AstParser;
/// use swagger_from_docs::scanner::scan;
///
/// let program = AstParser::load_program(
///     "crate",
///     &[(
///         "crate",
///         r#"
///         /// swagger:route GET /pets pets listPets
///         ///
///         /// Lists pets.
///         ///
///         /// Responses:
///         ///   200: petsResponse
///         pub fn list_pets() {}
///
///         /// swagger:response petsResponse
///         pub struct PetsResponse {
///             /// in: body
///             pub body: Vec<Pet>,
///         }
///
///         pub struct Pet { pub name: String }
///         "#,
///     )],
/// )
/// .unwrap();
/// let document = scan(&program, None, &ScanOptions::default()).unwrap();
/// assert!(document.paths["/pets"].get.is_some());
/// assert!(document.definitions.contains_key("Pet"));
/// ```
pub fn scan(program: &Program, base: Option<SpecDocument>, options: &ScanOptions) -> Result<SpecDocument> {
    AppScanner::new(program, base, options)?.scan()
}

/// Drives one scan of a program.
///
/// Units are classified once, then processed in a fixed order: parameters,
/// responses, model discovery until no new models appear, routes, operation
/// placement and finally document metadata. Routes refer to parameters,
/// responses and models by name, so everything they refer to exists before
/// they are read.
pub struct AppScanner<'p> {
    classification: Classification,
    context: ScanContext<'p>,
}

impl<'p> AppScanner<'p> {
    /// Creates a scanner merging into `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFilter`] if an include or exclude pattern is not a valid glob.
    pub fn new(program: &'p Program, base: Option<SpecDocument>, options: &ScanOptions) -> Result<Self> {
        let filter = options.module_filter()?;
        let classification = Classifier::new(&filter).classify(program);
        Ok(Self {
            classification,
            context: ScanContext::new(program, base.unwrap_or_default()),
        })
    }

    /// Runs the scan and returns the finished document.
    pub fn scan(mut self) -> Result<SpecDocument> {
        info!(
            "Scanning {} compilation unit(s)",
            self.context.program.units().len()
        );

        let classification = std::mem::take(&mut self.classification);
        self.run(&ParametersExtractor, &classification.parameters)?;
        self.run(&ResponsesExtractor, &classification.responses)?;

        let added = self
            .context
            .resolver
            .resolve_pending(&mut self.context.document.definitions)?;
        info!("Resolved {} model definition(s)", added);

        self.run(&RoutesExtractor, &classification.routes)?;
        self.place_operations()?;
        self.run(&MetaExtractor, &classification.meta)?;

        let mut document = self.context.document;
        document.paths.retain(|_, item| !item.is_empty());
        info!(
            "Built document with {} path(s), {} definition(s) and {} response(s)",
            document.paths.len(),
            document.definitions.len(),
            document.responses.len()
        );
        Ok(document)
    }

    fn run(&mut self, extractor: &dyn Extractor, units: &[usize]) -> Result<()> {
        for &unit in units {
            debug!("Extracting from {}", self.context.program.unit(unit).module);
            extractor.extract(unit, &mut self.context)?;
        }
        Ok(())
    }

    /// Puts every registered operation at its route's path and method.
    ///
    /// Operations routed in this scan win over their base document placement.
    /// An operation that has neither was only ever named by parameters.
    fn place_operations(&mut self) -> Result<()> {
        let operations = std::mem::take(&mut self.context.operations);
        for (id, operation) in operations {
            let placement = self
                .context
                .routed
                .get(&id)
                .or_else(|| self.context.base_placements.get(&id))
                .cloned()
                .ok_or_else(|| Error::UnknownOperation(id.clone()))?;
            let item = self
                .context
                .document
                .paths
                .entry(placement.path)
                .or_default();
            *item.slot_mut(placement.method) = Some(operation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::spec::{HttpMethod, Operation, PathItem};

    fn program(source: &str) -> Program {
        AstParser::load_program("crate", &[("crate", source)]).unwrap()
    }

    #[test]
    fn test_parameters_without_route_is_error() {
        let program = program(
            r#"
            /// swagger:parameters orphan
            pub struct Params { pub q: String }
            "#,
        );
        let result = scan(&program, None, &ScanOptions::default());
        assert!(matches!(result, Err(Error::UnknownOperation(id)) if id == "orphan"));
    }

    #[test]
    fn test_parameters_for_base_operation() {
        let program = program(
            r#"
            /// swagger:parameters listPets
            pub struct Params { pub limit: i32 }
            "#,
        );
        let mut base = SpecDocument::default();
        let mut item = PathItem::default();
        item.get = Some(Operation::new("listPets"));
        base.paths.insert("/pets".to_string(), item);

        let document = scan(&program, Some(base), &ScanOptions::default()).unwrap();
        let operation = document.paths["/pets"].get_operation(HttpMethod::Get).unwrap();
        assert_eq!(operation.parameters.len(), 1);
        assert_eq!(operation.parameters[0].name, "limit");
    }

    #[test]
    fn test_route_moves_base_operation() {
        let program = program(
            r#"
            /// swagger:route GET /v2/pets pets listPets
            pub fn list_pets() {}
            "#,
        );
        let mut base = SpecDocument::default();
        let mut item = PathItem::default();
        let mut operation = Operation::new("listPets");
        operation.tags.push("legacy".to_string());
        item.get = Some(operation);
        base.paths.insert("/pets".to_string(), item);

        let document = scan(&program, Some(base), &ScanOptions::default()).unwrap();
        assert!(!document.paths.contains_key("/pets"));
        let operation = document.paths["/v2/pets"].get.as_ref().unwrap();
        assert_eq!(operation.tags, vec!["legacy", "pets"]);
    }

    #[test]
    fn test_external_crate_type_is_error() {
        let program = program(
            r#"
            use chrono;

            /// swagger:response petResponse
            pub struct PetResponse {
                /// in: body
                pub body: Pet,
            }

            pub struct Pet { pub born: chrono::NaiveDate }
            "#,
        );
        let result = scan(&program, None, &ScanOptions::default());
        assert!(matches!(result, Err(Error::UnknownModule { .. })));
    }

    #[test]
    fn test_invalid_filter() {
        let program = program("");
        let options = ScanOptions::default().exclude("[");
        assert!(matches!(
            scan(&program, None, &options),
            Err(Error::InvalidFilter(_))
        ));
    }
}
