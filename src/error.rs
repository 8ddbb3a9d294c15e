use thiserror::Error;

/// Result type alias for scanning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a scan.
///
/// Every failure is deterministic: the scanner performs no I/O beyond the
/// already loaded program, so running the same scan again fails the same way.
#[derive(Debug, Error)]
pub enum Error {
    /// A directive grammar matched but its payload could not be parsed.
    #[error("malformed {directive} directive: {message}")]
    MalformedDirective { directive: String, message: String },

    /// A route directive names an HTTP method that has no slot in a path item.
    #[error("unsupported method {method} in route {operation_id}")]
    UnsupportedMethod { method: String, operation_id: String },

    /// A responses directive names neither a known response nor a known definition.
    #[error("operation {operation_id}: no response or definition named {name}")]
    UnresolvedResponse { operation_id: String, name: String },

    /// The same status code (or `default`) appears twice in one responses directive.
    #[error("operation {operation_id}: response {code} is assigned more than once")]
    DuplicateResponseCode { operation_id: String, code: String },

    /// Parameters were registered for an operation id that no route declares.
    #[error("parameters registered for unknown operation {0}")]
    UnknownOperation(String),

    /// Two route directives declare the same operation id.
    #[error("operation id {0} is declared by more than one route")]
    DuplicateOperationId(String),

    /// A path in a field type points at a module the program does not contain.
    #[error("no module found for {path} (referenced from {from})")]
    UnknownModule { path: String, from: String },

    /// A referenced declaration is absent from the module it should live in.
    #[error("type {name} not found in module {module}")]
    UnresolvedType { name: String, module: String },

    /// Following a chain of aliases came back to an alias already visited.
    #[error("alias cycle detected at {0}")]
    AliasCycle(String),

    /// A parameters or response override is attached to something other than a record.
    #[error("{annotation} annotation on {name} requires a struct with named fields")]
    NotARecord { annotation: String, name: String },

    /// An include or exclude filter is not a valid glob pattern.
    #[error("invalid module filter: {0}")]
    InvalidFilter(#[from] glob::PatternError),

    /// The base document could not be decoded from JSON.
    #[error("failed to decode base document from JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The base document could not be decoded from YAML.
    #[error("failed to decode base document from YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn malformed(directive: &str, message: impl ToString) -> Self {
        Error::MalformedDirective {
            directive: directive.to_string(),
            message: message.to_string(),
        }
    }
}
