//! Swagger from docs - Swagger 2.0 documents from annotated Rust doc comments.
//!
//! This library reads `swagger:` directives from the doc comments of a Rust
//! program and assembles them into a Swagger 2.0 document. Routes, parameter
//! sets, responses and document metadata are declared next to the code they
//! describe; model schemas are derived from the struct and enum declarations
//! those directives reference.
//!
//! # Directives
//!
//! - `swagger:meta` in a module's `//!` comment: title, version, host and other document fields
//! - `swagger:route METHOD /path tags... operationId` on any item: one operation
//! - `swagger:parameters id...` on a struct: the parameters of one or more operations
//! - `swagger:response [name]` on a struct: a named response with body and headers
//! - `swagger:model [name]` on a struct: overrides the definition name of a model
//! - `swagger:strfmt name` on a type or field: a string with the given format
//!
//! # Architecture
//!
//! 1. [`parser`] - Parses Rust source into a [`program::Program`] of compilation units
//! 2. [`classifier`] - Groups units by the directives they carry
//! 3. [`sectioned`] - Splits a comment into title, description and directive sections
//! 4. [`directives`] - Recognizes annotations and parses directive values
//! 5. [`schema_resolver`] - Resolves field types into schemas and model definitions
//! 6. [`extractor`] - Fills the document from each kind of directive
//! 7. [`scanner`] - Runs the extractors in order and assembles the [`spec::SpecDocument`]
//!
//! # Example Usage
//!
//! ```
//! use swagger_from_docs::{config::ScanOptions, parser::AstParser, scanner::scan};
//!
//! let program = AstParser::load_program(
//!     "petstore",
//!     &[
//!         (
//!             "petstore",
//!             r#"
//!             //! Petstore API.
//!             //!
//!             //!     Version: 1.0.0
//!             //!
//!             //! swagger:meta
//!             "#,
//!         ),
//!         (
//!             "petstore::handlers",
//!             r#"
//!             /// swagger:route GET /pets/{id} pets getPet
//!             ///
//!             /// Gets a pet.
//!             ///
//!             /// Responses:
//!             ///   200: petResponse
//!             pub fn get_pet() {}
//!
//!             /// swagger:parameters getPet
//!             pub struct PetId {
//!                 /// in: path
//!                 pub id: i64,
//!             }
//!
//!             /// A single pet.
//!             /// swagger:response petResponse
//!             pub struct PetResponse {
//!                 /// in: body
//!                 pub body: Pet,
//!             }
//!
//!             pub struct Pet { pub id: i64, pub name: String }
//!             "#,
//!         ),
//!     ],
//! )
//! .unwrap();
//!
//! let document = scan(&program, None, &ScanOptions::default()).unwrap();
//! assert_eq!(document.info.title, "Petstore API.");
//! assert_eq!(document.info.version, "1.0.0");
//! assert!(document.definitions.contains_key("Pet"));
//! println!("{}", serde_json::to_string_pretty(&document).unwrap());
//! ```

pub mod classifier;
pub mod config;
pub mod directives;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod program;
pub mod scanner;
pub mod schema_resolver;
pub mod sectioned;
pub mod spec;

pub use error::{Error, Result};
pub use scanner::scan;
