//! Swagger 2.0 document model produced by a scan.
//!
//! All maps are ordered so that scanning the same program twice yields
//! byte-identical documents once serialized.

use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON pointer prefix of named schemas
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";
/// JSON pointer prefix of named responses
pub const RESPONSES_PREFIX: &str = "#/responses/";

/// One security requirement: scheme name -> required scopes
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

fn default_swagger_version() -> String {
    "2.0".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Root of the generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDocument {
    /// Swagger version
    #[serde(default = "default_swagger_version")]
    pub swagger: String,
    /// API info
    #[serde(default)]
    pub info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    /// API paths (path template -> operations by method)
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    /// Named schemas
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Schema>,
    /// Named responses
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, Response>,
    /// Named parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
}

impl Default for SpecDocument {
    fn default() -> Self {
        Self {
            swagger: default_swagger_version(),
            info: Info::default(),
            host: None,
            base_path: None,
            schemes: Vec::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            security: Vec::new(),
            paths: BTreeMap::new(),
            definitions: BTreeMap::new(),
            responses: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }
}

impl SpecDocument {
    /// Decodes a base document from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decodes a base document from YAML.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Finds an operation anywhere in the paths by its id.
    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.paths
            .values()
            .flat_map(|item| item.operations())
            .map(|(_, op)| op)
            .find(|op| op.id == id)
    }
}

/// API info object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// API title
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// API version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

/// Contact information for the exposed API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// License information for the exposed API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// HTTP methods a path item has a slot for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    /// Every method, in path item slot order.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
    ];

    /// Parses a method name, ignoring case.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "PUT" => Some(HttpMethod::Put),
            "POST" => Some(HttpMethod::Post),
            "DELETE" => Some(HttpMethod::Delete),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            "PATCH" => Some(HttpMethod::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// All operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    /// The operation slot for `method`.
    pub fn slot_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
        }
    }

    pub fn get_operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
        }
    }

    /// Present operations with their methods.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |method| self.get_operation(method).map(|op| (method, op)))
    }

    pub fn is_empty(&self) -> bool {
        self.operations().next().is_none()
    }
}

/// A single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation ID, unique within the document
    #[serde(rename = "operationId", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    /// Parameters in registration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub responses: OperationResponses,
}

impl Operation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Adds a parameter, replacing an earlier one with the same name and location.
    pub fn upsert_parameter(&mut self, parameter: Parameter) {
        match self
            .parameters
            .iter_mut()
            .find(|p| p.name == parameter.name && p.location == parameter.location)
        {
            Some(existing) => *existing = parameter,
            None => self.parameters.push(parameter),
        }
    }
}

/// Responses of an operation: an optional default plus one entry per status code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Response>",
    into = "BTreeMap<String, Response>"
)]
pub struct OperationResponses {
    pub default: Option<Response>,
    pub status_codes: BTreeMap<u16, Response>,
}

impl OperationResponses {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.status_codes.is_empty()
    }
}

impl TryFrom<BTreeMap<String, Response>> for OperationResponses {
    type Error = String;

    fn try_from(map: BTreeMap<String, Response>) -> std::result::Result<Self, Self::Error> {
        let mut responses = OperationResponses::default();
        for (key, response) in map {
            if key.eq_ignore_ascii_case("default") {
                responses.default = Some(response);
            } else {
                let code = key
                    .parse::<u16>()
                    .map_err(|_| format!("invalid response status code: {}", key))?;
                responses.status_codes.insert(code, response);
            }
        }
        Ok(responses)
    }
}

impl From<OperationResponses> for BTreeMap<String, Response> {
    fn from(responses: OperationResponses) -> Self {
        let mut map: BTreeMap<String, Response> = responses
            .status_codes
            .into_iter()
            .map(|(code, response)| (code.to_string(), response))
            .collect();
        if let Some(default) = responses.default {
            map.insert("default".to_string(), default);
        }
        map
    }
}

/// Where a parameter is read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    #[default]
    Query,
    Path,
    Header,
    Body,
    FormData,
}

impl ParameterLocation {
    /// Parses a location name, ignoring case.
    pub fn parse(location: &str) -> Option<Self> {
        match location.to_ascii_lowercase().as_str() {
            "query" => Some(ParameterLocation::Query),
            "path" => Some(ParameterLocation::Path),
            "header" => Some(ParameterLocation::Header),
            "body" => Some(ParameterLocation::Body),
            "formdata" => Some(ParameterLocation::FormData),
            _ => None,
        }
    }
}

/// Validation constraints shared by schemas and parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique_items: bool,
}

/// Operation parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Primitive type for non-body parameters
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_format: Option<String>,
    /// Schema for body parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Box<Schema>>,
    #[serde(flatten)]
    pub validations: Validations,
}

/// A response, either inline or a reference to a named response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Header>,
}

impl Response {
    /// A reference to the named response.
    pub fn reference_to(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", RESPONSES_PREFIX, name)),
            ..Default::default()
        }
    }
}

/// A response header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "collectionFormat", skip_serializing_if = "Option::is_none")]
    pub collection_format: Option<String>,
    #[serde(flatten)]
    pub validations: Validations,
}

/// Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Reference to a named definition; exclusive with `kind`
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, ...)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties in declaration order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Required property names; a set, kept in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    #[serde(flatten)]
    pub validations: Validations,
}

impl Schema {
    /// An inline schema of the given type and format.
    pub fn typed(kind: &str, format: Option<&str>) -> Self {
        let mut schema = Self::default();
        schema.set_typed(kind, format);
        schema
    }

    /// A reference to the named definition.
    pub fn reference_to(name: &str) -> Self {
        let mut schema = Self::default();
        schema.set_reference(name);
        schema
    }

    pub fn set_typed(&mut self, kind: &str, format: Option<&str>) {
        self.reference = None;
        self.kind = Some(kind.to_string());
        self.format = format.map(str::to_string);
    }

    pub fn set_reference(&mut self, name: &str) {
        self.kind = None;
        self.format = None;
        self.reference = Some(format!("{}{}", DEFINITIONS_PREFIX, name));
    }

    /// Marks `field` required; a no-op when it already is.
    pub fn add_required(&mut self, field: &str) {
        if !self.required.iter().any(|name| name == field) {
            self.required.push(field.to_string());
        }
    }

    /// Removes `field` from the required set.
    pub fn remove_required(&mut self, field: &str) {
        self.required.retain(|name| name != field);
    }
}
