//! Directive grammars and their value parsers.
//!
//! Two families of line grammars live here:
//!
//! - **annotations** (`swagger:route`, `swagger:model`, ...) are case sensitive
//!   and mark what a documentation block describes;
//! - **section directives** (`maximum: <10`, `required: true`, `responses:`)
//!   are case insensitive `Key: value` lines inside a block.
//!
//! Every grammar is anchored at the start of the line once leading comment
//! noise (anything that is neither a letter nor a digit) is skipped, and lines
//! are matched with trailing whitespace removed. A matched directive is turned
//! into a typed [`DirectiveValue`] which callers then apply to the schema,
//! parameter, header or operation they are building.

use crate::error::{Error, Result};
use crate::spec::{
    Contact, Header, License, OperationResponses, Parameter, ParameterLocation, Response, Schema,
    SecurityRequirement, Validations,
};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

const NUMBER: &str = r"([+-]?(?:\p{N}+\.)?\p{N}+)";
const PATH: &str = r"((?:/[\p{L}\p{N}\p{Pd}\p{Pc}{}]*)+/?)";
const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ws", "wss"];

fn directive_regex(body: &str) -> Regex {
    Regex::new(&format!(r"(?i)^[^\p{{L}}\p{{N}}]*{}", body))
        .expect("directive regex should be valid")
}

fn annotation_regex(body: &str) -> Regex {
    Regex::new(&format!(r"^[^\p{{L}}\p{{N}}]*\+?swagger:{}", body))
        .expect("annotation regex should be valid")
}

static RX_ANNOTATION: Lazy<Regex> = Lazy::new(|| annotation_regex(r"([\p{L}\p{N}\p{Pd}\p{Pc}]+)"));
static RX_META: Lazy<Regex> = Lazy::new(|| annotation_regex(r"meta$"));
static RX_STRFMT: Lazy<Regex> =
    Lazy::new(|| annotation_regex(r"strfmt\p{Zs}+(\p{L}[\p{L}\p{N}\p{Pd}\p{Pc}]+)$"));
static RX_MODEL: Lazy<Regex> =
    Lazy::new(|| annotation_regex(r"model(?:\p{Zs}+(\p{L}[\p{L}\p{N}\p{Pd}\p{Pc}]+))?$"));
static RX_RESPONSE: Lazy<Regex> =
    Lazy::new(|| annotation_regex(r"response(?:\p{Zs}+(\p{L}[\p{L}\p{N}\p{Pd}\p{Pc}]+))?$"));
static RX_PARAMETERS: Lazy<Regex> =
    Lazy::new(|| annotation_regex(r"parameters\p{Zs}+(\p{L}[\p{L}\p{N}\p{Pd}\p{Pc}\p{Zs}]+)$"));
static RX_ROUTE: Lazy<Regex> = Lazy::new(|| {
    annotation_regex(&format!(
        r"route\p{{Zs}}*(\p{{L}}+)\p{{Zs}}*{}\p{{Zs}}+(\p{{L}}[\p{{L}}\p{{N}}\p{{Pd}}\p{{Pc}}\p{{Zs}}]+)\p{{Zs}}+((?:\p{{L}}[\p{{L}}\p{{N}}\p{{Pd}}\p{{Pc}}]+)+)$",
        PATH
    ))
});

static RX_MAXIMUM: Lazy<Regex> = Lazy::new(|| {
    directive_regex(&format!(
        r"max(?:imum)?\p{{Zs}}*:\p{{Zs}}*([<=])?\p{{Zs}}*{}$",
        NUMBER
    ))
});
static RX_MINIMUM: Lazy<Regex> = Lazy::new(|| {
    directive_regex(&format!(
        r"min(?:imum)?\p{{Zs}}*:\p{{Zs}}*([>=])?\p{{Zs}}*{}$",
        NUMBER
    ))
});
static RX_MULTIPLE_OF: Lazy<Regex> = Lazy::new(|| {
    directive_regex(&format!(
        r"multiple\p{{Zs}}*of\p{{Zs}}*:\p{{Zs}}*{}$",
        NUMBER
    ))
});
static RX_MAX_LENGTH: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"max(?:imum)?(?:\p{Zs}*[\p{Pd}\p{Pc}]?len(?:gth)?)\p{Zs}*:\p{Zs}*(\p{N}+)$")
});
static RX_MIN_LENGTH: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"min(?:imum)?(?:\p{Zs}*[\p{Pd}\p{Pc}]?len(?:gth)?)\p{Zs}*:\p{Zs}*(\p{N}+)$")
});
static RX_PATTERN: Lazy<Regex> = Lazy::new(|| directive_regex(r"pattern\p{Zs}*:\p{Zs}*(.*)$"));
static RX_MAX_ITEMS: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"max(?:imum)?(?:\p{Zs}*|[\p{Pd}\p{Pc}]|\.)?items\p{Zs}*:\p{Zs}*(\p{N}+)$")
});
static RX_MIN_ITEMS: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"min(?:imum)?(?:\p{Zs}*|[\p{Pd}\p{Pc}]|\.)?items\p{Zs}*:\p{Zs}*(\p{N}+)$")
});
static RX_UNIQUE: Lazy<Regex> =
    Lazy::new(|| directive_regex(r"unique\p{Zs}*:\p{Zs}*(true|false)$"));
static RX_COLLECTION_FORMAT: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"collection(?:\p{Zs}*[\p{Pd}\p{Pc}]?format)\p{Zs}*:\p{Zs}*(.*)$")
});
static RX_REQUIRED: Lazy<Regex> =
    Lazy::new(|| directive_regex(r"required\p{Zs}*:\p{Zs}*(true|false)$"));
static RX_READ_ONLY: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"read(?:\p{Zs}*|[\p{Pd}\p{Pc}])?only\p{Zs}*:\p{Zs}*(true|false)$")
});
static RX_IN: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"(?:in|source)\p{Zs}*:\p{Zs}*(query|path|header|body|formData)$")
});
static RX_SCHEMES: Lazy<Regex> = Lazy::new(|| directive_regex(r"schemes\p{Zs}*:\p{Zs}*(.*)$"));
static RX_SECURITY: Lazy<Regex> = Lazy::new(|| directive_regex(r"security\p{Zs}*:"));
static RX_RESPONSES: Lazy<Regex> = Lazy::new(|| directive_regex(r"responses\p{Zs}*:"));
static RX_CONSUMES: Lazy<Regex> = Lazy::new(|| directive_regex(r"consumes\p{Zs}*:"));
static RX_PRODUCES: Lazy<Regex> = Lazy::new(|| directive_regex(r"produces\p{Zs}*:"));
static RX_VERSION: Lazy<Regex> =
    Lazy::new(|| directive_regex(r"version\p{Zs}*:\p{Zs}*(.+)$"));
static RX_HOST: Lazy<Regex> = Lazy::new(|| directive_regex(r"host\p{Zs}*:\p{Zs}*(.+)$"));
static RX_BASE_PATH: Lazy<Regex> = Lazy::new(|| {
    directive_regex(&format!(r"base\p{{Zs}}*-*path\p{{Zs}}*:\p{{Zs}}*{}$", PATH))
});
static RX_LICENSE: Lazy<Regex> =
    Lazy::new(|| directive_regex(r"license\p{Zs}*:\p{Zs}*(.+)$"));
static RX_CONTACT: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"contact\p{Zs}*-?(?:info\p{Zs}*)?:\p{Zs}*(.+)$")
});
static RX_TERMS_OF_SERVICE: Lazy<Regex> = Lazy::new(|| {
    directive_regex(r"t(?:erms)?\p{Zs}*-?o(?:f)?\p{Zs}*-?s(?:ervice)?\p{Zs}*:")
});

static RX_SCHEME_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,\s]+").expect("scheme separator regex should be valid"));
static RX_NOT_SCOPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{N}\p{Zs},:._\-/]").expect("scope filter regex should be valid")
});
static RX_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^<>\s]+@[^<>\s]+)>").expect("email regex should be valid"));

/// Kind of top-level annotation a documentation block may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Meta,
    StrFmt,
    Model,
    Response,
    Parameters,
    Route,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Meta => "swagger:meta",
            AnnotationKind::StrFmt => "swagger:strfmt",
            AnnotationKind::Model => "swagger:model",
            AnnotationKind::Response => "swagger:response",
            AnnotationKind::Parameters => "swagger:parameters",
            AnnotationKind::Route => "swagger:route",
        }
    }
}

/// A route annotation: `swagger:route GET /pets/{id} pets getPet`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAnnotation {
    /// HTTP method as written
    pub method: String,
    /// Path template
    pub path: String,
    /// Tags from the whitespace separated tag phrase
    pub tags: Vec<String>,
    pub operation_id: String,
}

/// A parsed top-level annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Meta,
    /// Formatted string type name
    StrFmt(String),
    /// Model with an optional definition name override
    Model(Option<String>),
    /// Named response; the declaration identifier is used when no name is given
    Response(Option<String>),
    /// Operation ids the parameters belong to
    Parameters(Vec<String>),
    Route(RouteAnnotation),
}

impl Annotation {
    /// Whether the line carries an annotation marker at all.
    pub fn is_marker(line: &str) -> bool {
        RX_ANNOTATION.is_match(line.trim_end())
    }

    /// Parses the annotation on the line, if it is a well-formed one.
    pub fn parse(line: &str) -> Option<Annotation> {
        let line = line.trim_end();
        let name = RX_ANNOTATION.captures(line)?.get(1)?.as_str();
        match name {
            "meta" => RX_META.is_match(line).then_some(Annotation::Meta),
            "strfmt" => RX_STRFMT
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| Annotation::StrFmt(m.as_str().to_string())),
            "model" => RX_MODEL
                .captures(line)
                .map(|caps| Annotation::Model(caps.get(1).map(|m| m.as_str().to_string()))),
            "response" => RX_RESPONSE
                .captures(line)
                .map(|caps| Annotation::Response(caps.get(1).map(|m| m.as_str().to_string()))),
            "parameters" => RX_PARAMETERS
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| {
                    Annotation::Parameters(
                        m.as_str().split_whitespace().map(str::to_string).collect(),
                    )
                }),
            "route" => RX_ROUTE.captures(line).map(|caps| {
                let capture = |i: usize| caps.get(i).map_or("", |m| m.as_str()).to_string();
                Annotation::Route(RouteAnnotation {
                    method: capture(1),
                    path: capture(2),
                    tags: capture(3).split_whitespace().map(str::to_string).collect(),
                    operation_id: capture(4),
                })
            }),
            _ => None,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Meta => AnnotationKind::Meta,
            Annotation::StrFmt(_) => AnnotationKind::StrFmt,
            Annotation::Model(_) => AnnotationKind::Model,
            Annotation::Response(_) => AnnotationKind::Response,
            Annotation::Parameters(_) => AnnotationKind::Parameters,
            Annotation::Route(_) => AnnotationKind::Route,
        }
    }
}

/// Finds the first annotation of `kind` in a documentation block.
pub fn find_annotation(lines: &[String], kind: AnnotationKind) -> Option<Annotation> {
    lines
        .iter()
        .filter(|line| Annotation::is_marker(line))
        .filter_map(|line| Annotation::parse(line))
        .find(|annotation| annotation.kind() == kind)
}

/// The format name of a `swagger:strfmt` annotation in the block, if any.
pub fn strfmt_name(lines: &[String]) -> Option<String> {
    match find_annotation(lines, AnnotationKind::StrFmt) {
        Some(Annotation::StrFmt(name)) => Some(name),
        _ => None,
    }
}

/// A section directive grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Maximum,
    Minimum,
    MultipleOf,
    MaxLength,
    MinLength,
    Pattern,
    MaxItems,
    MinItems,
    Unique,
    CollectionFormat,
    Required,
    ReadOnly,
    In,
    Schemes,
    Security,
    Responses,
    Consumes,
    Produces,
    Version,
    Host,
    BasePath,
    License,
    Contact,
    TermsOfService,
}

/// Directives understood on a schema property.
pub const SCHEMA_FIELD_DIRECTIVES: &[Directive] = &[
    Directive::Maximum,
    Directive::Minimum,
    Directive::MultipleOf,
    Directive::MaxLength,
    Directive::MinLength,
    Directive::Pattern,
    Directive::MaxItems,
    Directive::MinItems,
    Directive::Unique,
    Directive::Required,
    Directive::ReadOnly,
];

/// Directives understood on a parameter or response header field.
pub const PARAMETER_FIELD_DIRECTIVES: &[Directive] = &[
    Directive::Maximum,
    Directive::Minimum,
    Directive::MultipleOf,
    Directive::MaxLength,
    Directive::MinLength,
    Directive::Pattern,
    Directive::MaxItems,
    Directive::MinItems,
    Directive::Unique,
    Directive::CollectionFormat,
    Directive::In,
    Directive::Required,
];

/// Directives understood in a route body.
pub const ROUTE_DIRECTIVES: &[Directive] = &[
    Directive::Consumes,
    Directive::Produces,
    Directive::Schemes,
    Directive::Security,
    Directive::Responses,
];

/// Directives understood in the meta block.
pub const META_DIRECTIVES: &[Directive] = &[
    Directive::Consumes,
    Directive::Produces,
    Directive::Schemes,
    Directive::Security,
    Directive::Version,
    Directive::Host,
    Directive::BasePath,
    Directive::License,
    Directive::Contact,
    Directive::TermsOfService,
];

impl Directive {
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Maximum => "maximum",
            Directive::Minimum => "minimum",
            Directive::MultipleOf => "multipleOf",
            Directive::MaxLength => "maxLength",
            Directive::MinLength => "minLength",
            Directive::Pattern => "pattern",
            Directive::MaxItems => "maxItems",
            Directive::MinItems => "minItems",
            Directive::Unique => "unique",
            Directive::CollectionFormat => "collectionFormat",
            Directive::Required => "required",
            Directive::ReadOnly => "readOnly",
            Directive::In => "in",
            Directive::Schemes => "schemes",
            Directive::Security => "security",
            Directive::Responses => "responses",
            Directive::Consumes => "consumes",
            Directive::Produces => "produces",
            Directive::Version => "version",
            Directive::Host => "host",
            Directive::BasePath => "basePath",
            Directive::License => "license",
            Directive::Contact => "contact",
            Directive::TermsOfService => "termsOfService",
        }
    }

    /// Multi-line directives capture the lines following their keyword line.
    pub fn is_multi_line(&self) -> bool {
        matches!(
            self,
            Directive::Security
                | Directive::Responses
                | Directive::Consumes
                | Directive::Produces
                | Directive::TermsOfService
        )
    }

    fn regex(&self) -> &'static Regex {
        match self {
            Directive::Maximum => &RX_MAXIMUM,
            Directive::Minimum => &RX_MINIMUM,
            Directive::MultipleOf => &RX_MULTIPLE_OF,
            Directive::MaxLength => &RX_MAX_LENGTH,
            Directive::MinLength => &RX_MIN_LENGTH,
            Directive::Pattern => &RX_PATTERN,
            Directive::MaxItems => &RX_MAX_ITEMS,
            Directive::MinItems => &RX_MIN_ITEMS,
            Directive::Unique => &RX_UNIQUE,
            Directive::CollectionFormat => &RX_COLLECTION_FORMAT,
            Directive::Required => &RX_REQUIRED,
            Directive::ReadOnly => &RX_READ_ONLY,
            Directive::In => &RX_IN,
            Directive::Schemes => &RX_SCHEMES,
            Directive::Security => &RX_SECURITY,
            Directive::Responses => &RX_RESPONSES,
            Directive::Consumes => &RX_CONSUMES,
            Directive::Produces => &RX_PRODUCES,
            Directive::Version => &RX_VERSION,
            Directive::Host => &RX_HOST,
            Directive::BasePath => &RX_BASE_PATH,
            Directive::License => &RX_LICENSE,
            Directive::Contact => &RX_CONTACT,
            Directive::TermsOfService => &RX_TERMS_OF_SERVICE,
        }
    }

    /// Whether the line (trailing whitespace ignored) is this directive's keyword line.
    pub fn matches(&self, line: &str) -> bool {
        self.regex().is_match(line.trim_end())
    }

    /// Parses captured lines into typed values.
    ///
    /// Single-line directives yield one value per captured line, in order, so
    /// a repeated `required:` line is applied as many times as it is written.
    /// Multi-line directives yield at most one value for the whole block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDirective`] when a line matches the grammar
    /// but its payload does not parse.
    pub fn parse(&self, lines: &[String]) -> Result<Vec<DirectiveValue>> {
        if self.is_multi_line() {
            return Ok(self.parse_block(lines)?.into_iter().collect());
        }
        let mut values = Vec::new();
        for line in lines {
            if let Some(value) = self.parse_line(line.trim_end())? {
                values.push(value);
            }
        }
        Ok(values)
    }

    fn capture<'a>(&self, line: &'a str, group: usize) -> Option<&'a str> {
        self.regex()
            .captures(line)
            .and_then(|caps| caps.get(group))
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
    }

    fn parse_line(&self, line: &str) -> Result<Option<DirectiveValue>> {
        let value = match self {
            Directive::Maximum | Directive::Minimum => {
                let Some(number) = self.capture(line, 2) else {
                    return Ok(None);
                };
                let value = self.float(number)?;
                let marker = if *self == Directive::Maximum { "<" } else { ">" };
                let exclusive = self.capture(line, 1) == Some(marker);
                if *self == Directive::Maximum {
                    DirectiveValue::Maximum { value, exclusive }
                } else {
                    DirectiveValue::Minimum { value, exclusive }
                }
            }
            Directive::MultipleOf => match self.capture(line, 1) {
                Some(number) => DirectiveValue::MultipleOf(self.float(number)?),
                None => return Ok(None),
            },
            Directive::MaxLength
            | Directive::MinLength
            | Directive::MaxItems
            | Directive::MinItems => {
                let Some(number) = self.capture(line, 1) else {
                    return Ok(None);
                };
                let n = self.integer(number)?;
                match self {
                    Directive::MaxLength => DirectiveValue::MaxLength(n),
                    Directive::MinLength => DirectiveValue::MinLength(n),
                    Directive::MaxItems => DirectiveValue::MaxItems(n),
                    _ => DirectiveValue::MinItems(n),
                }
            }
            Directive::Pattern => match self.capture(line, 1) {
                Some(pattern) => DirectiveValue::Pattern(pattern.to_string()),
                None => return Ok(None),
            },
            Directive::CollectionFormat => match self.capture(line, 1) {
                Some(format) => DirectiveValue::CollectionFormat(format.trim().to_string()),
                None => return Ok(None),
            },
            Directive::Unique | Directive::Required | Directive::ReadOnly => {
                let Some(flag) = self.capture(line, 1) else {
                    return Ok(None);
                };
                let flag = self.boolean(flag)?;
                match self {
                    Directive::Unique => DirectiveValue::Unique(flag),
                    Directive::Required => DirectiveValue::Required(flag),
                    _ => DirectiveValue::ReadOnly(flag),
                }
            }
            Directive::In => {
                let Some(location) = self.capture(line, 1) else {
                    return Ok(None);
                };
                let location = ParameterLocation::parse(location).ok_or_else(|| {
                    Error::malformed(self.name(), format!("unknown location {}", location))
                })?;
                DirectiveValue::In(location)
            }
            Directive::Schemes => match self.capture(line, 1) {
                Some(schemes) => DirectiveValue::Schemes(parse_schemes(schemes)),
                None => return Ok(None),
            },
            Directive::Version => match self.capture(line, 1) {
                Some(version) => DirectiveValue::Version(version.trim().to_string()),
                None => return Ok(None),
            },
            Directive::Host => match self.capture(line, 1) {
                Some(host) => DirectiveValue::Host(host.trim().to_string()),
                None => return Ok(None),
            },
            Directive::BasePath => match self.capture(line, 1) {
                Some(path) => DirectiveValue::BasePath(path.to_string()),
                None => return Ok(None),
            },
            Directive::License => match self.capture(line, 1) {
                Some(license) => DirectiveValue::License(parse_license(license)),
                None => return Ok(None),
            },
            Directive::Contact => match self.capture(line, 1) {
                Some(contact) => DirectiveValue::Contact(parse_contact(contact)),
                None => return Ok(None),
            },
            Directive::Security
            | Directive::Responses
            | Directive::Consumes
            | Directive::Produces
            | Directive::TermsOfService => return self.parse_block(&[line.to_string()]),
        };
        Ok(Some(value))
    }

    fn parse_block(&self, lines: &[String]) -> Result<Option<DirectiveValue>> {
        if lines.iter().all(|line| line.trim().is_empty()) {
            return Ok(None);
        }
        let value = match self {
            Directive::Consumes => DirectiveValue::Consumes(non_empty_lines(lines)),
            Directive::Produces => DirectiveValue::Produces(non_empty_lines(lines)),
            Directive::Security => DirectiveValue::Security(parse_security(lines)),
            Directive::Responses => DirectiveValue::Responses(parse_responses(lines)?),
            Directive::TermsOfService => {
                DirectiveValue::TermsOfService(join_drop_last(lines))
            }
            _ => {
                let mut values = Vec::new();
                for line in lines {
                    values.extend(self.parse_line(line)?);
                }
                return Ok(values.pop());
            }
        };
        Ok(Some(value))
    }

    fn float(&self, number: &str) -> Result<f64> {
        number
            .parse::<f64>()
            .map_err(|e| Error::malformed(self.name(), format!("{}: {}", number, e)))
    }

    fn integer(&self, number: &str) -> Result<i64> {
        number
            .parse::<i64>()
            .map_err(|e| Error::malformed(self.name(), format!("{}: {}", number, e)))
    }

    fn boolean(&self, flag: &str) -> Result<bool> {
        flag.to_ascii_lowercase()
            .parse::<bool>()
            .map_err(|e| Error::malformed(self.name(), format!("{}: {}", flag, e)))
    }
}

/// Key of one `responses:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKey {
    Default,
    Code(u16),
}

impl std::fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseKey::Default => write!(f, "default"),
            ResponseKey::Code(code) => write!(f, "{}", code),
        }
    }
}

/// One `key: name` line of a `responses:` block, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEntry {
    pub key: ResponseKey,
    pub name: String,
}

/// A typed directive value.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveValue {
    Maximum { value: f64, exclusive: bool },
    Minimum { value: f64, exclusive: bool },
    MultipleOf(f64),
    MaxLength(i64),
    MinLength(i64),
    Pattern(String),
    MaxItems(i64),
    MinItems(i64),
    Unique(bool),
    CollectionFormat(String),
    Required(bool),
    ReadOnly(bool),
    In(ParameterLocation),
    Schemes(Vec<String>),
    Security(Vec<SecurityRequirement>),
    Responses(Vec<ResponseEntry>),
    Consumes(Vec<String>),
    Produces(Vec<String>),
    Version(String),
    Host(String),
    BasePath(String),
    License(License),
    Contact(Contact),
    TermsOfService(String),
}

impl DirectiveValue {
    /// Applies a validation constraint to `builder`.
    ///
    /// Returns `false` when the value is not a validation, leaving the builder untouched.
    pub fn apply_validation<B: ValidationBuilder + ?Sized>(&self, builder: &mut B) -> bool {
        match self {
            DirectiveValue::Maximum { value, exclusive } => builder.set_maximum(*value, *exclusive),
            DirectiveValue::Minimum { value, exclusive } => builder.set_minimum(*value, *exclusive),
            DirectiveValue::MultipleOf(factor) => builder.set_multiple_of(*factor),
            DirectiveValue::MaxLength(n) => builder.set_max_length(*n),
            DirectiveValue::MinLength(n) => builder.set_min_length(*n),
            DirectiveValue::Pattern(pattern) => builder.set_pattern(pattern.clone()),
            DirectiveValue::MaxItems(n) => builder.set_max_items(*n),
            DirectiveValue::MinItems(n) => builder.set_min_items(*n),
            DirectiveValue::Unique(flag) => builder.set_unique(*flag),
            _ => return false,
        }
        true
    }

    /// Like [`DirectiveValue::apply_validation`], also accepting a collection format.
    pub fn apply_operation_validation<B: OperationValidationBuilder + ?Sized>(
        &self,
        builder: &mut B,
    ) -> bool {
        if let DirectiveValue::CollectionFormat(format) = self {
            builder.set_collection_format(format.clone());
            return true;
        }
        self.apply_validation(builder)
    }
}

/// Target of validation directives.
pub trait ValidationBuilder {
    /// The constraints being built.
    fn validations_mut(&mut self) -> &mut Validations;

    fn set_maximum(&mut self, value: f64, exclusive: bool) {
        let validations = self.validations_mut();
        validations.maximum = Some(value);
        validations.exclusive_maximum = exclusive;
    }

    fn set_minimum(&mut self, value: f64, exclusive: bool) {
        let validations = self.validations_mut();
        validations.minimum = Some(value);
        validations.exclusive_minimum = exclusive;
    }

    fn set_multiple_of(&mut self, factor: f64) {
        self.validations_mut().multiple_of = Some(factor);
    }

    fn set_max_length(&mut self, n: i64) {
        self.validations_mut().max_length = Some(n);
    }

    fn set_min_length(&mut self, n: i64) {
        self.validations_mut().min_length = Some(n);
    }

    fn set_pattern(&mut self, pattern: String) {
        self.validations_mut().pattern = Some(pattern);
    }

    fn set_max_items(&mut self, n: i64) {
        self.validations_mut().max_items = Some(n);
    }

    fn set_min_items(&mut self, n: i64) {
        self.validations_mut().min_items = Some(n);
    }

    fn set_unique(&mut self, unique: bool) {
        self.validations_mut().unique_items = unique;
    }
}

/// Target of validation directives that also carries a collection format.
pub trait OperationValidationBuilder: ValidationBuilder {
    fn set_collection_format(&mut self, format: String);
}

impl ValidationBuilder for Schema {
    fn validations_mut(&mut self) -> &mut Validations {
        &mut self.validations
    }
}

impl ValidationBuilder for Parameter {
    fn validations_mut(&mut self) -> &mut Validations {
        &mut self.validations
    }
}

impl OperationValidationBuilder for Parameter {
    fn set_collection_format(&mut self, format: String) {
        self.collection_format = Some(format);
    }
}

impl ValidationBuilder for Header {
    fn validations_mut(&mut self) -> &mut Validations {
        &mut self.validations
    }
}

impl OperationValidationBuilder for Header {
    fn set_collection_format(&mut self, format: String) {
        self.collection_format = Some(format);
    }
}

/// Resolves the entries of a `responses:` block against the named responses
/// and definitions known so far.
///
/// A name matching a named response becomes a `#/responses/` reference; a name
/// matching only a definition becomes an inline response whose schema
/// references it.
///
/// # Errors
///
/// - [`Error::DuplicateResponseCode`] when a status code or `default` repeats
/// - [`Error::UnresolvedResponse`] when a name matches neither
pub fn resolve_responses(
    entries: &[ResponseEntry],
    operation_id: &str,
    responses: &BTreeMap<String, Response>,
    definitions: &BTreeMap<String, Schema>,
) -> Result<OperationResponses> {
    let mut resolved = OperationResponses::default();
    for entry in entries {
        let response = if responses.contains_key(&entry.name) {
            Response::reference_to(&entry.name)
        } else if definitions.contains_key(&entry.name) {
            Response {
                schema: Some(Box::new(Schema::reference_to(&entry.name))),
                ..Default::default()
            }
        } else {
            return Err(Error::UnresolvedResponse {
                operation_id: operation_id.to_string(),
                name: entry.name.clone(),
            });
        };

        let duplicate = match entry.key {
            ResponseKey::Default => resolved.default.replace(response).is_some(),
            ResponseKey::Code(code) => resolved.status_codes.insert(code, response).is_some(),
        };
        if duplicate {
            return Err(Error::DuplicateResponseCode {
                operation_id: operation_id.to_string(),
                code: entry.key.to_string(),
            });
        }
    }
    Ok(resolved)
}

fn parse_responses(lines: &[String]) -> Result<Vec<ResponseEntry>> {
    let mut entries = Vec::new();
    for line in lines {
        let Some((key, name)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::malformed(
                Directive::Responses.name(),
                format!("no name for {:?} response", key),
            ));
        }
        let key = if key.eq_ignore_ascii_case("default") {
            ResponseKey::Default
        } else if key.chars().all(|c| c.is_ascii_digit()) {
            let code = key.parse::<u16>().map_err(|e| {
                Error::malformed(Directive::Responses.name(), format!("{}: {}", key, e))
            })?;
            ResponseKey::Code(code)
        } else {
            continue;
        };
        entries.push(ResponseEntry {
            key,
            name: name.to_string(),
        });
    }
    Ok(entries)
}

fn parse_security(lines: &[String]) -> Vec<SecurityRequirement> {
    let mut requirements = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, scopes)) = line.split_once(':') else {
            warn!("Skipping security line without a colon: {}", line);
            continue;
        };
        let scopes = RX_NOT_SCOPE
            .replace_all(scopes, "")
            .split(',')
            .map(str::trim)
            .filter(|scope| !scope.is_empty())
            .map(str::to_string)
            .collect();
        let mut requirement = SecurityRequirement::new();
        requirement.insert(name.trim().to_string(), scopes);
        requirements.push(requirement);
    }
    requirements
}

fn parse_schemes(text: &str) -> Vec<String> {
    RX_SCHEME_SEPARATOR
        .split(text)
        .map(str::trim)
        .filter(|scheme| !scheme.is_empty())
        .map(str::to_ascii_lowercase)
        .filter(|scheme| {
            let known = SUPPORTED_SCHEMES.contains(&scheme.as_str());
            if !known {
                warn!("Ignoring unsupported scheme {}", scheme);
            }
            known
        })
        .collect()
}

/// `name [url]`: a token containing `://` is the url, the rest is the name.
fn parse_license(text: &str) -> License {
    let (name, url) = split_url(text);
    License { name, url }
}

/// `name [<email>] [url]`
fn parse_contact(text: &str) -> Contact {
    let email = RX_EMAIL
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    let without_email = RX_EMAIL.replace_all(text, " ");
    let (name, url) = split_url(&without_email);
    Contact {
        name: Some(name).filter(|n| !n.is_empty()),
        email,
        url,
    }
}

fn split_url(text: &str) -> (String, Option<String>) {
    let mut url = None;
    let mut name = Vec::new();
    for token in text.split_whitespace() {
        if url.is_none() && token.contains("://") {
            url = Some(token.to_string());
        } else {
            name.push(token);
        }
    }
    (name.join(" "), url)
}

fn non_empty_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins lines with newlines, dropping a trailing blank line.
pub(crate) fn join_drop_last(lines: &[String]) -> String {
    let lines = match lines.split_last() {
        Some((last, rest)) if last.trim().is_empty() => rest,
        _ => lines,
    };
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    fn single(directive: Directive, line: &str) -> DirectiveValue {
        assert!(directive.matches(line), "{:?} should match {:?}", directive, line);
        let mut values = directive.parse(&lines(&[line])).unwrap();
        assert_eq!(values.len(), 1);
        values.remove(0)
    }

    #[test]
    fn test_maximum_exclusivity() {
        assert_eq!(
            single(Directive::Maximum, "Maximum: <10"),
            DirectiveValue::Maximum {
                value: 10.0,
                exclusive: true
            }
        );
        assert_eq!(
            single(Directive::Maximum, "Max: 10"),
            DirectiveValue::Maximum {
                value: 10.0,
                exclusive: false
            }
        );
        assert_eq!(
            single(Directive::Maximum, "maximum: =2.5"),
            DirectiveValue::Maximum {
                value: 2.5,
                exclusive: false
            }
        );
    }

    #[test]
    fn test_minimum_exclusivity() {
        assert_eq!(
            single(Directive::Minimum, "  minimum: >-3"),
            DirectiveValue::Minimum {
                value: -3.0,
                exclusive: true
            }
        );
        assert!(!Directive::Minimum.matches("minimum: <3"));
    }

    #[test]
    fn test_length_and_items_grammars() {
        assert_eq!(single(Directive::MaxLength, "max length: 20"), DirectiveValue::MaxLength(20));
        assert_eq!(single(Directive::MaxLength, "maxLen: 20"), DirectiveValue::MaxLength(20));
        assert_eq!(single(Directive::MinLength, "Min-Length: 1"), DirectiveValue::MinLength(1));
        assert_eq!(single(Directive::MaxItems, "max items: 5"), DirectiveValue::MaxItems(5));
        assert_eq!(single(Directive::MinItems, "min.items: 1"), DirectiveValue::MinItems(1));
        assert!(!Directive::Maximum.matches("max length: 20"));
        assert!(!Directive::MaxLength.matches("max length: -1"));
    }

    #[test]
    fn test_directives_anchor_at_line_start() {
        assert!(Directive::Required.matches("/// required: true"));
        assert!(!Directive::Required.matches("this field is required: true"));
        assert!(Directive::Required.matches("Required: TRUE   "));
    }

    #[test]
    fn test_pattern_keeps_rest_of_line() {
        assert_eq!(
            single(Directive::Pattern, "pattern: ^[a-z]+$"),
            DirectiveValue::Pattern("^[a-z]+$".to_string())
        );
    }

    #[test]
    fn test_repeated_single_line_values_in_order() {
        let values = Directive::Required
            .parse(&lines(&["required: true", "required: true", "required: false"]))
            .unwrap();
        assert_eq!(
            values,
            vec![
                DirectiveValue::Required(true),
                DirectiveValue::Required(true),
                DirectiveValue::Required(false)
            ]
        );
    }

    #[test]
    fn test_non_ascii_digits_are_malformed() {
        let result = Directive::Maximum.parse(&lines(&["maximum: ١٠"]));
        assert!(matches!(result, Err(Error::MalformedDirective { .. })));
    }

    #[test]
    fn test_integer_overflow_is_malformed() {
        let result = Directive::MaxLength.parse(&lines(&["max length: 99999999999999999999"]));
        assert!(matches!(result, Err(Error::MalformedDirective { .. })));
    }

    #[test]
    fn test_in_directive() {
        assert_eq!(
            single(Directive::In, "in: formData"),
            DirectiveValue::In(ParameterLocation::FormData)
        );
        assert_eq!(
            single(Directive::In, "source: body"),
            DirectiveValue::In(ParameterLocation::Body)
        );
        assert!(!Directive::In.matches("in: cookie"));
    }

    #[test]
    fn test_schemes_filtered() {
        assert_eq!(
            single(Directive::Schemes, "Schemes: http, HTTPS ftp,,ws"),
            DirectiveValue::Schemes(lines(&["http", "https", "ws"]))
        );
    }

    #[test]
    fn test_security_lines() {
        let values = Directive::Security
            .parse(&lines(&["api_key:", "oauth: read, write", "no colon here"]))
            .unwrap();
        let DirectiveValue::Security(requirements) = &values[0] else {
            panic!("expected security value");
        };
        assert_eq!(requirements.len(), 2);
        assert_eq!(requirements[0]["api_key"], Vec::<String>::new());
        assert_eq!(requirements[1]["oauth"], lines(&["read", "write"]));
    }

    #[test]
    fn test_responses_block() {
        let values = Directive::Responses
            .parse(&lines(&["200: widgetResponse", "default: errorResponse", "x-foo: ignored"]))
            .unwrap();
        assert_eq!(
            values,
            vec![DirectiveValue::Responses(vec![
                ResponseEntry {
                    key: ResponseKey::Code(200),
                    name: "widgetResponse".to_string()
                },
                ResponseEntry {
                    key: ResponseKey::Default,
                    name: "errorResponse".to_string()
                },
            ])]
        );
    }

    #[test]
    fn test_responses_empty_name_is_error() {
        let result = Directive::Responses.parse(&lines(&["200:"]));
        assert!(matches!(result, Err(Error::MalformedDirective { .. })));
    }

    #[test]
    fn test_resolve_responses() {
        let mut responses = BTreeMap::new();
        responses.insert("widgetResponse".to_string(), Response::default());
        responses.insert("errorResponse".to_string(), Response::default());
        let mut definitions = BTreeMap::new();
        definitions.insert("Widget".to_string(), Schema::default());

        let entries = vec![
            ResponseEntry {
                key: ResponseKey::Code(200),
                name: "widgetResponse".to_string(),
            },
            ResponseEntry {
                key: ResponseKey::Code(201),
                name: "Widget".to_string(),
            },
            ResponseEntry {
                key: ResponseKey::Default,
                name: "errorResponse".to_string(),
            },
        ];
        let resolved = resolve_responses(&entries, "getWidget", &responses, &definitions).unwrap();
        assert_eq!(
            resolved.status_codes[&200].reference.as_deref(),
            Some("#/responses/widgetResponse")
        );
        assert_eq!(
            resolved.status_codes[&201]
                .schema
                .as_ref()
                .and_then(|s| s.reference.as_deref()),
            Some("#/definitions/Widget")
        );
        assert_eq!(
            resolved.default.and_then(|r| r.reference),
            Some("#/responses/errorResponse".to_string())
        );
    }

    #[test]
    fn test_resolve_responses_errors() {
        let responses = BTreeMap::from([("ok".to_string(), Response::default())]);
        let definitions = BTreeMap::new();
        let missing = vec![ResponseEntry {
            key: ResponseKey::Code(200),
            name: "nope".to_string(),
        }];
        assert!(matches!(
            resolve_responses(&missing, "op", &responses, &definitions),
            Err(Error::UnresolvedResponse { .. })
        ));

        let twice = vec![
            ResponseEntry {
                key: ResponseKey::Code(200),
                name: "ok".to_string(),
            },
            ResponseEntry {
                key: ResponseKey::Code(200),
                name: "ok".to_string(),
            },
        ];
        assert!(matches!(
            resolve_responses(&twice, "op", &responses, &definitions),
            Err(Error::DuplicateResponseCode { .. })
        ));
    }

    #[test]
    fn test_license_and_contact() {
        assert_eq!(
            single(Directive::License, "License: MIT http://opensource.org/licenses/MIT"),
            DirectiveValue::License(License {
                name: "MIT".to_string(),
                url: Some("http://opensource.org/licenses/MIT".to_string()),
            })
        );
        assert_eq!(
            single(
                Directive::Contact,
                "Contact: John Doe <john.doe@example.com> http://john.doe.com"
            ),
            DirectiveValue::Contact(Contact {
                name: Some("John Doe".to_string()),
                email: Some("john.doe@example.com".to_string()),
                url: Some("http://john.doe.com".to_string()),
            })
        );
    }

    #[test]
    fn test_terms_of_service_grammar() {
        assert!(Directive::TermsOfService.matches("Terms Of Service:"));
        assert!(Directive::TermsOfService.matches("tos:"));
        let values = Directive::TermsOfService
            .parse(&lines(&["there are no terms", "use at will", ""]))
            .unwrap();
        assert_eq!(
            values,
            vec![DirectiveValue::TermsOfService(
                "there are no terms\nuse at will".to_string()
            )]
        );
    }

    #[test]
    fn test_base_path_and_host() {
        assert_eq!(
            single(Directive::BasePath, "Base path: /v1"),
            DirectiveValue::BasePath("/v1".to_string())
        );
        assert_eq!(
            single(Directive::Host, "Host: api.example.com"),
            DirectiveValue::Host("api.example.com".to_string())
        );
    }

    #[test]
    fn test_annotations() {
        assert_eq!(Annotation::parse(" swagger:meta"), Some(Annotation::Meta));
        assert_eq!(
            Annotation::parse("+swagger:model Pet"),
            Some(Annotation::Model(Some("Pet".to_string())))
        );
        assert_eq!(Annotation::parse("swagger:model"), Some(Annotation::Model(None)));
        assert_eq!(
            Annotation::parse("swagger:strfmt date-time"),
            Some(Annotation::StrFmt("date-time".to_string()))
        );
        assert_eq!(
            Annotation::parse("swagger:parameters listPets  createPet"),
            Some(Annotation::Parameters(lines(&["listPets", "createPet"])))
        );
        assert_eq!(Annotation::parse("Swagger:meta"), None);
        assert!(!Annotation::is_marker("see the swagger:model docs"));
    }

    #[test]
    fn test_route_annotation() {
        let Some(Annotation::Route(route)) =
            Annotation::parse("swagger:route GET /widgets/{id} widgets admin getWidget")
        else {
            panic!("expected a route");
        };
        assert_eq!(route.method, "GET");
        assert_eq!(route.path, "/widgets/{id}");
        assert_eq!(route.tags, lines(&["widgets", "admin"]));
        assert_eq!(route.operation_id, "getWidget");
    }

    #[test]
    fn test_apply_validation() {
        let mut parameter = Parameter::default();
        assert!(DirectiveValue::Maximum {
            value: 5.0,
            exclusive: true
        }
        .apply_operation_validation(&mut parameter));
        assert!(DirectiveValue::CollectionFormat("csv".to_string())
            .apply_operation_validation(&mut parameter));
        assert!(!DirectiveValue::Required(true).apply_operation_validation(&mut parameter));
        assert_eq!(parameter.validations.maximum, Some(5.0));
        assert!(parameter.validations.exclusive_maximum);
        assert_eq!(parameter.collection_format.as_deref(), Some("csv"));

        let mut schema = Schema::default();
        assert!(!DirectiveValue::CollectionFormat("csv".to_string()).apply_validation(&mut schema));
        assert!(DirectiveValue::Unique(true).apply_validation(&mut schema));
        assert!(schema.validations.unique_items);
    }
}
