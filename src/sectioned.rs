//! Splits one documentation block into a title, a description and directive sections.

use crate::directives::{Annotation, AnnotationKind, Directive, DirectiveValue};
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;

static RX_COMMENT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\p{L}\p{N}+]*").expect("comment noise regex should be valid"));
static RX_PUNCTUATION_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Po}$").expect("punctuation regex should be valid"));

/// Lines captured for one directive.
#[derive(Debug, Clone, PartialEq)]
pub struct TagSection {
    pub directive: Directive,
    /// Cleaned captured lines; for a multi-line directive the keyword line is not included
    pub lines: Vec<String>,
}

impl TagSection {
    pub fn values(&self) -> Result<Vec<DirectiveValue>> {
        self.directive.parse(&self.lines)
    }
}

/// Result of parsing a documentation block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub title: Vec<String>,
    pub description: Vec<String>,
    /// Annotation of the kind the parser was restricted to, when present
    pub annotation: Option<Annotation>,
    /// Matched directives, in order of first match
    pub tags: Vec<TagSection>,
}

impl Sections {
    /// Title lines joined with newlines, `None` when empty.
    pub fn title_text(&self) -> Option<String> {
        join_lines(&self.title)
    }

    /// Description lines joined with newlines, `None` when empty.
    pub fn description_text(&self) -> Option<String> {
        join_lines(&self.description)
    }

    /// Typed values of every matched directive, section by section.
    pub fn values(&self) -> Result<Vec<DirectiveValue>> {
        let mut values = Vec::new();
        for tag in &self.tags {
            values.extend(tag.values()?);
        }
        Ok(values)
    }
}

fn join_lines(lines: &[String]) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Collecting title and description lines
    Header,
    /// Accumulating lines for the multi-line section at this index
    Tag(usize),
    /// No active section; header collection has ended for good
    Closed,
}

/// A line-oriented parser for documentation blocks.
///
/// The parser is configured with the annotation kind it accepts and an
/// ordered table of directives. Lines before the first directive form the
/// header, which is later split into title and description.
#[derive(Debug, Clone)]
pub struct SectionedParser {
    annotation: Option<AnnotationKind>,
    directives: &'static [Directive],
    split_title: bool,
}

impl SectionedParser {
    /// A parser recognizing `directives`, in table order.
    pub fn new(directives: &'static [Directive]) -> Self {
        Self {
            annotation: None,
            directives,
            split_title: false,
        }
    }

    /// Accept annotations of `kind` instead of stopping at them.
    pub fn with_annotation(mut self, kind: AnnotationKind) -> Self {
        self.annotation = Some(kind);
        self
    }

    /// Split the header into title and description; otherwise the whole header is description.
    pub fn with_title(mut self) -> Self {
        self.split_title = true;
        self
    }

    /// Parses a documentation block.
    ///
    /// Parsing stops at the first annotation that is not of the accepted kind.
    pub fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Sections {
        let mut sections = Sections::default();
        let mut header = Vec::new();
        let mut state = State::Header;

        for raw in lines {
            let line = raw.as_ref().trim_end();

            if Annotation::is_marker(line) {
                let accepted = self.annotation.and_then(|kind| {
                    Annotation::parse(line).filter(|annotation| annotation.kind() == kind)
                });
                match accepted {
                    Some(annotation) => {
                        sections.annotation = Some(annotation);
                        if state == State::Header && !header.is_empty() {
                            state = State::Closed;
                        }
                        continue;
                    }
                    None => break,
                }
            }

            if let Some(directive) = self.directives.iter().find(|d| d.matches(line)) {
                let index = match sections
                    .tags
                    .iter()
                    .position(|tag| tag.directive == *directive)
                {
                    Some(index) => index,
                    None => {
                        sections.tags.push(TagSection {
                            directive: *directive,
                            lines: Vec::new(),
                        });
                        sections.tags.len() - 1
                    }
                };
                if directive.is_multi_line() {
                    state = State::Tag(index);
                } else {
                    sections.tags[index].lines.push(line.to_string());
                    state = State::Closed;
                }
                continue;
            }

            match state {
                State::Header => header.push(line.to_string()),
                State::Tag(index) => sections.tags[index].lines.push(line.to_string()),
                State::Closed => {}
            }
        }

        for tag in &mut sections.tags {
            tag.lines = cleanup(&tag.lines);
        }
        let header = cleanup(&header);
        if self.split_title {
            let (title, description) = split_title(header);
            sections.title = title;
            sections.description = description;
        } else {
            sections.description = header;
        }
        sections
    }
}

/// Strips leading comment noise from every line and drops leading and trailing blank lines.
pub fn cleanup<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let stripped: Vec<String> = lines
        .iter()
        .map(|line| RX_COMMENT_NOISE.replace(line.as_ref(), "").into_owned())
        .collect();
    let first = stripped.iter().position(|line| !line.is_empty());
    let last = stripped.iter().rposition(|line| !line.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => stripped[first..=last].to_vec(),
        _ => Vec::new(),
    }
}

/// Splits a cleaned header into title and description lines.
///
/// A blank line separates title from description. Without one, a first line
/// ending in sentence punctuation is the title on its own; otherwise there is
/// no title and every line is description.
pub fn split_title(header: Vec<String>) -> (Vec<String>, Vec<String>) {
    if let Some(blank) = header.iter().position(|line| line.trim().is_empty()) {
        let mut title = header;
        let description = title.split_off(blank).into_iter().skip(1).collect();
        return (title, description);
    }
    match header.first() {
        Some(first) if RX_PUNCTUATION_END.is_match(first) => {
            let mut description = header;
            let title = description.drain(..1).collect();
            (title, description)
        }
        _ => (Vec::new(), header),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{
        Annotation, ROUTE_DIRECTIVES, SCHEMA_FIELD_DIRECTIVES,
    };

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_title_split_on_blank_line() {
        let (title, description) =
            split_title(lines(&["Widget is a thing.", "", "It has parts."]));
        assert_eq!(title, lines(&["Widget is a thing."]));
        assert_eq!(description, lines(&["It has parts."]));
    }

    #[test]
    fn test_no_title_without_punctuation() {
        let (title, description) = split_title(lines(&["free text", "more text"]));
        assert!(title.is_empty());
        assert_eq!(description, lines(&["free text", "more text"]));
    }

    #[test]
    fn test_title_from_punctuated_first_line() {
        let (title, description) = split_title(lines(&["Lists pets.", "Paged by cursor"]));
        assert_eq!(title, lines(&["Lists pets."]));
        assert_eq!(description, lines(&["Paged by cursor"]));
    }

    #[test]
    fn test_cleanup_strips_noise_and_blank_edges() {
        let cleaned = cleanup(&["", "  - item one", "// +marker", "", "* tail", "  "]);
        assert_eq!(cleaned, lines(&["item one", "+marker", "", "tail"]));
        assert!(cleanup(&["", "   "]).is_empty());
    }

    #[test]
    fn test_multi_line_tag_skips_keyword_line() {
        let parser = SectionedParser::new(ROUTE_DIRECTIVES);
        let sections = parser.parse(&[
            "Lists pets.",
            "",
            "Responses: 200: ignored",
            "  200: petsResponse",
            "  default: errorResponse",
        ]);
        assert_eq!(sections.tags.len(), 1);
        assert_eq!(sections.tags[0].directive, Directive::Responses);
        assert_eq!(
            sections.tags[0].lines,
            lines(&["200: petsResponse", "default: errorResponse"])
        );
    }

    #[test]
    fn test_header_closed_after_any_tag() {
        let parser = SectionedParser::new(SCHEMA_FIELD_DIRECTIVES).with_title();
        let sections = parser.parse(&[
            "The name of the pet.",
            "required: true",
            "this line belongs nowhere",
            "max length: 50",
        ]);
        assert_eq!(sections.title, lines(&["The name of the pet."]));
        assert!(sections.description.is_empty());
        assert_eq!(
            sections.values().unwrap(),
            vec![DirectiveValue::Required(true), DirectiveValue::MaxLength(50)]
        );
    }

    #[test]
    fn test_repeated_tags_merge_in_first_match_order() {
        let parser = SectionedParser::new(SCHEMA_FIELD_DIRECTIVES);
        let sections = parser.parse(&[
            "required: true",
            "maximum: 10",
            "required: false",
        ]);
        assert_eq!(sections.tags.len(), 2);
        assert_eq!(sections.tags[0].directive, Directive::Required);
        assert_eq!(sections.tags[0].lines.len(), 2);
        assert_eq!(sections.tags[1].directive, Directive::Maximum);
    }

    #[test]
    fn test_foreign_annotation_stops_parsing() {
        let parser = SectionedParser::new(SCHEMA_FIELD_DIRECTIVES);
        let sections = parser.parse(&["A pet.", "swagger:route GET /pets pets listPets", "required: true"]);
        assert_eq!(sections.description, lines(&["A pet."]));
        assert!(sections.tags.is_empty());
        assert!(sections.annotation.is_none());
    }

    #[test]
    fn test_accepted_annotation_is_recorded() {
        let parser = SectionedParser::new(&[])
            .with_annotation(AnnotationKind::Model)
            .with_title();
        let sections = parser.parse(&["swagger:model pet", "A pet.", "", "Has a name."]);
        assert_eq!(sections.annotation, Some(Annotation::Model(Some("pet".to_string()))));
        assert_eq!(sections.title_text().as_deref(), Some("A pet."));
        assert_eq!(sections.description_text().as_deref(), Some("Has a name."));
    }

    #[test]
    fn test_annotation_after_header_closes_it() {
        let parser = SectionedParser::new(&[]).with_annotation(AnnotationKind::Model);
        let sections = parser.parse(&["A pet.", "swagger:model", "ignored after annotation"]);
        assert_eq!(sections.description, lines(&["A pet."]));
        assert_eq!(sections.annotation, Some(Annotation::Model(None)));
    }
}
