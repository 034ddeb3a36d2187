//! Pull-based markup reader for scene files.
//!
//! The reader turns scene source text into a stream of [`Event`]s: start
//! tags with their attributes, end tags, non-blank text and end of file.
//! Comments, processing instructions and document type declarations are
//! skipped, CDATA sections are delivered as text and entity references are
//! decoded.
//!
//! Malformed markup never stops the reader. Each problem is reported into
//! the [`DiagnosticCollector`] and the reader resynchronizes at the next `<`.

use std::borrow::Cow;

use log::trace;
use winnow::{
    Parser as _,
    ascii::{multispace0, multispace1},
    combinator::{alt, cut_err, delimited, preceded, repeat, terminated},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location as _, Stream},
    token::{take_till, take_until, take_while},
};

use scenery_core::location::Location;

use crate::error::{Diagnostic, DiagnosticCollector, ErrorCode};

/// Diagnostic information for markup errors.
///
/// Attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MarkupDiagnostic {
    code: ErrorCode,
    message: &'static str,
    /// Byte offset where the failing construct started.
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<MarkupDiagnostic>>;

/// An attribute of a start tag.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupAttribute {
    pub name: String,
    pub value: String,
    pub location: Location,
}

/// A start tag.
#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<MarkupAttribute>,
    pub location: Location,
}

/// A markup event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An element was opened. Self-closing tags produce a `Start`
    /// immediately followed by an `End`.
    Start(StartTag),

    /// The most recently opened element was closed.
    End { name: String, location: Location },

    /// Non-blank character data, trimmed of surrounding whitespace.
    Text { content: String, location: Location },

    /// End of the document. Once reached, every further call returns `Eof`.
    Eof,
}

#[derive(Debug)]
struct RawAttribute<'a> {
    name: &'a str,
    value: &'a str,
    start: usize,
}

#[derive(Debug)]
struct RawTag<'a> {
    name: &'a str,
    attributes: Vec<RawAttribute<'a>>,
    self_closing: bool,
    start: usize,
}

#[derive(Debug)]
enum Item<'a> {
    Skip,
    Text { raw: &'a str, start: usize },
    Cdata { raw: &'a str, start: usize },
    Start(RawTag<'a>),
    End { name: &'a str, start: usize },
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn name<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    take_while(1.., is_name_char).parse_next(input)
}

/// Parse a comment: `<!-- ... -->`.
fn comment(input: &mut Input<'_>) -> IResult<()> {
    let start = input.current_token_start();
    preceded(
        "<!--",
        cut_err(terminated(take_until(0.., "-->"), "-->")).context(MarkupDiagnostic {
            code: ErrorCode::E002,
            message: "Unterminated comment",
            start,
        }),
    )
    .void()
    .parse_next(input)
}

/// Parse a CDATA section: `<![CDATA[ ... ]]>`.
fn cdata<'a>(input: &mut Input<'a>) -> IResult<Item<'a>> {
    let start = input.current_token_start();
    let raw = preceded(
        "<![CDATA[",
        cut_err(terminated(take_until(0.., "]]>"), "]]>")).context(MarkupDiagnostic {
            code: ErrorCode::E002,
            message: "Unterminated CDATA section",
            start,
        }),
    )
    .parse_next(input)?;
    Ok(Item::Cdata {
        raw,
        start: start + "<![CDATA[".len(),
    })
}

/// Parse a document type declaration such as `<!DOCTYPE scene>`.
fn declaration(input: &mut Input<'_>) -> IResult<()> {
    let start = input.current_token_start();
    preceded(
        "<!",
        cut_err(terminated(take_till(0.., '>'), '>')).context(MarkupDiagnostic {
            code: ErrorCode::E002,
            message: "Unterminated declaration",
            start,
        }),
    )
    .void()
    .parse_next(input)
}

/// Parse a processing instruction: `<? ... ?>`.
fn instruction(input: &mut Input<'_>) -> IResult<()> {
    let start = input.current_token_start();
    preceded(
        "<?",
        cut_err(terminated(take_until(0.., "?>"), "?>")).context(MarkupDiagnostic {
            code: ErrorCode::E002,
            message: "Unterminated processing instruction",
            start,
        }),
    )
    .void()
    .parse_next(input)
}

fn end_tag<'a>(input: &mut Input<'a>) -> IResult<Item<'a>> {
    let start = input.current_token_start();
    let name = preceded(
        "</",
        cut_err(terminated(name, (multispace0, '>'))).context(MarkupDiagnostic {
            code: ErrorCode::E001,
            message: "Malformed end tag",
            start,
        }),
    )
    .parse_next(input)?;
    Ok(Item::End { name, start })
}

fn attribute_value<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    alt((
        delimited('"', take_till(0.., ['"', '<']), '"'),
        delimited('\'', take_till(0.., ['\'', '<']), '\''),
    ))
    .parse_next(input)
}

fn attribute<'a>(input: &mut Input<'a>) -> IResult<RawAttribute<'a>> {
    let start = input.current_token_start();
    let name = name.parse_next(input)?;
    let value = cut_err(preceded((multispace0, '=', multispace0), attribute_value))
        .context(MarkupDiagnostic {
            code: ErrorCode::E001,
            message: "Expected quoted attribute value",
            start,
        })
        .parse_next(input)?;
    Ok(RawAttribute { name, value, start })
}

fn start_tag<'a>(input: &mut Input<'a>) -> IResult<Item<'a>> {
    let start = input.current_token_start();
    '<'.parse_next(input)?;
    let name = name.parse_next(input)?;
    let attributes: Vec<_> = repeat(0.., preceded(multispace1, attribute)).parse_next(input)?;
    multispace0.parse_next(input)?;
    let self_closing = cut_err(alt(("/>".value(true), '>'.value(false))))
        .context(MarkupDiagnostic {
            code: ErrorCode::E001,
            message: "Malformed start tag",
            start,
        })
        .parse_next(input)?;
    Ok(Item::Start(RawTag {
        name,
        attributes,
        self_closing,
        start,
    }))
}

fn text<'a>(input: &mut Input<'a>) -> IResult<Item<'a>> {
    let start = input.current_token_start();
    take_till(1.., '<')
        .map(move |raw| Item::Text { raw, start })
        .parse_next(input)
}

fn item<'a>(input: &mut Input<'a>) -> IResult<Item<'a>> {
    alt((
        comment.map(|()| Item::Skip),
        cdata,
        declaration.map(|()| Item::Skip),
        instruction.map(|()| Item::Skip),
        end_tag,
        start_tag,
        text,
    ))
    .parse_next(input)
}

fn skip_to_tag(input: &mut Input<'_>) -> IResult<()> {
    take_till(0.., '<').void().parse_next(input)
}

/// Decode entity and character references.
///
/// Returns the offending reference when it is not recognized.
fn decode_entities(raw: &str) -> Result<Cow<'_, str>, String> {
    if !raw.contains('&') {
        return Ok(Cow::Borrowed(raw));
    }

    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        decoded.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let Some(end) = after.find(';') else {
            return Err("&".to_string());
        };
        let entity = &after[..end];
        let ch = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix('#')
                .and_then(|number| match number.strip_prefix(|c| c == 'x' || c == 'X') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse().ok(),
                })
                .and_then(char::from_u32),
        };
        let Some(ch) = ch else {
            return Err(format!("&{entity};"));
        };
        decoded.push(ch);
        rest = &after[end + 1..];
    }
    decoded.push_str(rest);
    Ok(Cow::Owned(decoded))
}

/// Maps byte offsets to 1-based line/column locations.
#[derive(Debug)]
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(pos, _)| pos + 1))
            .collect();
        Self { line_starts }
    }

    fn location(&self, source: &str, offset: usize) -> Location {
        let offset = offset.min(source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = source
            .get(line_start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        Location::new(
            u32::try_from(line + 1).unwrap_or(u32::MAX),
            u32::try_from(column + 1).unwrap_or(u32::MAX),
        )
    }
}

/// A pull-based reader over one scene file.
#[derive(Debug)]
pub struct MarkupReader<'a> {
    source: &'a str,
    input: Input<'a>,
    lines: LineIndex,
    open: Vec<&'a str>,
    pending_end: Option<(String, Location)>,
}

impl<'a> MarkupReader<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            input: LocatingSlice::new(source),
            lines: LineIndex::new(source),
            open: Vec::new(),
            pending_end: None,
        }
    }

    /// Read the next event, reporting malformed markup into `diagnostics`.
    pub fn next_event(&mut self, diagnostics: &mut DiagnosticCollector) -> Event {
        if let Some((name, location)) = self.pending_end.take() {
            return Event::End { name, location };
        }

        loop {
            if self.input.is_empty() {
                return self.finish_document(diagnostics);
            }

            match item(&mut self.input) {
                Ok(Item::Skip) => {}
                Ok(Item::Text { raw, start }) => {
                    if let Some(event) = self.text_event(raw, start, true, diagnostics) {
                        return event;
                    }
                }
                Ok(Item::Cdata { raw, start }) => {
                    if let Some(event) = self.text_event(raw, start, false, diagnostics) {
                        return event;
                    }
                }
                Ok(Item::Start(tag)) => return self.start_event(tag, diagnostics),
                Ok(Item::End { name, start }) => {
                    if let Some(event) = self.end_event(name, start, diagnostics) {
                        return event;
                    }
                }
                Err(err) => self.recover(err, diagnostics),
            }
        }
    }

    /// Skip the remainder of an element whose `Start` event was just read.
    pub fn skip_element(&mut self, diagnostics: &mut DiagnosticCollector) {
        let mut depth = 1usize;
        loop {
            match self.next_event(diagnostics) {
                Event::Start(_) => depth += 1,
                Event::End { .. } => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                Event::Text { .. } => {}
                Event::Eof => return,
            }
        }
    }

    fn location(&self, offset: usize) -> Location {
        self.lines.location(self.source, offset)
    }

    fn text_event(
        &self,
        raw: &str,
        start: usize,
        decode: bool,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<Event> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let location = self.location(start + (raw.len() - raw.trim_start().len()));
        let content = if decode {
            self.decode(trimmed, location, diagnostics)
        } else {
            trimmed.to_string()
        };
        Some(Event::Text { content, location })
    }

    fn start_event(&mut self, tag: RawTag<'a>, diagnostics: &mut DiagnosticCollector) -> Event {
        let location = self.location(tag.start);
        let mut attributes: Vec<MarkupAttribute> = Vec::with_capacity(tag.attributes.len());
        for raw in tag.attributes {
            let attr_location = self.location(raw.start);
            if attributes.iter().any(|a| a.name == raw.name) {
                diagnostics.error(
                    ErrorCode::E004,
                    attr_location,
                    format!("Duplicate attribute \"{}\"", raw.name),
                );
                continue;
            }
            attributes.push(MarkupAttribute {
                name: raw.name.to_string(),
                value: self.decode(raw.value, attr_location, diagnostics),
                location: attr_location,
            });
        }

        trace!(name = tag.name, self_closing = tag.self_closing; "Start tag");
        if tag.self_closing {
            self.pending_end = Some((tag.name.to_string(), location));
        } else {
            self.open.push(tag.name);
        }
        Event::Start(StartTag {
            name: tag.name.to_string(),
            attributes,
            location,
        })
    }

    fn end_event(
        &mut self,
        name: &str,
        start: usize,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<Event> {
        let location = self.location(start);
        let Some(open) = self.open.pop() else {
            diagnostics.error(
                ErrorCode::E005,
                location,
                format!("Unexpected end tag \"</{name}>\""),
            );
            return None;
        };
        if open != name {
            diagnostics.emit(
                Diagnostic::error(format!(
                    "Mismatched end tag \"</{name}>\", expected \"</{open}>\""
                ))
                .with_code(ErrorCode::E005)
                .with_location(location),
            );
        }
        Some(Event::End {
            name: open.to_string(),
            location,
        })
    }

    fn finish_document(&mut self, diagnostics: &mut DiagnosticCollector) -> Event {
        if !self.open.is_empty() {
            let location = self.location(self.source.len());
            for name in self.open.drain(..).rev() {
                diagnostics.error(
                    ErrorCode::E006,
                    location,
                    format!("Element \"{name}\" is never closed"),
                );
            }
        }
        Event::Eof
    }

    fn decode(
        &self,
        raw: &str,
        location: Location,
        diagnostics: &mut DiagnosticCollector,
    ) -> String {
        match decode_entities(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(entity) => {
                diagnostics.error(
                    ErrorCode::E003,
                    location,
                    format!("Unknown entity reference \"{entity}\""),
                );
                raw.to_string()
            }
        }
    }

    fn recover(
        &mut self,
        err: ErrMode<ContextError<MarkupDiagnostic>>,
        diagnostics: &mut DiagnosticCollector,
    ) {
        let error_pos = self.input.current_token_start();
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        let diagnostic = match context_error.context().next() {
            Some(MarkupDiagnostic {
                code,
                message,
                start,
            }) => Diagnostic::error(*message)
                .with_code(*code)
                .with_location(self.location(*start)),
            None => Diagnostic::error("Unexpected character")
                .with_code(ErrorCode::E007)
                .with_location(self.location(error_pos)),
        };
        diagnostics.emit(diagnostic);

        if !self.input.is_empty() {
            self.input.next_token();
        }
        let _ = skip_to_tag(&mut self.input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(source: &str) -> (Vec<Event>, DiagnosticCollector) {
        let mut diagnostics = DiagnosticCollector::new("test.scn");
        let mut reader = MarkupReader::new(source);
        let mut events = Vec::new();
        loop {
            let event = reader.next_event(&mut diagnostics);
            if event == Event::Eof {
                break;
            }
            events.push(event);
        }
        (events, diagnostics)
    }

    fn start_name(event: &Event) -> Option<&str> {
        match event {
            Event::Start(tag) => Some(tag.name.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_simple_document() {
        let (events, diagnostics) = read_all(
            r#"<?xml version="1.0"?>
<Simulation>
  <!-- a comment -->
  <Scene name="main" step='0.01'/>
</Simulation>"#,
        );

        assert!(diagnostics.is_empty());
        assert_eq!(events.len(), 4);
        assert_eq!(start_name(&events[0]), Some("Simulation"));

        let Event::Start(scene) = &events[1] else {
            panic!("expected start tag, got {:?}", events[1]);
        };
        assert_eq!(scene.name, "Scene");
        assert_eq!(scene.location, Location::new(4, 3));
        assert_eq!(scene.attributes.len(), 2);
        assert_eq!(scene.attributes[0].name, "name");
        assert_eq!(scene.attributes[0].value, "main");
        assert_eq!(scene.attributes[1].value, "0.01");
        assert_eq!(scene.attributes[1].location, Location::new(4, 22));

        assert!(matches!(&events[2], Event::End { name, .. } if name == "Scene"));
        assert!(matches!(&events[3], Event::End { name, .. } if name == "Simulation"));
    }

    #[test]
    fn test_text_is_trimmed_and_blank_text_skipped() {
        let (events, diagnostics) = read_all("<Set>\n   \n  hello world \n</Set>");

        assert!(diagnostics.is_empty());
        assert_eq!(events.len(), 3);
        match &events[1] {
            Event::Text { content, location } => {
                assert_eq!(content, "hello world");
                assert_eq!(*location, Location::new(3, 3));
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_entities_and_cdata() {
        let (events, diagnostics) =
            read_all(r#"<Text label="a &lt; b &#65;&#x42;">x &amp; y<![CDATA[<raw> &amp;]]></Text>"#);

        assert!(diagnostics.is_empty());
        let Event::Start(tag) = &events[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.attributes[0].value, "a < b AB");
        assert!(matches!(&events[1], Event::Text { content, .. } if content == "x & y"));
        assert!(matches!(&events[2], Event::Text { content, .. } if content == "<raw> &amp;"));
    }

    #[test]
    fn test_unknown_entity_is_reported() {
        let (events, diagnostics) = read_all("<A>&bogus;</A>");

        assert_eq!(events.len(), 3);
        let diagnostics = diagnostics.into_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E003));
        assert_eq!(diagnostics[0].message(), "Unknown entity reference \"&bogus;\"");
    }

    #[test]
    fn test_duplicate_attribute_keeps_first() {
        let (events, diagnostics) = read_all(r#"<A x="1" x="2"/>"#);

        let Event::Start(tag) = &events[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.attributes.len(), 1);
        assert_eq!(tag.attributes[0].value, "1");
        assert_eq!(
            diagnostics.into_diagnostics()[0].code(),
            Some(ErrorCode::E004)
        );
    }

    #[test]
    fn test_unclosed_element_reported_at_eof() {
        let (events, diagnostics) = read_all("<A><B>");

        assert_eq!(events.len(), 2);
        let diagnostics = diagnostics.into_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.code() == Some(ErrorCode::E006)));
        assert_eq!(diagnostics[0].message(), "Element \"B\" is never closed");
    }

    #[test]
    fn test_mismatched_end_tag_closes_innermost() {
        let (events, diagnostics) = read_all("<A><B></A>");

        assert!(matches!(&events[2], Event::End { name, .. } if name == "B"));
        let diagnostics = diagnostics.into_diagnostics();
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E005));
    }

    #[test]
    fn test_recovers_after_malformed_tag() {
        let (events, diagnostics) = read_all("<A>< oops<B/></A>");

        assert!(diagnostics.has_errors());
        let names: Vec<_> = events.iter().filter_map(start_name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_unterminated_comment() {
        let (_, diagnostics) = read_all("<A><!-- never ends</A>");

        let diagnostics = diagnostics.into_diagnostics();
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E002));
        assert_eq!(diagnostics[0].location(), Location::new(1, 4));
    }

    #[test]
    fn test_attribute_without_quotes() {
        let (_, diagnostics) = read_all("<A x=1/>");

        let diagnostics = diagnostics.into_diagnostics();
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E001));
        assert_eq!(diagnostics[0].message(), "Expected quoted attribute value");
    }

    #[test]
    fn test_skip_element() {
        let mut diagnostics = DiagnosticCollector::new("test.scn");
        let mut reader = MarkupReader::new("<A><B><C/>text</B><D/></A><E/>");

        assert_eq!(start_name(&reader.next_event(&mut diagnostics)), Some("A"));
        assert_eq!(start_name(&reader.next_event(&mut diagnostics)), Some("B"));
        reader.skip_element(&mut diagnostics);
        assert_eq!(start_name(&reader.next_event(&mut diagnostics)), Some("D"));
        reader.next_event(&mut diagnostics);
        reader.next_event(&mut diagnostics);
        assert_eq!(start_name(&reader.next_event(&mut diagnostics)), Some("E"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut diagnostics = DiagnosticCollector::new("test.scn");
        let mut reader = MarkupReader::new("");

        assert_eq!(reader.next_event(&mut diagnostics), Event::Eof);
        assert_eq!(reader.next_event(&mut diagnostics), Event::Eof);
    }

    #[test]
    fn test_multibyte_columns() {
        let (events, _) = read_all("<A>\n\u{e4}\u{f6} <B/></A>");

        let Event::Start(tag) = &events[2] else {
            panic!("expected start tag, got {:?}", events[2]);
        };
        assert_eq!(tag.location, Location::new(2, 4));
    }
}
