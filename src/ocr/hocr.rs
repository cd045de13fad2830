use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{BoundingBox, LinePrimitive, Word};
use crate::errors::OcrError;

// @module: hOCR reader for the recognition engine output

/// Span classes that describe one text line
const LINE_CLASSES: &[&str] = &["ocr_line", "ocr_caption", "ocr_textfloat", "ocr_header"];

/// Span class of one recognised word
const WORD_CLASS: &str = "ocrx_word";

/// What an open element means for the text below it
#[derive(Debug)]
enum Node {
    Line(BoundingBox),
    Word(BoundingBox, f32),
    Italic,
    Bold,
    Other,
}

#[derive(Debug, Default)]
struct OpenWord {
    bbox: BoundingBox,
    confidence: f32,
    text: String,
    italic: bool,
    bold: bool,
}

/// Parsed `title` properties of an hOCR element
#[derive(Debug, Default, PartialEq)]
struct TitleProps {
    bbox: Option<BoundingBox>,
    confidence: Option<f32>,
}

fn parse_title(title: &str) -> TitleProps {
    let mut props = TitleProps::default();
    for property in title.split(';') {
        let mut parts = property.split_whitespace();
        match parts.next() {
            Some("bbox") => {
                let coords: Vec<i32> = parts.filter_map(|p| p.parse().ok()).collect();
                if coords.len() == 4 {
                    props.bbox = Some(BoundingBox::new(coords[0], coords[1], coords[2], coords[3]));
                }
            }
            Some("x_wconf") => {
                props.confidence = parts.next().and_then(|p| p.parse().ok());
            }
            _ => {}
        }
    }
    props
}

fn parse_err(e: impl std::fmt::Display) -> OcrError {
    OcrError::Parse(e.to_string())
}

fn classify(element: &BytesStart<'_>) -> Result<Node, OcrError> {
    match element.local_name().as_ref() {
        b"em" | b"i" => return Ok(Node::Italic),
        b"strong" | b"b" => return Ok(Node::Bold),
        _ => {}
    }

    let mut class = None;
    let mut title = None;
    for attr in element.attributes() {
        let attr = attr.map_err(parse_err)?;
        let value = attr.unescape_value().map_err(parse_err)?.into_owned();
        match attr.key.local_name().as_ref() {
            b"class" => class = Some(value),
            b"title" => title = Some(value),
            _ => {}
        }
    }

    let Some(class) = class else {
        return Ok(Node::Other);
    };
    let props = title.as_deref().map(parse_title).unwrap_or_default();
    let bbox = props.bbox.unwrap_or_default();

    if class.split_whitespace().any(|c| LINE_CLASSES.contains(&c)) {
        Ok(Node::Line(bbox))
    } else if class.split_whitespace().any(|c| c == WORD_CLASS) {
        Ok(Node::Word(bbox, props.confidence.unwrap_or(0.0)))
    } else {
        Ok(Node::Other)
    }
}

/// Parses an hOCR document into text lines
///
/// Lines are returned in document order. Lines whose words are all empty are
/// dropped. A word is italic or bold when its text sits inside `<em>` or
/// `<strong>`.
pub fn parse_hocr(document: &str) -> Result<Vec<LinePrimitive>, OcrError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Node> = Vec::new();
    let mut lines = Vec::new();
    let mut line_words: Vec<Word> = Vec::new();
    let mut word: Option<OpenWord> = None;

    loop {
        match reader.read_event().map_err(parse_err)? {
            Event::Start(element) => {
                let node = classify(&element)?;
                match &node {
                    Node::Line(_) => line_words.clear(),
                    Node::Word(bbox, confidence) => {
                        word = Some(OpenWord {
                            bbox: *bbox,
                            confidence: *confidence,
                            ..OpenWord::default()
                        })
                    }
                    _ => {}
                }
                stack.push(node);
            }
            Event::Text(text) => {
                if let Some(open) = word.as_mut() {
                    let value = text.unescape().map_err(parse_err)?;
                    let value = value.trim();
                    if !value.is_empty() {
                        open.text.push_str(value);
                        open.italic |= stack.iter().any(|n| matches!(n, Node::Italic));
                        open.bold |= stack.iter().any(|n| matches!(n, Node::Bold));
                    }
                }
            }
            Event::End(_) => match stack.pop() {
                Some(Node::Word(..)) => {
                    if let Some(open) = word.take() {
                        line_words.push(Word {
                            text: open.text,
                            bbox: open.bbox,
                            confidence: open.confidence,
                            italic: open.italic,
                            bold: open.bold,
                        });
                    }
                }
                Some(Node::Line(bbox)) => {
                    if let Some(line) = LinePrimitive::from_words(bbox, std::mem::take(&mut line_words)) {
                        lines.push(line);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines)
}
