//! Lightweight element tree read with `quick-xml`.
//!
//! CDA documents are small enough to hold in memory, and the mapping to
//! nodes needs random access to siblings (`templateId`, `code`, `value`),
//! so the stream is folded into a tree first.

use cda_model::ParseError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Content {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    /// Local name, namespace prefix stripped.
    pub name: String,
    /// Attributes keyed by local name.
    pub attributes: Vec<(String, String)>,
    pub content: Vec<Content>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::Malformed {
                message: e.to_string(),
                position: 0,
            })?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| ParseError::Malformed {
                    message: e.to_string(),
                    position: 0,
                })?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            content: Vec::new(),
        })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.content.iter().filter_map(|content| match content {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children().filter(move |child| child.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children().find(|child| child.name == name)
    }

    /// Follow a `/`-separated chain of first children.
    pub fn path(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .try_fold(self, |element, name| element.child(name))
    }

    /// All descendant text in document order with whitespace collapsed.
    pub fn text(&self) -> String {
        let mut pieces = Vec::new();
        self.collect_text(&mut pieces);
        pieces
            .iter()
            .flat_map(|piece| piece.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn collect_text<'a>(&'a self, pieces: &mut Vec<&'a str>) {
        for content in &self.content {
            match content {
                Content::Element(element) => element.collect_text(pieces),
                Content::Text(text) => pieces.push(text),
            }
        }
    }

    pub fn non_empty_text(&self) -> Option<String> {
        let text = self.text();
        (!text.is_empty()).then_some(text)
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Content::Text(last)) = self.content.last_mut() {
            last.push_str(text);
        } else {
            self.content.push(Content::Text(text.to_string()));
        }
    }
}

pub(crate) fn read_tree(bytes: &[u8]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ParseError::Malformed {
                message: e.to_string(),
                position: reader.error_position(),
            })?;
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(ParseError::Malformed {
                        message: "content after the root element".to_string(),
                        position: reader.buffer_position(),
                    });
                }
                stack.push(Element::from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.content.push(Content::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => {
                        return Err(ParseError::Malformed {
                            message: "content after the root element".to_string(),
                            position: reader.buffer_position(),
                        });
                    }
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(ParseError::Malformed {
                        message: "unbalanced end tag".to_string(),
                        position: reader.buffer_position(),
                    });
                };
                match stack.last_mut() {
                    Some(parent) => parent.content.push(Content::Element(element)),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let decoded = text.decode().map_err(|e| ParseError::Malformed {
                        message: e.to_string(),
                        position: reader.buffer_position(),
                    })?;
                    parent.push_text(&decoded);
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(parent) = stack.last_mut() {
                    let name = String::from_utf8_lossy(&reference).into_owned();
                    let Some(resolved) = resolve_entity(&name) else {
                        return Err(ParseError::Malformed {
                            message: format!("unknown entity &{name};"),
                            position: reader.buffer_position(),
                        });
                    };
                    parent.push_text(resolved.encode_utf8(&mut [0; 4]));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed {
            message: format!("unclosed element <{}>", stack[stack.len() - 1].name),
            position: reader.buffer_position(),
        });
    }
    root.ok_or(ParseError::Empty)
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}
