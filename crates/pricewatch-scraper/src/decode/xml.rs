//! XML to a generic nested [`Value`].
//!
//! Shape: every element becomes an object keyed by child name; a child that
//! repeats becomes an array; attributes are `@name`; text next to children or
//! attributes is `#text`; a text-only element is a string; an empty element
//! is `null`. Text is trimmed. Qualified names (`asx:abap`) are kept as is.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::{DiscoveryResult, ScraperError};

#[derive(Default)]
struct Frame {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(e: &BytesStart<'_>) -> DiscoveryResult<Self> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| ScraperError::malformed(format!("<{name}>: {err}")))?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map_err(|err| ScraperError::malformed(format!("<{name}>: {err}")))?;
            attributes.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    fn push_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            None => {
                self.children.insert(name, value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        if self.attributes.is_empty() && self.children.is_empty() {
            let value = if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_owned())
            };
            return (self.name, value);
        }
        let mut object = self.attributes;
        object.extend(self.children);
        if !text.is_empty() {
            object.insert("#text".to_owned(), Value::String(text.to_owned()));
        }
        (self.name, Value::Object(object))
    }
}

/// Parse `xml` into `{ <root name>: <root value> }`.
///
/// # Errors
///
/// [`ScraperError::MalformedDocument`] on any syntax error, mismatched end
/// tag, unclosed element, or a document without exactly one root.
pub(crate) fn parse(xml: &str) -> DiscoveryResult<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    let mut finish = |stack: &mut Vec<Frame>, frame: Frame| -> DiscoveryResult<()> {
        let (name, value) = frame.close();
        match stack.last_mut() {
            Some(parent) => parent.push_child(name, value),
            None if root.is_none() => root = Some((name, value)),
            None => {
                return Err(ScraperError::malformed(format!(
                    "second root element <{name}>"
                )))
            }
        }
        Ok(())
    };

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Frame::open(&e)?),
            Ok(Event::Empty(e)) => {
                let frame = Frame::open(&e)?;
                finish(&mut stack, frame)?;
            }
            Ok(Event::End(_)) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ScraperError::malformed("unbalanced end tag"))?;
                finish(&mut stack, frame)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| ScraperError::malformed(format!("at {position}: {err}")))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(ScraperError::malformed(format!("at {position}: {err}")));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(ScraperError::malformed(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    let (name, value) = root.ok_or_else(|| ScraperError::malformed("no root element"))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}
