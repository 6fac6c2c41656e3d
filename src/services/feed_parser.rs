//! RSS/Atom feed parsing.
//!
//! Converts raw feed XML into loosely-typed items (`serde_json::Value`),
//! preserving the original shape of every element: plain elements become bare
//! strings, attribute-bearing elements become objects with a `#text` key next
//! to their attributes, repeated tags collect into arrays. Downstream
//! normalization owns the interpretation; this module only transcribes.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed feed XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// One element being assembled while walking the XML event stream.
struct Frame {
    attrs: Map<String, Value>,
    text: String,
    children: Map<String, Value>,
}

impl Frame {
    fn new(attrs: Map<String, Value>) -> Self {
        Self {
            attrs,
            text: String::new(),
            children: Map::new(),
        }
    }

    /// Collapse a finished element into its JSON shape.
    fn into_value(self) -> Value {
        if self.attrs.is_empty() && self.children.is_empty() {
            return Value::String(self.text);
        }

        let mut obj = self.children;
        for (k, v) in self.attrs {
            obj.insert(k, v);
        }
        if !self.text.is_empty() {
            obj.insert("#text".to_string(), Value::String(self.text));
        }
        Value::Object(obj)
    }
}

/// Insert a child value, collecting repeats of the same tag into an array.
fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.entry(name) {
        serde_json::map::Entry::Vacant(slot) => {
            slot.insert(value);
        }
        serde_json::map::Entry::Occupied(mut slot) => match slot.get_mut() {
            Value::Array(existing) => existing.push(value),
            existing => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        },
    }
}

fn is_item_tag(name: &str) -> bool {
    name == "item" || name == "entry"
}

fn read_attrs(e: &quick_xml::events::BytesStart<'_>) -> Result<Map<String, Value>, ParseError> {
    let mut attrs = Map::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
        attrs.insert(key, Value::String(value.to_string()));
    }
    Ok(attrs)
}

/// Parse feed XML into the ordered sequence of its items.
///
/// Handles RSS (`channel/item`) and Atom (`feed/entry`); element names are
/// matched by local name so namespaced tags like `dc:creator` land under
/// `creator`. A well-formed feed with no items parses to an empty vec;
/// malformed XML is an error, fatal to the run for that source.
pub fn parse_feed(xml: &str) -> Result<Vec<Value>, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items: Vec<Value> = Vec::new();
    // Frames for the item currently being assembled; empty between items.
    let mut stack: Vec<(String, Frame)> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if !stack.is_empty() || is_item_tag(&name) {
                    stack.push((name, Frame::new(read_attrs(e)?)));
                }
            }
            Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                let attrs = read_attrs(e)?;
                let value = if attrs.is_empty() {
                    Value::String(String::new())
                } else {
                    Value::Object(attrs)
                };
                match stack.last_mut() {
                    Some((_, parent)) => insert_child(&mut parent.children, name, value),
                    None if is_item_tag(&name) => items.push(Value::Object(Map::new())),
                    None => {}
                }
            }
            Event::Text(ref e) => {
                if let Some((_, frame)) = stack.last_mut() {
                    let decoded = e.decode().map_err(quick_xml::Error::from)?;
                    frame
                        .text
                        .push_str(&quick_xml::escape::unescape(&decoded).map_err(quick_xml::Error::from)?);
                }
            }
            Event::CData(ref e) => {
                if let Some((_, frame)) = stack.last_mut() {
                    frame
                        .text
                        .push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::End(_) => {
                if let Some((name, frame)) = stack.pop() {
                    let value = frame.into_value();
                    match stack.last_mut() {
                        Some((_, parent)) => insert_child(&mut parent.children, name, value),
                        None => items.push(value),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rss_items_in_order() {
        let xml = r#"<?xml version="1.0"?>
            <rss version="2.0"><channel>
                <title>Jobs</title>
                <item><title>First</title><link>http://x/1</link></item>
                <item><title>Second</title><link>http://x/2</link></item>
            </channel></rss>"#;

        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["title"], "First");
        assert_eq!(items[1]["link"], "http://x/2");
    }

    #[test]
    fn attribute_bearing_guid_keeps_text_under_text_key() {
        let xml = r#"<rss><channel><item>
            <guid isPermaLink="false">job-42</guid>
        </item></channel></rss>"#;

        let items = parse_feed(xml).unwrap();
        assert_eq!(items[0]["guid"]["#text"], "job-42");
        assert_eq!(items[0]["guid"]["isPermaLink"], "false");
    }

    #[test]
    fn cdata_descriptions_survive() {
        let xml = r#"<rss><channel><item>
            <description><![CDATA[<b>Great</b> role & more]]></description>
        </item></channel></rss>"#;

        let items = parse_feed(xml).unwrap();
        assert_eq!(items[0]["description"], "<b>Great</b> role & more");
    }

    #[test]
    fn repeated_tags_collect_into_arrays() {
        let xml = r#"<rss><channel><item>
            <category>rust</category>
            <category>backend</category>
        </item></channel></rss>"#;

        let items = parse_feed(xml).unwrap();
        let cats = items[0]["category"].as_array().unwrap();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0], "rust");
    }

    #[test]
    fn parses_atom_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <title>Jobs</title>
            <entry>
                <id>urn:job:9</id>
                <title>Platform Engineer</title>
                <link href="http://x/9"/>
            </entry>
        </feed>"#;

        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "urn:job:9");
        assert_eq!(items[0]["link"]["href"], "http://x/9");
    }

    #[test]
    fn namespaced_tags_use_local_names() {
        let xml = r#"<rss><channel><item>
            <dc:creator xmlns:dc="http://purl.org/dc/elements/1.1/">Acme</dc:creator>
        </item></channel></rss>"#;

        let items = parse_feed(xml).unwrap();
        assert_eq!(items[0]["creator"], "Acme");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = "<rss><channel><item><title>Broken</channel>";
        assert!(parse_feed(xml).is_err());
    }

    #[test]
    fn feed_without_items_parses_empty() {
        let xml = "<rss><channel><title>Empty</title></channel></rss>";
        assert!(parse_feed(xml).unwrap().is_empty());
    }
}
