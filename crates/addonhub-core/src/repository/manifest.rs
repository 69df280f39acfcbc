//! Aggregate manifest document.

use crate::config::ManifestConfig;
use crate::{AddonHubError, Result};
use md5::{Digest, Md5};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// The merged document and its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    xml: Vec<u8>,
    md5: String,
}

impl Manifest {
    /// Wrap already-normalized fragments (see [`normalize_fragment`]) in the
    /// `<addons>` root, keeping their order.
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let root = ManifestConfig::ROOT_ELEMENT;
        let mut xml = Vec::new();
        xml.extend_from_slice(XML_DECLARATION.as_bytes());
        xml.push(b'\n');
        xml.extend_from_slice(format!("<{}>\n", root).as_bytes());
        for fragment in fragments {
            xml.extend_from_slice(&fragment);
            xml.push(b'\n');
        }
        xml.extend_from_slice(format!("</{}>\n", root).as_bytes());

        let md5 = hex::encode(Md5::digest(&xml));
        Self { xml, md5 }
    }

    pub fn xml(&self) -> &[u8] {
        &self.xml
    }

    /// Lowercase hex MD5 of [`Manifest::xml`].
    pub fn md5(&self) -> &str {
        &self.md5
    }

    pub fn len(&self) -> usize {
        self.xml.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xml.is_empty()
    }
}

fn xml_error(message: impl Into<String>) -> AddonHubError {
    AddonHubError::Xml {
        message: message.into(),
    }
}

/// Check that `bytes` is one well-formed element and return just that element.
///
/// The prolog (declaration, doctype, processing instructions, comments) and
/// whitespace around the root are dropped.
pub fn normalize_fragment(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(bytes);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match &event {
            Event::Eof => break,
            Event::Decl(_) | Event::DocType(_) | Event::PI(_) | Event::Comment(_) if depth == 0 => {
                continue
            }
            Event::Text(text) if depth == 0 => {
                if text.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return Err(xml_error("text outside the root element"));
            }
            Event::Start(_) | Event::Empty(_) if depth == 0 => {
                roots += 1;
                if roots > 1 {
                    return Err(xml_error("more than one root element"));
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ if depth == 0 => return Err(xml_error("content outside the root element")),
            _ => {}
        }

        writer
            .write_event(event)
            .map_err(|e| xml_error(e.to_string()))?;
    }

    if roots == 0 {
        return Err(xml_error("no root element"));
    }
    if depth != 0 {
        return Err(xml_error("unclosed root element"));
    }
    Ok(writer.into_inner())
}
