//! Minimal XML element tree
//!
//! Messages are decoded from and encoded to [`XmlElement`] trees. Names are
//! stored without namespace prefix; the OCHP prefix is applied on output.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::DecodeError;

/// OCHP 1.4 target namespace.
pub const OCHP_NAMESPACE: &str = "http://ochp.eu/1.4";

/// Prefix bound to [`OCHP_NAMESPACE`] when writing.
pub const OCHP_PREFIX: &str = "ns";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Leaf element holding `text`.
    pub fn text_node(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Push `child` only when present.
    pub fn push_opt(&mut self, child: Option<XmlElement>) {
        if let Some(child) = child {
            self.children.push(child);
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text content, empty when absent.
    pub fn text(&self) -> &str {
        self.raw_text().trim()
    }

    /// Text content exactly as received, empty when absent.
    pub fn raw_text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    // ── Parsing ────────────────────────────────────────────

    /// Parse a document and return its root element.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        // Leaf text is kept verbatim; indentation between elements is
        // dropped in `attach`.
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => stack.push(element_from(&start)?),
                Ok(Event::Empty(start)) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DecodeError::Xml("unbalanced closing tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(|e| DecodeError::Xml(e.to_string()))?;
                    append_text(&mut stack, &text);
                }
                Ok(Event::CData(data)) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    append_text(&mut stack, &text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(DecodeError::Xml(e.to_string())),
            }
        }

        if !stack.is_empty() {
            return Err(DecodeError::Xml("unexpected end of document".into()));
        }
        root.ok_or_else(|| DecodeError::Xml("document has no root element".into()))
    }

    // ── Serialization ──────────────────────────────────────

    /// Serialize with the OCHP prefix, declaring the namespace on this element.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, Some(OCHP_PREFIX), Some((OCHP_PREFIX, OCHP_NAMESPACE)));
        out
    }

    /// Serialize without any prefix or namespace declaration.
    pub fn to_plain_string(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, None, None);
        out
    }

    /// Write this element using `prefix` for every element name.
    ///
    /// `declare` adds an `xmlns:<prefix>` attribute to this element only.
    pub fn write(&self, out: &mut String, prefix: Option<&str>, declare: Option<(&str, &str)>) {
        let name = qualified(prefix, &self.name);

        out.push('<');
        out.push_str(&name);
        if let Some((ns_prefix, uri)) = declare {
            out.push_str(&format!(" xmlns:{}=\"{}\"", ns_prefix, escape(uri)));
        }
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", key, escape(value.as_str())));
        }

        let text = self.text.as_deref().unwrap_or("");
        if self.children.is_empty() && text.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        out.push_str(&escape(text));
        for child in &self.children {
            child.write(out, prefix, None);
        }
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
}

fn qualified(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, name),
        None => name.to_string(),
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, DecodeError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.local_name().as_ref()));

    for attr in start.attributes() {
        let attr = attr.map_err(|e| DecodeError::Xml(e.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DecodeError::Xml(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    mut element: XmlElement,
) -> Result<(), DecodeError> {
    if !element.children.is_empty() && element.text().is_empty() {
        element.text = None;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(DecodeError::Xml("multiple root elements".into()));
    }
    *root = Some(element);
    Ok(())
}

fn append_text(stack: &mut [XmlElement], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(current) = stack.last_mut() {
        current.text.get_or_insert_with(String::new).push_str(text);
    }
}
