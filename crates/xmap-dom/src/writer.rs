//! Write a [`Document`] as XML text.

use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::document::NodeKind;
use crate::{Document, Error, NamespaceDecl, NodeId, QName, Result, XML_NAMESPACE};

/// Output settings for [`Document::write_xml`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per nesting level, or `None` for compact output.
    pub indent: Option<usize>,
    /// Emit `<?xml version="1.0" encoding="utf-8"?>`.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            declaration: true,
        }
    }
}

impl WriteOptions {
    /// Compact output without a declaration.
    pub fn compact() -> Self {
        Self {
            indent: None,
            declaration: false,
        }
    }
}

impl Document {
    /// Convert to an XML string.
    pub fn to_xml_string(&self, options: &WriteOptions) -> Result<String> {
        let mut output = Vec::new();
        self.write_xml(&mut output, options)?;
        String::from_utf8(output).map_err(|e| Error::Xml(e.to_string()))
    }

    /// Write XML to a writer.
    pub fn write_xml<W: Write>(&self, writer: W, options: &WriteOptions) -> Result<()> {
        let mut xml_writer = match options.indent {
            Some(width) => Writer::new_with_indent(writer, b' ', width),
            None => Writer::new(writer),
        };

        if options.declaration {
            xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        }

        for comment in self.comments() {
            xml_writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?;
        }

        let root = self.root().ok_or(Error::NoRoot)?;
        let mut scopes = ScopeStack::default();
        self.write_element(&mut xml_writer, root, &mut scopes)?;
        Ok(())
    }

    /// Write a single element and its children.
    fn write_element<W: Write>(
        &self,
        writer: &mut Writer<W>,
        id: NodeId,
        scopes: &mut ScopeStack,
    ) -> Result<()> {
        let element = self.element(id).ok_or(Error::NotAnElement { index: id.index() })?;

        scopes.push(element.namespaces.clone());
        let tag_name = scopes.element_name(&element.name);

        let mut attributes = Vec::with_capacity(element.attributes.len());
        for attr in &element.attributes {
            attributes.push((scopes.attribute_name(&attr.name), attr.value.as_str()));
        }

        // Declarations, including any added while resolving names
        let mut elem = BytesStart::new(tag_name.as_str());
        for decl in scopes.current() {
            let key = match &decl.prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            elem.push_attribute((key.as_str(), decl.uri.as_str()));
        }
        for (key, value) in &attributes {
            elem.push_attribute((key.as_str(), *value));
        }

        if element.children.is_empty() {
            writer.write_event(Event::Empty(elem))?;
        } else {
            writer.write_event(Event::Start(elem))?;

            for &child in &element.children {
                match self.kind(child) {
                    Some(NodeKind::Element(_)) => self.write_element(writer, child, scopes)?,
                    Some(NodeKind::Text(text)) => {
                        writer.write_event(Event::Text(BytesText::new(text)))?;
                    }
                    Some(NodeKind::CData(text)) => {
                        writer.write_event(Event::CData(BytesCData::new(text.as_str())))?;
                    }
                    Some(NodeKind::Comment(text)) => {
                        writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
                    }
                    None => {}
                }
            }

            writer.write_event(Event::End(BytesEnd::new(tag_name.as_str())))?;
        }

        scopes.pop();
        Ok(())
    }
}

/// In-scope namespace declarations while writing.
#[derive(Debug, Default)]
struct ScopeStack {
    scopes: Vec<Vec<NamespaceDecl>>,
    generated: usize,
}

impl ScopeStack {
    fn push(&mut self, decls: Vec<NamespaceDecl>) {
        self.scopes.push(decls);
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn current(&self) -> &[NamespaceDecl] {
        self.scopes.last().map(Vec::as_slice).unwrap_or(&[])
    }

    fn declare(&mut self, prefix: Option<String>, uri: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(NamespaceDecl {
                prefix,
                uri: uri.to_string(),
            });
        }
    }

    /// URI currently bound to a prefix. An empty URI means unbound.
    fn lookup_uri(&self, prefix: Option<&str>) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|decl| decl.prefix.as_deref() == prefix)
            .map(|decl| decl.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// A prefix bound to `uri` that is not shadowed by an inner declaration.
    fn lookup_prefix(&self, uri: &str, allow_default: bool) -> Option<Option<&str>> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .filter(|decl| decl.uri == uri && (allow_default || decl.prefix.is_some()))
            .map(|decl| decl.prefix.as_deref())
            .find(|prefix| self.lookup_uri(*prefix) == Some(uri))
    }

    fn generate_prefix(&mut self) -> String {
        loop {
            self.generated += 1;
            let candidate = format!("ns{}", self.generated);
            if self.lookup_uri(Some(&candidate)).is_none() {
                return candidate;
            }
        }
    }

    fn element_name(&mut self, name: &QName) -> String {
        match name.namespace() {
            Some(uri) => match self.lookup_prefix(uri, true) {
                Some(Some(prefix)) => format!("{}:{}", prefix, name.local_name()),
                Some(None) => name.local_name().to_string(),
                None => {
                    let prefix = self.generate_prefix();
                    self.declare(Some(prefix.clone()), uri);
                    format!("{}:{}", prefix, name.local_name())
                }
            },
            None => {
                if self.lookup_uri(None).is_some() {
                    self.declare(None, "");
                }
                name.local_name().to_string()
            }
        }
    }

    fn attribute_name(&mut self, name: &QName) -> String {
        match name.namespace() {
            None => name.local_name().to_string(),
            Some(XML_NAMESPACE) => format!("xml:{}", name.local_name()),
            Some(uri) => {
                let prefix = match self.lookup_prefix(uri, false) {
                    Some(Some(prefix)) => prefix.to_string(),
                    _ => {
                        let prefix = self.generate_prefix();
                        self.declare(Some(prefix.clone()), uri);
                        prefix
                    }
                };
                format!("{}:{}", prefix, name.local_name())
            }
        }
    }
}
