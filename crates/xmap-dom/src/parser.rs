//! Parse XML text into a [`Document`].

use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::NsReader;

use crate::document::NodeKind;
use crate::{Document, Error, NodeId, QName, Result};

impl Document {
    /// Parse XML text.
    ///
    /// Element and attribute names are resolved to their namespace URIs and
    /// the `xmlns` declarations are kept on the elements that carry them.
    /// Comments before the root element become document comments.
    ///
    /// # Example
    ///
    /// ```
    /// use xmap_dom::Document;
    ///
    /// let doc = Document::parse(r#"<Config version="2"><Name>test</Name></Config>"#)?;
    /// let root = doc.root().unwrap();
    /// let name = doc.find_child(root, None, "Name").unwrap();
    /// assert_eq!(doc.text(name), "test");
    /// # Ok::<(), xmap_dom::Error>(())
    /// ```
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut doc = Document::new();
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::Xml(format!("XML parse error at {}: {}", reader.buffer_position(), e)))?;

            match event {
                Event::Start(e) => {
                    let id = open_element(&reader, &mut doc, &e)?;
                    attach(&mut doc, &stack, id)?;
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let id = open_element(&reader, &mut doc, &e)?;
                    attach(&mut doc, &stack, id)?;
                }
                Event::End(_) => {
                    if let Some(id) = stack.pop() {
                        drop_layout_whitespace(&mut doc, id);
                    }
                }
                Event::Text(e) => {
                    if let Some(&parent) = stack.last() {
                        let text = e.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                        doc.append_text(parent, text.into_owned());
                    }
                }
                Event::CData(e) => {
                    if let Some(&parent) = stack.last() {
                        let text = e.decode().map_err(|e| Error::Xml(e.to_string()))?;
                        doc.append_cdata(parent, text.into_owned());
                    }
                }
                Event::Comment(e) => {
                    let text = e.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                    match stack.last() {
                        Some(&parent) => {
                            doc.append_comment(parent, text.into_owned());
                        }
                        None if doc.root().is_none() => doc.add_comment(text.into_owned()),
                        None => {}
                    }
                }
                Event::Eof => break,
                // Declarations, processing instructions and doctypes
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml("unexpected end of document".to_string()));
        }
        if doc.root().is_none() {
            return Err(Error::NoRoot);
        }
        Ok(doc)
    }

    /// Parse XML bytes.
    pub fn parse_bytes(xml: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(xml)?;
        Self::parse(xml)
    }
}

fn attach(doc: &mut Document, stack: &[NodeId], id: NodeId) -> Result<()> {
    match stack.last() {
        Some(&parent) => doc.append_child(parent, id),
        None if doc.root().is_none() => doc.set_root(id),
        None => return Err(Error::Xml("multiple root elements".to_string())),
    }
    Ok(())
}

fn open_element(reader: &NsReader<&[u8]>, doc: &mut Document, start: &BytesStart<'_>) -> Result<NodeId> {
    let (resolved, local) = reader.resolve_element(start.name());
    let namespace = resolved_namespace(resolved)?;
    let local = std::str::from_utf8(local.as_ref())?;
    let id = doc.create_element(QName::in_namespace(namespace.as_deref(), local));

    for attr in start.attributes() {
        let attr: XmlAttribute<'_> = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();

        match attr.key.as_namespace_binding() {
            Some(PrefixDeclaration::Default) => {
                doc.declare_namespace(id, None, value)?;
            }
            Some(PrefixDeclaration::Named(prefix)) => {
                let prefix = std::str::from_utf8(prefix)?;
                doc.declare_namespace(id, Some(prefix), value)?;
            }
            None => {
                let (resolved, local) = reader.resolve_attribute(attr.key);
                let namespace = resolved_namespace(resolved)?;
                let local = std::str::from_utf8(local.as_ref())?;
                doc.add_attribute(id, QName::in_namespace(namespace.as_deref(), local), value)?;
            }
        }
    }

    Ok(id)
}

fn resolved_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(std::str::from_utf8(ns.as_ref())?.to_string())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Xml(format!(
            "unknown namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

/// Remove indentation text from elements that have structured content.
fn drop_layout_whitespace(doc: &mut Document, id: NodeId) {
    let structured = doc
        .children(id)
        .iter()
        .any(|&c| !matches!(doc.kind(c), Some(NodeKind::Text(_))));
    if !structured {
        return;
    }

    let layout: Vec<NodeId> = doc
        .children(id)
        .iter()
        .copied()
        .filter(|&c| matches!(doc.kind(c), Some(NodeKind::Text(t)) if t.trim().is_empty()))
        .collect();
    for node in layout {
        doc.detach(node);
    }
}
