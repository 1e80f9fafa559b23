//! Arena-backed XML document.
//!
//! Nodes live in one vector and are addressed by [`NodeId`]. Elements keep
//! their children in order and every node records its parent, so values can
//! be placed relative to any anchor element and removed again.

use crate::{Error, QName, Result};

/// Index of a node within a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`) on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// `None` declares the default namespace.
    pub prefix: Option<String>,
    pub uri: String,
}

/// Element payload.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    pub namespaces: Vec<NamespaceDecl>,
    pub children: Vec<NodeId>,
}

impl Element {
    fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Content of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Marker returned by [`Document::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// An XML document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
    comments: Vec<String>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document with a root element.
    pub fn with_root(name: impl Into<QName>) -> (Self, NodeId) {
        let mut doc = Self::new();
        let root = doc.create_element(name);
        doc.root = Some(root);
        (doc, root)
    }

    /// Root element, if one has been set.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make `id` the root element, detaching it from any parent.
    pub fn set_root(&mut self, id: NodeId) {
        self.detach(id);
        self.root = Some(id);
    }

    /// Document-level comments written before the root element.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Add a document-level comment.
    pub fn add_comment(&mut self, text: impl Into<String>) {
        self.comments.push(text.into());
    }

    /// Number of nodes in the arena, detached nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { parent: None, kind });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: impl Into<QName>) -> NodeId {
        self.push(NodeKind::Element(Element::new(name.into())))
    }

    /// Create an element and append it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: impl Into<QName>) -> NodeId {
        let id = self.create_element(name);
        self.append_child(parent, id);
        id
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child {
            return;
        }
        self.detach(child);
        if let Some(NodeKind::Element(element)) = self.kind_mut(parent) {
            element.children.push(child);
            self.nodes[child.0].parent = Some(parent);
        }
    }

    /// Remove `id` from its parent. The node stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(id.0).and_then(|n| n.parent) else {
            if self.root == Some(id) {
                self.root = None;
            }
            return;
        };
        if let Some(NodeKind::Element(element)) = self.kind_mut(parent) {
            element.children.retain(|&c| c != id);
        }
        self.nodes[id.0].parent = None;
    }

    /// Parent of a node.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Content of a node.
    #[inline]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        self.nodes.get_mut(id.0).map(|n| &mut n.kind)
    }

    /// Element payload of a node.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match self.kind_mut(id) {
            Some(NodeKind::Element(element)) => Ok(element),
            _ => Err(Error::NotAnElement { index: id.0 }),
        }
    }

    /// Check whether a node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Qualified name of an element.
    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.element(id).map(|e| &e.name)
    }

    /// Local name of an element, or an empty string for other nodes.
    pub fn local_name(&self, id: NodeId) -> &str {
        self.name(id).map(QName::local_name).unwrap_or("")
    }

    /// Rename an element.
    pub fn rename(&mut self, id: NodeId, name: impl Into<QName>) -> Result<()> {
        self.element_mut(id)?.name = name.into();
        Ok(())
    }

    /// Child nodes of an element, in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Child elements of an element, in document order.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c))
    }

    /// Child elements with the given namespace and local name.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        namespace: Option<&'a str>,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.child_elements(id).filter(move |&c| {
            self.name(c)
                .map(|n| n.matches(namespace, local))
                .unwrap_or(false)
        })
    }

    /// First child element with the given namespace and local name.
    pub fn find_child(&self, id: NodeId, namespace: Option<&str>, local: &str) -> Option<NodeId> {
        self.children_named(id, namespace, local).next()
    }

    /// Check whether an element has any child elements.
    pub fn has_child_elements(&self, id: NodeId) -> bool {
        self.child_elements(id).next().is_some()
    }

    /// Attributes of an element.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map(|e| e.attributes.as_slice()).unwrap_or(&[])
    }

    /// Value of an attribute.
    pub fn attribute(&self, id: NodeId, name: &QName) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Add an attribute, failing if one with the same name exists.
    pub fn add_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<QName>,
        value: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        let element = self.element_mut(id)?;
        if element.attributes.iter().any(|a| a.name == name) {
            return Err(Error::DuplicateAttribute {
                name: name.to_string(),
            });
        }
        element.attributes.push(Attribute {
            name,
            value: value.into(),
        });
        Ok(())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<QName>,
        value: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        let value = value.into();
        let element = self.element_mut(id)?;
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => element.attributes.push(Attribute { name, value }),
        }
        Ok(())
    }

    /// Remove an attribute and return its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &QName) -> Option<String> {
        let element = self.element_mut(id).ok()?;
        let pos = element.attributes.iter().position(|a| &a.name == name)?;
        Some(element.attributes.remove(pos).value)
    }

    /// Namespace declarations on an element.
    pub fn namespaces(&self, id: NodeId) -> &[NamespaceDecl] {
        self.element(id).map(|e| e.namespaces.as_slice()).unwrap_or(&[])
    }

    /// Declare a namespace on an element. Redeclaring a prefix replaces its URI.
    pub fn declare_namespace(
        &mut self,
        id: NodeId,
        prefix: Option<&str>,
        uri: impl Into<String>,
    ) -> Result<()> {
        let uri = uri.into();
        let prefix = prefix.filter(|p| !p.is_empty()).map(str::to_string);
        let element = self.element_mut(id)?;
        match element.namespaces.iter_mut().find(|d| d.prefix == prefix) {
            Some(decl) => decl.uri = uri,
            None => element.namespaces.push(NamespaceDecl { prefix, uri }),
        }
        Ok(())
    }

    /// Append a text node to an element.
    pub fn append_text(&mut self, id: NodeId, text: impl Into<String>) -> NodeId {
        let node = self.push(NodeKind::Text(text.into()));
        self.append_child(id, node);
        node
    }

    /// Append a CDATA section to an element.
    pub fn append_cdata(&mut self, id: NodeId, text: impl Into<String>) -> NodeId {
        let node = self.push(NodeKind::CData(text.into()));
        self.append_child(id, node);
        node
    }

    /// Append a comment to an element.
    pub fn append_comment(&mut self, id: NodeId, text: impl Into<String>) -> NodeId {
        let node = self.push(NodeKind::Comment(text.into()));
        self.append_child(id, node);
        node
    }

    /// Check whether an element has direct text or CDATA content.
    pub fn has_text(&self, id: NodeId) -> bool {
        self.children(id)
            .iter()
            .any(|&c| matches!(self.kind(c), Some(NodeKind::Text(_) | NodeKind::CData(_))))
    }

    /// Concatenated direct text and CDATA content of an element.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            match self.kind(child) {
                Some(NodeKind::Text(text)) | Some(NodeKind::CData(text)) => out.push_str(text),
                _ => {}
            }
        }
        out
    }

    /// Check whether an element has no attributes and no children.
    pub fn is_empty_element(&self, id: NodeId) -> bool {
        self.element(id)
            .map(|e| e.attributes.is_empty() && e.children.is_empty())
            .unwrap_or(false)
    }

    /// Remember the current arena size.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.nodes.len())
    }

    /// Discard every node created since `checkpoint`.
    ///
    /// Nodes that existed before the checkpoint must not have been moved
    /// under a newer node in the meantime.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let keep = checkpoint.0;
        if keep >= self.nodes.len() {
            return;
        }
        for index in keep..self.nodes.len() {
            if let Some(parent) = self.nodes[index].parent {
                if parent.0 < keep {
                    if let Some(NodeKind::Element(element)) = self.kind_mut(parent) {
                        element.children.retain(|c| c.0 < keep);
                    }
                }
            }
        }
        if self.root.is_some_and(|r| r.0 >= keep) {
            self.root = None;
        }
        self.nodes.truncate(keep);
    }
}
