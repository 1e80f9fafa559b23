//! Namespaces used by one document.

use log::trace;
use xmap_dom::{Document, NodeId};
use xmap_schema::NamespaceDef;

use crate::error::MappingError;

/// Namespace URIs seen while writing, with the prefix each is declared with.
///
/// The root element's namespace, unless it asks for a prefix, becomes the
/// default namespace. Other namespaces without a preferred prefix get
/// generated ones (`ns1`, `ns2`, ...). Everything is declared once on the
/// root element.
#[derive(Debug, Default, Clone)]
pub struct NamespaceRegistry {
    /// (uri, prefix); `None` is the default namespace.
    entries: Vec<(String, Option<String>)>,
    root: Option<String>,
    generated: usize,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace of the root element and register it.
    pub fn set_root(&mut self, namespace: Option<&NamespaceDef>) -> Result<(), MappingError> {
        self.root = namespace.map(|ns| ns.uri.clone());
        match namespace {
            Some(ns) => self.register(ns),
            None => Ok(()),
        }
    }

    /// Register a namespace.
    ///
    /// Registering a known URI again keeps its first prefix. Binding an
    /// explicit prefix that is already bound to another URI fails.
    pub fn register(&mut self, namespace: &NamespaceDef) -> Result<(), MappingError> {
        if namespace.uri.is_empty() || self.contains(&namespace.uri) {
            return Ok(());
        }

        let prefix = match &namespace.prefix {
            Some(prefix) => {
                if let Some((uri, _)) = self
                    .entries
                    .iter()
                    .find(|(_, p)| p.as_deref() == Some(prefix.as_str()))
                {
                    return Err(MappingError::NamespaceCollision {
                        prefix: prefix.clone(),
                        first: uri.clone(),
                        second: namespace.uri.clone(),
                    });
                }
                Some(prefix.clone())
            }
            None if self.root.as_deref() == Some(namespace.uri.as_str()) => None,
            None => Some(self.generate_prefix()),
        };

        trace!("registered namespace {} as {:?}", namespace.uri, prefix);
        self.entries.push((namespace.uri.clone(), prefix));
        Ok(())
    }

    fn generate_prefix(&mut self) -> String {
        loop {
            self.generated += 1;
            let candidate = format!("ns{}", self.generated);
            if !self
                .entries
                .iter()
                .any(|(_, p)| p.as_deref() == Some(candidate.as_str()))
            {
                return candidate;
            }
        }
    }

    /// Check whether a URI is registered.
    pub fn contains(&self, uri: &str) -> bool {
        self.entries.iter().any(|(u, _)| u == uri)
    }

    /// Prefix of a registered URI; `Some(None)` for the default namespace.
    pub fn prefix_of(&self, uri: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(u, _)| u == uri)
            .map(|(_, p)| p.as_deref())
    }

    /// Registered (uri, prefix) pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(u, p)| (u.as_str(), p.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declare every registered namespace on `root`.
    pub fn flush(&self, doc: &mut Document, root: NodeId) -> xmap_dom::Result<()> {
        for (uri, prefix) in &self.entries {
            doc.declare_namespace(root, prefix.as_deref(), uri.as_str())?;
        }
        Ok(())
    }
}
