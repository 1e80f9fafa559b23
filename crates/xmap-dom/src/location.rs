//! Location paths relative to an anchor element.
//!
//! A location is a slash-separated list of steps: `.` stays on the current
//! element, `..` moves to its parent and any other step names a child
//! element. Locations only ever navigate near one anchor; they are not a
//! query language.

use std::fmt;

use crate::{sanitize_name, Document, Error, NodeId, QName, Result};

/// One step of a location path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// `.`
    Stay,
    /// `..`
    Parent,
    /// Child element with the given (sanitized) local name.
    Child(String),
}

/// Parsed location path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LocationPath {
    steps: Vec<Step>,
}

impl LocationPath {
    /// Parse a location string. Empty segments are ignored.
    pub fn parse(path: &str) -> Self {
        let steps = path
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "." => Step::Stay,
                ".." => Step::Parent,
                other => Step::Child(sanitize_name(other)),
            })
            .collect();
        Self { steps }
    }

    /// The location of the anchor itself.
    pub fn current() -> Self {
        Self::default()
    }

    /// Steps of the path.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Check whether the path resolves to the anchor itself.
    pub fn is_current(&self) -> bool {
        self.steps.iter().all(|s| *s == Step::Stay)
    }

    /// Check whether the path leaves the anchor's subtree.
    pub fn escapes(&self) -> bool {
        self.steps.contains(&Step::Parent)
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str(".");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match step {
                Step::Stay => f.write_str(".")?,
                Step::Parent => f.write_str("..")?,
                Step::Child(name) => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

impl Document {
    /// Resolve a location without modifying the document.
    ///
    /// Child steps match elements by local name in `namespace`.
    pub fn find_location(
        &self,
        anchor: NodeId,
        path: &LocationPath,
        namespace: Option<&str>,
    ) -> Option<NodeId> {
        let mut current = anchor;
        for step in path.steps() {
            current = match step {
                Step::Stay => current,
                Step::Parent => self.parent(current)?,
                Step::Child(name) => self.find_child(current, namespace, name)?,
            };
        }
        Some(current)
    }

    /// Check whether [`create_location`](Self::create_location) would succeed.
    ///
    /// Creation fails when a `..` step follows the first missing step, or
    /// when a `..` step climbs above the top of the tree.
    pub fn can_create_location(
        &self,
        anchor: NodeId,
        path: &LocationPath,
        namespace: Option<&str>,
    ) -> bool {
        let mut current = Some(anchor);
        for step in path.steps() {
            match (step, current) {
                (Step::Stay, _) => {}
                (Step::Parent, None) => return false,
                (Step::Parent, Some(node)) => match self.parent(node) {
                    Some(parent) => current = Some(parent),
                    None => return false,
                },
                (Step::Child(_), None) => {}
                (Step::Child(name), Some(node)) => {
                    current = self.find_child(node, namespace, name);
                }
            }
        }
        true
    }

    /// Resolve a location, creating missing child elements in `namespace`.
    pub fn create_location(
        &mut self,
        anchor: NodeId,
        path: &LocationPath,
        namespace: Option<&str>,
    ) -> Result<NodeId> {
        if !self.can_create_location(anchor, path, namespace) {
            return Err(Error::UncreatableLocation {
                path: path.to_string(),
            });
        }

        let mut current = anchor;
        for step in path.steps() {
            current = match step {
                Step::Stay => current,
                Step::Parent => self.parent(current).ok_or_else(|| Error::UncreatableLocation {
                    path: path.to_string(),
                })?,
                Step::Child(name) => match self.find_child(current, namespace, name) {
                    Some(child) => child,
                    None => {
                        let child = self.create_element(QName::in_namespace(namespace, name.as_str()));
                        self.append_child(current, child);
                        child
                    }
                },
            };
        }
        Ok(current)
    }

    /// Find an attribute at a location. Returns the owning element and value.
    pub fn find_attribute_at(
        &self,
        anchor: NodeId,
        path: &LocationPath,
        namespace: Option<&str>,
        name: &QName,
    ) -> Option<(NodeId, &str)> {
        let element = self.find_location(anchor, path, namespace)?;
        self.attribute(element, name).map(|value| (element, value))
    }

    /// Create an attribute at a location.
    ///
    /// Fails if the location cannot be created or the attribute already
    /// exists on the resolved element.
    pub fn create_attribute_at(
        &mut self,
        anchor: NodeId,
        path: &LocationPath,
        namespace: Option<&str>,
        name: QName,
        value: impl Into<String>,
    ) -> Result<NodeId> {
        let element = self.create_location(anchor, path, namespace)?;
        self.add_attribute(element, name, value)?;
        Ok(element)
    }
}
