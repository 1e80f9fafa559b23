//! Entry points bound to a root type.

use std::io::Write;
use std::sync::Arc;

use log::debug;
use xmap_dom::Document;
use xmap_schema::{DataType, TypeRegistry, Value};

use crate::context::Session;
use crate::de::DeserializeContext;
use crate::error::{ErrorList, MappingError, Result};
use crate::ser::SerializeContext;
use crate::SerializerOptions;

/// Serializes and deserializes values of one root type.
///
/// Conditions recorded by the last call are available from
/// [`errors`](Self::errors); they are cleared at the start of every call.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use xmap::prelude::*;
///
/// let mut builder = SchemaBuilder::new();
/// builder.add_class(
///     ClassDef::new("Person")
///         .member(MemberDef::new("Name", DataType::String).attribute())
///         .member(MemberDef::new("Age", DataType::Int32)),
/// );
/// let registry = Arc::new(builder.build()?);
///
/// let mut serializer = XmlSerializer::new(registry, DataType::class("Person"))
///     .with_options(SerializerOptions::default().xml_declaration(false));
/// let person = Object::new("Person").with("Name", "Ada").with("Age", 36);
/// let xml = serializer.serialize(&person.into_ref().into())?;
/// assert_eq!(xml, "<Person Name=\"Ada\">\n  <Age>36</Age>\n</Person>");
///
/// let back = serializer.deserialize(&xml)?.unwrap();
/// assert_eq!(back.as_object().unwrap().get("Age"), Some(Value::Int32(36)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct XmlSerializer {
    registry: Arc<TypeRegistry>,
    root_type: DataType,
    options: SerializerOptions,
    base_object: Option<Value>,
    errors: ErrorList,
}

impl XmlSerializer {
    /// Serializer with default options.
    pub fn new(registry: Arc<TypeRegistry>, root_type: DataType) -> Self {
        Self {
            registry,
            root_type,
            options: SerializerOptions::default(),
            base_object: None,
            errors: ErrorList::new(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: SerializerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SerializerOptions {
        &mut self.options
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn root_type(&self) -> &DataType {
        &self.root_type
    }

    /// Conditions recorded by the last call.
    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    /// Serialize to an XML string.
    pub fn serialize(&mut self, value: &Value) -> Result<String> {
        let doc = self.serialize_to_document(value)?;
        Ok(doc.to_xml_string(&self.options.write_options())?)
    }

    /// Serialize into `writer`.
    pub fn serialize_to_writer<W: Write>(&mut self, value: &Value, writer: W) -> Result<()> {
        let doc = self.serialize_to_document(value)?;
        doc.write_xml(writer, &self.options.write_options())?;
        Ok(())
    }

    /// Serialize to a document tree.
    pub fn serialize_to_document(&mut self, value: &Value) -> Result<Document> {
        self.errors.clear();
        debug!("serializing {}", self.root_type);

        let session = Session::new(&self.registry, &self.options);
        let mut context = SerializeContext::new(session);
        let result = context.serialize_root(value, &self.root_type);
        self.errors = std::mem::take(&mut context.session.errors);
        result?;
        Ok(context.doc)
    }

    /// Deserialize an XML string.
    ///
    /// Returns `Ok(None)` when the text is not a well-formed document and
    /// the exception policy does not abort on it.
    pub fn deserialize(&mut self, xml: &str) -> Result<Option<Value>> {
        match Document::parse(xml) {
            Ok(mut doc) => self.deserialize_document(&mut doc),
            Err(e) => {
                self.errors.clear();
                let mut session = Session::new(&self.registry, &self.options);
                let error = MappingError::MalformedDocument {
                    reason: e.to_string(),
                };
                let result = session.report_structural(error);
                self.errors = session.errors;
                result.map(|()| None)
            }
        }
    }

    /// Deserialize a document tree.
    ///
    /// The tree is only modified transiently and is left as it was found.
    pub fn deserialize_document(&mut self, doc: &mut Document) -> Result<Option<Value>> {
        self.errors.clear();
        debug!("deserializing {}", self.root_type);

        let session = Session::new(&self.registry, &self.options);
        let mut context = DeserializeContext::new(session, doc);
        let result = context.deserialize_root(&self.root_type, self.base_object.clone());
        self.errors = std::mem::take(&mut context.session.errors);
        result
    }

    /// Fill `base` instead of a fresh instance on the next deserialization.
    ///
    /// Members missing from the document keep their current values, which
    /// allows one object to be assembled from several documents.
    pub fn set_base_object(&mut self, base: Value) {
        self.base_object = Some(base);
    }

    pub fn clear_base_object(&mut self) {
        self.base_object = None;
    }
}
