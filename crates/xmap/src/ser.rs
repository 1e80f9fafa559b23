//! Object graph to document.

use base64::{engine::general_purpose::STANDARD, Engine};
use log::trace;
use xmap_dom::{Document, NodeId, QName};
use xmap_schema::{
    format_basic, ConverterRef, DataType, MemberDescriptor, NamespaceDef, ObjectRef, Placement,
    TextEmbedding, TypeDescriptor, TypeKind, Value,
};

use crate::context::Session;
use crate::error::{Error, MappingError, Result};
use crate::known::KnownType;

/// Writes one object graph into a fresh document.
pub(crate) struct SerializeContext<'a> {
    pub session: Session<'a>,
    pub doc: Document,
    metadata_used: bool,
}

impl<'a> SerializeContext<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self {
            session,
            doc: Document::new(),
            metadata_used: false,
        }
    }

    /// Write `value` as the root element of the document.
    pub fn serialize_root(&mut self, value: &Value, root_type: &DataType) -> Result<NodeId> {
        let registry = self.session.registry;
        let desc = registry.descriptor(root_type);
        let namespace = desc.namespace.as_ref().map(|ns| ns.uri.clone());

        if let Err(e) = self.session.namespaces.set_root(desc.namespace.as_ref()) {
            self.session.report_structural(e)?;
        }
        let root = self
            .doc
            .create_element(QName::in_namespace(namespace.as_deref(), desc.alias.as_str()));
        self.doc.set_root(root);
        for comment in &desc.comments {
            self.doc.add_comment(comment.clone());
        }

        self.write_real_type(root, root_type, value)?;
        self.write_value(value, root_type, root, namespace.as_deref(), None)?;

        self.session.namespaces.flush(&mut self.doc, root)?;
        Ok(root)
    }

    /// Register the metadata namespace on first use.
    pub(crate) fn use_metadata(&mut self) -> Result<()> {
        if self.metadata_used {
            return Ok(());
        }
        self.metadata_used = true;
        let options = self.session.options;
        let def = NamespaceDef::new(
            options.metadata_namespace.as_str(),
            Some(options.metadata_prefix.as_str()),
        );
        self.register_namespace(&def)
    }

    pub(crate) fn register_namespace(&mut self, namespace: &NamespaceDef) -> Result<()> {
        match self.session.namespaces.register(namespace) {
            Ok(()) => Ok(()),
            Err(e) => self.session.report_structural(e),
        }
    }

    /// Mark `element` with the runtime type of `value` when it differs
    /// from the declared one.
    pub(crate) fn write_real_type(
        &mut self,
        element: NodeId,
        declared: &DataType,
        value: &Value,
    ) -> Result<()> {
        if self.session.options.suppress_metadata {
            return Ok(());
        }
        let Some(actual) = value.runtime_type() else {
            return Ok(());
        };
        if actual == *declared {
            return Ok(());
        }
        self.use_metadata()?;
        let name = self.session.real_type_name();
        self.doc.set_attribute(element, name, actual.type_name())?;
        Ok(())
    }

    /// Fill `element` with a value. Null leaves it empty.
    pub(crate) fn write_value(
        &mut self,
        value: &Value,
        declared: &DataType,
        element: NodeId,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        let registry = self.session.registry;
        let Some(actual) = value.runtime_type() else {
            return Ok(());
        };

        if let Some(converter) = member.and_then(|m| m.converter.as_ref()) {
            return self.convert_to_element(converter, value, element, member);
        }
        let desc = registry.descriptor(&actual);
        if let Some(converter) = &desc.converter {
            return self.convert_to_element(converter, value, element, member);
        }
        if let Some(known) = KnownType::of(&actual) {
            if let Err(e) = known.write_element(value, &mut self.doc, element, registry) {
                self.session.report_member(member, conversion(&actual, e))?;
            }
            return Ok(());
        }

        match desc.kind {
            TypeKind::Basic => {
                let format = member.and_then(|m| m.format.as_deref());
                if let Some(text) = self.format_value(value, format, member)? {
                    self.append_text(element, text, member);
                }
            }
            TypeKind::Object | TypeKind::CollectionObject => {
                if let Value::Class(object) = value {
                    self.write_object(object, &desc, element, namespace, member)?;
                }
            }
            TypeKind::Sequence | TypeKind::Array | TypeKind::BitVector | TypeKind::Map => {
                self.write_container(value, element, namespace, member)?;
            }
            TypeKind::Pair => {
                if let Value::Pair(pair) = value {
                    self.write_pair(pair, element, namespace, member)?;
                }
            }
            TypeKind::Known | TypeKind::Any => {
                trace!("nothing to write for {} declared as {}", actual, declared);
            }
        }
        Ok(())
    }

    fn convert_to_element(
        &mut self,
        converter: &ConverterRef,
        value: &Value,
        element: NodeId,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        if let Err(e) = converter.to_element(value, &mut self.doc, element) {
            let actual = value.runtime_type().unwrap_or(DataType::Any);
            self.session.report_member(member, conversion(&actual, e))?;
        }
        Ok(())
    }

    /// Text of a basic value, or `None` after reporting a failure.
    pub(crate) fn format_value(
        &mut self,
        value: &Value,
        format: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<String>> {
        match format_basic(value, format, self.session.registry) {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                let actual = value.runtime_type().unwrap_or(DataType::Any);
                self.session.report_member(member, conversion(&actual, e))?;
                Ok(None)
            }
        }
    }

    /// Append text honoring the member's embedding. Empty text adds nothing.
    pub(crate) fn append_text(
        &mut self,
        element: NodeId,
        text: String,
        member: Option<&MemberDescriptor>,
    ) {
        if text.is_empty() {
            return;
        }
        match member.map(|m| m.embedding).unwrap_or_default() {
            TextEmbedding::None => {
                self.doc.append_text(element, text);
            }
            TextEmbedding::CData => {
                self.doc.append_cdata(element, text);
            }
            TextEmbedding::Base64 => {
                self.doc.append_text(element, STANDARD.encode(text.as_bytes()));
            }
        }
    }

    fn write_object(
        &mut self,
        object: &ObjectRef,
        desc: &TypeDescriptor,
        element: NodeId,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        let options = self.session.options;
        let id = object.id();
        if self.session.call_stack.contains(&id) {
            if desc.tolerate_cycles.unwrap_or(options.tolerate_cycles) {
                trace!("cycle at {}, leaving a placeholder", desc.type_name);
                return Ok(());
            }
            return Err(Error::SelfReference {
                class: desc.type_name.clone(),
            });
        }
        let limit = desc.max_recursion.unwrap_or(options.max_recursion);
        if limit != 0 && self.session.depth >= limit {
            trace!("depth limit {} reached at {}", limit, desc.type_name);
            return Ok(());
        }

        if let Some(def) = &desc.namespace {
            self.register_namespace(def)?;
        }
        let inner: Option<String> = desc
            .namespace
            .as_ref()
            .map(|ns| ns.uri.clone())
            .or_else(|| namespace.map(str::to_string));

        self.session.call_stack.insert(id);
        self.session.depth += 1;
        let result = self.write_object_content(object, desc, element, inner.as_deref(), member);
        self.session.depth -= 1;
        self.session.call_stack.remove(&id);
        result?;

        // Members moved out with `..` may leave nothing behind
        if desc.has_escaping_members()
            && self.doc.is_empty_element(element)
            && self.doc.parent(element).is_some()
        {
            self.doc.detach(element);
        }
        Ok(())
    }

    fn write_object_content(
        &mut self,
        object: &ObjectRef,
        desc: &TypeDescriptor,
        element: NodeId,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        if desc.kind == TypeKind::CollectionObject && !member.is_some_and(|m| m.not_collection) {
            let items = object.read().items().to_vec();
            let item_type = desc.item_type.clone().unwrap_or(DataType::Any);
            return self.write_items(&items, &item_type, element, namespace, member);
        }
        for m in &desc.members {
            self.write_member(object, desc, m, element, namespace)?;
        }
        Ok(())
    }

    fn write_member(
        &mut self,
        object: &ObjectRef,
        desc: &TypeDescriptor,
        m: &MemberDescriptor,
        element: NodeId,
        namespace: Option<&str>,
    ) -> Result<()> {
        let registry = self.session.registry;
        let value = object.get(&m.name).unwrap_or_default();

        if value.is_null() && (m.skip_if_null || !self.session.serialize_nulls(desc)) {
            return Ok(());
        }
        if m.skip_if_default || self.session.skip_defaults(desc) {
            let default = m
                .default_value
                .clone()
                .unwrap_or_else(|| registry.zero_value(&m.data_type));
            if value == default {
                trace!("skipping default {}.{}", desc.type_name, m.name);
                return Ok(());
            }
        }

        if let Some(def) = &m.namespace {
            self.register_namespace(def)?;
        }
        if m.placement == Placement::Attribute {
            let Some(text) = self.member_text(&value, m)? else {
                return Ok(());
            };
            let name = m.qualified_name(namespace);
            let error = match self
                .doc
                .create_attribute_at(element, &m.location, namespace, name, text)
            {
                Ok(_) => return Ok(()),
                Err(xmap_dom::Error::DuplicateAttribute { name }) => {
                    MappingError::DuplicateAttribute { name }
                }
                Err(xmap_dom::Error::UncreatableLocation { path }) => {
                    MappingError::UncreatableLocation { path }
                }
                Err(e) => return Err(e.into()),
            };
            return self.session.report_member(Some(m), error);
        }

        let parent = if m.location.is_current() {
            element
        } else {
            match self.doc.create_location(element, &m.location, namespace) {
                Ok(node) => node,
                Err(_) => {
                    let error = MappingError::UncreatableLocation {
                        path: m.location.to_string(),
                    };
                    return self.session.report_member(Some(m), error);
                }
            }
        };

        if m.placement == Placement::TextContent {
            if let Some(text) = self.member_text(&value, m)? {
                self.append_text(parent, text, Some(m));
            }
            return Ok(());
        }

        for comment in &m.comments {
            self.doc.append_comment(parent, comment.clone());
        }
        if m.is_no_container() && m.converter.is_none() && is_container_value(&value) {
            return self.write_container(&value, parent, namespace, Some(m));
        }

        let substituted = value
            .runtime_type()
            .filter(|actual| *actual != m.data_type)
            .and_then(|actual| m.alias_for(&actual).map(str::to_string));
        let child_namespace = m.namespace_uri(namespace).map(str::to_string);
        let name = substituted.clone().unwrap_or_else(|| m.alias.clone());
        let child = self
            .doc
            .append_element(parent, QName::in_namespace(child_namespace.as_deref(), name));
        if substituted.is_none() {
            self.write_real_type(child, &m.data_type, &value)?;
        }
        self.write_value(&value, &m.data_type, child, child_namespace.as_deref(), Some(m))?;
        Ok(())
    }

    /// Single text form of a member's value, or `None` after reporting.
    fn member_text(&mut self, value: &Value, m: &MemberDescriptor) -> Result<Option<String>> {
        if let Some(converter) = &m.converter {
            let converted = match m.placement {
                Placement::Attribute => converter.to_attribute(value),
                _ => converter.to_text(value),
            };
            return match converted {
                Ok(text) => Ok(Some(text)),
                Err(e) => {
                    let actual = value.runtime_type().unwrap_or(DataType::Any);
                    self.session.report_member(Some(m), conversion(&actual, e))?;
                    Ok(None)
                }
            };
        }
        if value.is_null() {
            return Ok(Some(String::new()));
        }
        if let Some(items) = self.linear_items(value) {
            return self.serial_text(&items, Some(m));
        }
        self.format_value(value, m.format.as_deref(), Some(m))
    }
}

/// Check whether a value is written by the collection codec.
fn is_container_value(value: &Value) -> bool {
    matches!(
        value,
        Value::Sequence(_) | Value::Array(_) | Value::BitVector(_) | Value::Map(_)
    )
}

pub(crate) fn conversion(data_type: &DataType, error: xmap_schema::Error) -> MappingError {
    MappingError::Conversion {
        type_name: data_type.type_name(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SerializerOptions;
    use xmap_schema::{ClassDef, MemberDef, Object, SchemaBuilder, TypeRegistry};

    fn registry() -> TypeRegistry {
        let mut builder = SchemaBuilder::new();
        builder.add_class(
            ClassDef::new("Box")
                .member(MemberDef::new("Label", DataType::String).attribute())
                .member(MemberDef::new("Payload", DataType::Any)),
        );
        builder.build().unwrap()
    }

    #[test]
    fn test_root_members() {
        let registry = registry();
        let options = SerializerOptions::default();
        let mut context = SerializeContext::new(Session::new(&registry, &options));
        let boxed: Value = Object::new("Box")
            .with("Label", Value::Null)
            .with("Payload", 1.5)
            .into_ref()
            .into();

        let root = context.serialize_root(&boxed, &DataType::class("Box")).unwrap();
        assert_eq!(context.doc.root(), Some(root));
        assert_eq!(context.doc.local_name(root), "Box");
        // Null attributes are written empty
        assert_eq!(context.doc.attribute(root, &QName::new("Label")), Some(""));

        let payload = context.doc.find_child(root, None, "Payload").unwrap();
        let marker = context.session.real_type_name();
        assert_eq!(context.doc.attribute(payload, &marker), Some("Double"));
        assert_eq!(context.doc.text(payload), "1.5");
    }

    #[test]
    fn test_suppressed_metadata() {
        let registry = registry();
        let options = SerializerOptions::default().suppress_metadata(true);
        let mut context = SerializeContext::new(Session::new(&registry, &options));
        let boxed: Value = Object::new("Box")
            .with("Label", "x")
            .with("Payload", 2)
            .into_ref()
            .into();

        let root = context.serialize_root(&boxed, &DataType::class("Box")).unwrap();
        let payload = context.doc.find_child(root, None, "Payload").unwrap();
        assert_eq!(context.doc.attribute(payload, &context.session.real_type_name()), None);
        assert!(!context.metadata_used);
    }
}
