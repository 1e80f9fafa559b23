//! Document to object graph.

use base64::{engine::general_purpose::STANDARD, Engine};
use log::trace;
use xmap_dom::{Document, NodeId, QName};
use xmap_schema::{
    parse_basic, ConverterRef, DataType, MemberDescriptor, ObjectRef, Placement, TextEmbedding,
    TypeDescriptor, TypeKind, Value,
};

use crate::context::Session;
use crate::error::{MappingError, Result};
use crate::known::KnownType;

/// Reads one document into an object graph.
///
/// The document is only changed transiently, while probing for members
/// that were written outside their element.
pub(crate) struct DeserializeContext<'a, 'd> {
    pub session: Session<'a>,
    pub doc: &'d mut Document,
}

impl<'a, 'd> DeserializeContext<'a, 'd> {
    pub fn new(session: Session<'a>, doc: &'d mut Document) -> Self {
        Self { session, doc }
    }

    /// Read the root element as `root_type`, filling `base` when given.
    pub fn deserialize_root(
        &mut self,
        root_type: &DataType,
        base: Option<Value>,
    ) -> Result<Option<Value>> {
        let Some(root) = self.doc.root() else {
            let error = MappingError::MalformedDocument {
                reason: "document has no root element".to_string(),
            };
            self.session.report_structural(error)?;
            return Ok(None);
        };
        let desc = self.session.registry.descriptor(root_type);
        let namespace = desc.namespace.as_ref().map(|ns| ns.uri.clone());
        self.read_value(root, root_type, base, namespace.as_deref(), None)
    }

    /// Declared type, replaced by the type named in the real-type marker
    /// when that one is assignable.
    fn effective_type(&mut self, element: NodeId, declared: &DataType) -> Result<DataType> {
        let registry = self.session.registry;
        let marker = self
            .doc
            .attribute(element, &self.session.real_type_name())
            .map(str::to_string);
        let Some(name) = marker else {
            return Ok(declared.clone());
        };

        match registry.resolve_type_name(&name) {
            Some(actual) if registry.is_assignable(declared, &actual) => return Ok(actual),
            Some(actual) => {
                let error = MappingError::TypeMismatch {
                    expected: declared.type_name(),
                    actual: actual.type_name(),
                };
                self.session.report_structural(error)?;
            }
            None => {
                self.session
                    .report_structural(MappingError::UnresolvedType { name })?;
            }
        }
        Ok(declared.clone())
    }

    /// Read a value from `element`. `None` means nothing usable was found
    /// and the condition has been reported.
    pub(crate) fn read_value(
        &mut self,
        element: NodeId,
        declared: &DataType,
        existing: Option<Value>,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        let registry = self.session.registry;
        let data_type = self.effective_type(element, declared)?;

        if let Some(converter) = member.and_then(|m| m.converter.as_ref()) {
            return self.convert_from_element(converter, element, &data_type, member);
        }
        let desc = registry.descriptor(&data_type);
        if let Some(converter) = &desc.converter {
            return self.convert_from_element(converter, element, &data_type, member);
        }
        if let Some(known) = KnownType::of(&data_type) {
            return match known.read_element(&*self.doc, element, registry) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    let text = self.doc.text(element);
                    self.session
                        .report_member(member, malformed(&text, &data_type, e))?;
                    Ok(None)
                }
            };
        }

        match desc.kind {
            TypeKind::Basic => {
                let raw = self.doc.text(element);
                self.parse_text(&raw, &data_type, member)
            }
            TypeKind::Any => {
                let raw = self.doc.text(element);
                self.parse_text(&raw, &DataType::String, member)
            }
            TypeKind::Pair => self.read_pair(element, &data_type, namespace, member),
            TypeKind::Sequence | TypeKind::Array | TypeKind::BitVector | TypeKind::Map => {
                self.read_container(element, &data_type, namespace, member)
            }
            TypeKind::CollectionObject if !member.is_some_and(|m| m.not_collection) => {
                self.read_collection_object(element, &desc, existing, namespace, member)
            }
            TypeKind::Object | TypeKind::CollectionObject => {
                self.read_object(element, &desc, existing, namespace)
            }
            TypeKind::Known => Ok(None),
        }
    }

    fn convert_from_element(
        &mut self,
        converter: &ConverterRef,
        element: NodeId,
        data_type: &DataType,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        match converter.from_element(&*self.doc, element) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let text = self.doc.text(element);
                self.session
                    .report_member(member, malformed(&text, data_type, e))?;
                Ok(None)
            }
        }
    }

    /// Parse element, attribute or text content of a basic value.
    ///
    /// Text is trimmed unless the member preserves whitespace. Empty text
    /// is null for nullable types and malformed for the others.
    pub(crate) fn parse_text(
        &mut self,
        raw: &str,
        data_type: &DataType,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        let preserve = member.is_some_and(|m| m.preserve_whitespace);
        let mut text = if preserve {
            raw.to_string()
        } else {
            raw.trim().to_string()
        };

        if member.is_some_and(|m| m.embedding == TextEmbedding::Base64) && !text.is_empty() {
            match decode_base64(&text) {
                Ok(decoded) => text = decoded,
                Err(reason) => {
                    let error = MappingError::MalformedValue {
                        text,
                        type_name: data_type.type_name(),
                        reason,
                    };
                    self.session.report_member(member, error)?;
                    return Ok(None);
                }
            }
        }
        if text.is_empty() && data_type.is_nullable() {
            return Ok(Some(Value::Null));
        }

        let format = member.and_then(|m| m.format.as_deref());
        match parse_basic(&text, data_type, format, self.session.registry) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.session
                    .report_member(member, malformed(&text, data_type, e))?;
                Ok(None)
            }
        }
    }

    /// Existing object of a compatible class, or a fresh instance.
    fn resume_or_instantiate(
        &mut self,
        desc: &TypeDescriptor,
        existing: Option<Value>,
    ) -> Result<Option<ObjectRef>> {
        let registry = self.session.registry;
        match existing {
            Some(Value::Class(object))
                if registry.is_subclass(&object.class_name(), &desc.type_name) =>
            {
                trace!("resuming existing {}", desc.type_name);
                Ok(Some(object))
            }
            _ => {
                let instance = if desc.instantiable {
                    registry.instantiate(&desc.type_name).ok()
                } else {
                    None
                };
                if instance.is_none() {
                    let error = MappingError::NotInstantiable {
                        type_name: desc.type_name.clone(),
                    };
                    self.session.report_structural(error)?;
                }
                Ok(instance)
            }
        }
    }

    fn read_object(
        &mut self,
        element: NodeId,
        desc: &TypeDescriptor,
        existing: Option<Value>,
        namespace: Option<&str>,
    ) -> Result<Option<Value>> {
        // An empty element stands for null, unless an instance could have
        // been written that way
        if existing.is_none()
            && self.doc.root() != Some(element)
            && !desc.has_escaping_members()
            && !self.may_write_blank(desc)
            && self.is_blank(element)
        {
            return Ok(Some(Value::Null));
        }
        let Some(object) = self.resume_or_instantiate(desc, existing)? else {
            return Ok(None);
        };

        let inner: Option<String> = desc
            .namespace
            .as_ref()
            .map(|ns| ns.uri.clone())
            .or_else(|| namespace.map(str::to_string));
        for m in &desc.members {
            if !m.writable {
                trace!("skipping read-only {}.{}", desc.type_name, m.name);
                continue;
            }
            self.read_member(&object, desc, m, element, inner.as_deref())?;
        }
        Ok(Some(Value::Class(object)))
    }

    /// Check whether an instance of `desc` may serialize to an empty
    /// element, which happens when every member can be omitted.
    fn may_write_blank(&self, desc: &TypeDescriptor) -> bool {
        let nulls_skipped = !self.session.serialize_nulls(desc);
        let defaults_skipped = self.session.skip_defaults(desc);
        desc.members.iter().all(|m| {
            m.skip_if_default
                || defaults_skipped
                || m.is_no_container()
                || (m.data_type.is_nullable() && (m.skip_if_null || nulls_skipped))
        })
    }

    /// Check whether an element has no children and no attributes besides
    /// metadata markers.
    fn is_blank(&self, element: NodeId) -> bool {
        let metadata = self.session.options.metadata_namespace.as_str();
        self.doc.children(element).is_empty()
            && self
                .doc
                .attributes(element)
                .iter()
                .all(|a| a.name.namespace() == Some(metadata))
    }

    fn read_collection_object(
        &mut self,
        element: NodeId,
        desc: &TypeDescriptor,
        existing: Option<Value>,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        let Some(object) = self.resume_or_instantiate(desc, existing)? else {
            return Ok(None);
        };
        let item_type = desc.item_type.clone().unwrap_or(DataType::Any);
        let items = if member.is_some_and(|m| m.is_serial()) && item_type.has_text_form() {
            let text = self.doc.text(element);
            self.serial_items(&text, &item_type, member)?
        } else {
            self.read_items(element, &item_type, namespace, member)?
        };
        *object.write().items_mut() = items;
        Ok(Some(Value::Class(object)))
    }

    fn read_member(
        &mut self,
        object: &ObjectRef,
        desc: &TypeDescriptor,
        m: &MemberDescriptor,
        element: NodeId,
        namespace: Option<&str>,
    ) -> Result<()> {
        let registry = self.session.registry;
        if m.placement == Placement::Attribute {
            let name = m.qualified_name(namespace);
            let found = self
                .doc
                .find_attribute_at(element, &m.location, namespace, &name)
                .map(|(_, text)| text.to_string());
            let Some(text) = found else {
                let error = MappingError::MissingAttribute {
                    member: m.name.clone(),
                    name: name.to_string(),
                };
                return self.missing(desc, m, error);
            };
            if let Some(value) = self.value_from_text(&text, m)? {
                self.assign(object, m, value)?;
            }
            return Ok(());
        }

        let Some(parent) = self.doc.find_location(element, &m.location, namespace) else {
            let error = MappingError::MissingElement {
                member: m.name.clone(),
                name: m.location.to_string(),
            };
            return self.missing(desc, m, error);
        };

        if m.placement == Placement::TextContent {
            if !self.doc.has_text(parent) {
                let error = MappingError::MissingText {
                    member: m.name.clone(),
                };
                return self.missing(desc, m, error);
            }
            let text = self.doc.text(parent);
            if let Some(value) = self.value_from_text(&text, m)? {
                self.assign(object, m, value)?;
            }
            return Ok(());
        }

        if m.is_no_container() && m.converter.is_none() && m.data_type.is_container() {
            if let Some(value) =
                self.read_container(parent, &m.data_type, namespace, Some(m))?
            {
                self.assign(object, m, value)?;
            }
            return Ok(());
        }

        let child_namespace = m.namespace_uri(namespace).map(str::to_string);
        let mut declared = m.data_type.clone();
        let mut found = self
            .doc
            .find_child(parent, child_namespace.as_deref(), &m.alias);
        if found.is_none() {
            for (data_type, alias) in &m.type_aliases {
                if let Some(child) =
                    self.doc.find_child(parent, child_namespace.as_deref(), alias)
                {
                    found = Some(child);
                    declared = data_type.clone();
                    break;
                }
            }
        }
        let existing = object
            .get(&m.name)
            .filter(|v| matches!(v, Value::Class(_)));

        match found {
            Some(child) => {
                let value = self.read_value(
                    child,
                    &declared,
                    existing,
                    child_namespace.as_deref(),
                    Some(m),
                )?;
                if let Some(value) = value {
                    self.assign(object, m, value)?;
                }
            }
            None => {
                let member_desc = registry.descriptor(&m.data_type);
                if member_desc.has_escaping_members()
                    && !member_desc.is_collection()
                    && !self.session.is_probing()
                {
                    let probed =
                        self.probe_member(parent, m, existing, child_namespace.as_deref())?;
                    if let Some(value) = probed {
                        return self.assign(object, m, value);
                    }
                }
                let error = MappingError::MissingElement {
                    member: m.name.clone(),
                    name: m.alias.clone(),
                };
                return self.missing(desc, m, error);
            }
        }
        Ok(())
    }

    /// Read a missing member element as if it were present and empty, so
    /// members stored outside it through `..` steps are still found.
    /// The result counts only if the attempt recorded nothing.
    fn probe_member(
        &mut self,
        parent: NodeId,
        m: &MemberDescriptor,
        existing: Option<Value>,
        namespace: Option<&str>,
    ) -> Result<Option<Value>> {
        let checkpoint = self.doc.checkpoint();
        let synthetic = self
            .doc
            .append_element(parent, QName::in_namespace(namespace, m.alias.as_str()));
        let saved = self.session.begin_probe();
        let result = self.read_value(synthetic, &m.data_type, existing, namespace, Some(m));
        let scratch = self.session.end_probe(saved);
        self.doc.rollback(checkpoint);

        let value = result?;
        trace!(
            "probed member {}: {} condition(s)",
            m.name,
            scratch.len()
        );
        Ok(value.filter(|v| scratch.is_empty() && !v.is_null()))
    }

    fn value_from_text(&mut self, text: &str, m: &MemberDescriptor) -> Result<Option<Value>> {
        if let Some(converter) = &m.converter {
            let converted = match m.placement {
                Placement::Attribute => converter.from_attribute(text),
                _ => converter.from_text(text),
            };
            return match converted {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    self.session
                        .report_member(Some(m), malformed(text, &m.data_type, e))?;
                    Ok(None)
                }
            };
        }
        if m.is_serial() && !m.data_type.has_text_form() {
            return self.serial_value(text, m);
        }
        self.parse_text(text, &m.data_type, Some(m))
    }

    /// Report a missing member unless it may legitimately be omitted.
    fn missing(
        &mut self,
        desc: &TypeDescriptor,
        m: &MemberDescriptor,
        error: MappingError,
    ) -> Result<()> {
        let omittable = m.skip_if_null
            || m.skip_if_default
            || !self.session.serialize_nulls(desc)
            || self.session.skip_defaults(desc);
        if omittable {
            trace!("{} may be omitted: {}", m.name, error);
            return Ok(());
        }
        self.session.report_member(Some(m), error)
    }

    fn assign(&mut self, object: &ObjectRef, m: &MemberDescriptor, value: Value) -> Result<()> {
        if !self.session.registry.accepts(&m.data_type, &value) {
            let error = MappingError::AssignmentFailure {
                member: m.name.clone(),
                expected: m.data_type.type_name(),
                actual: value
                    .runtime_type()
                    .map(|t| t.type_name())
                    .unwrap_or_default(),
            };
            return self.session.report_member(Some(m), error);
        }
        object.set(m.name.clone(), value);
        Ok(())
    }
}

fn decode_base64(text: &str) -> std::result::Result<String, String> {
    let bytes = STANDARD.decode(text.trim()).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

pub(crate) fn malformed(text: &str, data_type: &DataType, error: xmap_schema::Error) -> MappingError {
    let reason = match error {
        xmap_schema::Error::MalformedValue { reason, .. } => reason,
        other => other.to_string(),
    };
    MappingError::MalformedValue {
        text: text.to_string(),
        type_name: data_type.type_name(),
        reason,
    }
}
