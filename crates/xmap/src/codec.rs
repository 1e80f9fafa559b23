//! Collection, dictionary and pair encoding.
//!
//! Linear containers use one of three strategies:
//!
//! - recursive: one child element per item inside the member's element
//! - recursive without container: item elements directly at the member's
//!   location
//! - serial: items of a basic type joined into one text value
//!
//! Dictionaries write one entry element per pair; keys and values are
//! placed as attributes, text content or nested elements.

use xmap_dom::{sanitize_name, NodeId, QName};
use xmap_schema::{
    parse_basic, Array, CollectionStrategy, DataType, DictionaryConfig, Map, MemberDescriptor,
    NodePlacement, Pair, Sequence, SequenceKind, Value,
};

use crate::de::{malformed, DeserializeContext};
use crate::error::{MappingError, Result};
use crate::ser::SerializeContext;

/// Placement of one side of a pair.
struct PairPart<'c> {
    placement: NodePlacement,
    alias: String,
    format: Option<&'c str>,
}

fn pair_parts(config: &DictionaryConfig) -> (PairPart<'_>, PairPart<'_>) {
    (
        PairPart {
            placement: config.key_placement,
            alias: sanitize_name(&config.key_alias),
            format: config.key_format.as_deref(),
        },
        PairPart {
            placement: config.value_placement,
            alias: sanitize_name(&config.value_alias),
            format: config.value_format.as_deref(),
        },
    )
}

fn writes_text(part: &PairPart<'_>, declared: &DataType) -> bool {
    part.placement != NodePlacement::Element && declared.has_text_form()
}

fn formats_element(part: &PairPart<'_>, declared: &DataType) -> bool {
    part.format.is_some() && declared.is_basic()
}

fn member_name(member: Option<&MemberDescriptor>) -> String {
    member.map(|m| m.name.clone()).unwrap_or_default()
}

impl SerializeContext<'_> {
    /// Items of a linear container in enumeration order.
    pub(crate) fn linear_items(&self, value: &Value) -> Option<Vec<Value>> {
        match value {
            Value::Sequence(seq) => Some(seq.iter().cloned().collect()),
            Value::Array(array) => Some(array.items().to_vec()),
            Value::BitVector(bits) => Some(bits.iter().map(|b| Value::Bool(*b)).collect()),
            Value::Class(object) => {
                let is_collection = self
                    .session
                    .registry
                    .class(&object.class_name())
                    .is_some_and(|c| c.collection_of.is_some());
                is_collection.then(|| object.read().items().to_vec())
            }
            _ => None,
        }
    }

    /// Items joined by the member's separator.
    pub(crate) fn serial_text(
        &mut self,
        items: &[Value],
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<String>> {
        let config = member.and_then(|m| m.collection.clone()).unwrap_or_default();
        let format = member.and_then(|m| m.format.as_deref());
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            if let Some(text) = self.format_value(item, format, member)? {
                parts.push(text);
            }
        }
        Ok(Some(parts.join(&config.separator)))
    }

    /// Write a sequence, array, bit vector or map into `element`.
    pub(crate) fn write_container(
        &mut self,
        value: &Value,
        element: NodeId,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        let (items, item_type) = match value {
            Value::Map(map) => return self.write_map(map, element, namespace, member),
            Value::Sequence(seq) => (seq.iter().cloned().collect::<Vec<_>>(), seq.item_type.clone()),
            Value::Array(array) if array.rank() > 1 => {
                if !member.is_some_and(|m| m.is_no_container()) {
                    self.write_dims(element, array.dims())?;
                    return self.write_items(array.items(), &array.item_type, element, namespace, member);
                }
                // Without a container the first item carries the dimensions
                let before = self.doc.child_elements(element).count();
                self.write_items(array.items(), &array.item_type, element, namespace, member)?;
                let first = self.doc.child_elements(element).nth(before);
                if let Some(first) = first {
                    self.write_dims(first, array.dims())?;
                }
                return Ok(());
            }
            Value::Array(array) => (array.items().to_vec(), array.item_type.clone()),
            Value::BitVector(bits) => (
                bits.iter().map(|b| Value::Bool(*b)).collect(),
                DataType::Boolean,
            ),
            _ => return Ok(()),
        };
        self.write_items(&items, &item_type, element, namespace, member)
    }

    fn write_dims(&mut self, element: NodeId, dims: &[usize]) -> Result<()> {
        if self.session.options.suppress_metadata {
            return Ok(());
        }
        self.use_metadata()?;
        let text = dims
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let name = self.session.dims_name();
        self.doc.set_attribute(element, name, text)?;
        Ok(())
    }

    /// Write linear items into `element` using the member's strategy.
    pub(crate) fn write_items(
        &mut self,
        items: &[Value],
        item_type: &DataType,
        element: NodeId,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        let config = member.and_then(|m| m.collection.clone()).unwrap_or_default();
        if config.strategy == CollectionStrategy::Serial && item_type.has_text_form() {
            if let Some(text) = self.serial_text(items, member)? {
                self.append_text(element, text, None);
            }
            return Ok(());
        }

        let registry = self.session.registry;
        let item_name = config.item_name.as_deref().map(sanitize_name);
        for item in items {
            let substituted = item
                .runtime_type()
                .filter(|actual| actual != item_type)
                .and_then(|actual| member.and_then(|m| m.alias_for(&actual)).map(str::to_string));
            let name = match (&item_name, &substituted) {
                (Some(name), _) => name.clone(),
                (None, Some(alias)) => alias.clone(),
                (None, None) => registry.type_alias(item_type),
            };
            let child = self.doc.append_element(element, QName::in_namespace(namespace, name));
            if item_name.is_some() || substituted.is_none() {
                self.write_real_type(child, item_type, item)?;
            }
            self.write_value(item, item_type, child, namespace, None)?;
        }
        Ok(())
    }

    fn write_map(
        &mut self,
        map: &Map,
        element: NodeId,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        let config = member.and_then(|m| m.dictionary.clone()).unwrap_or_default();
        let (key_part, value_part) = pair_parts(&config);
        let entry_name = sanitize_name(&config.entry_name);
        for (key, value) in map.iter() {
            let entry = self
                .doc
                .append_element(element, QName::in_namespace(namespace, entry_name.as_str()));
            self.write_part(key, &map.key_type, entry, &key_part, namespace, member)?;
            self.write_part(value, &map.value_type, entry, &value_part, namespace, member)?;
        }
        Ok(())
    }

    /// Write a standalone pair into `element`.
    pub(crate) fn write_pair(
        &mut self,
        pair: &Pair,
        element: NodeId,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        let config = member.and_then(|m| m.dictionary.clone()).unwrap_or_default();
        let (key_part, value_part) = pair_parts(&config);
        self.write_part(&pair.key, &pair.key_type, element, &key_part, namespace, member)?;
        self.write_part(&pair.value, &pair.value_type, element, &value_part, namespace, member)
    }

    fn write_part(
        &mut self,
        value: &Value,
        declared: &DataType,
        entry: NodeId,
        part: &PairPart<'_>,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<()> {
        if writes_text(part, declared) {
            let Some(text) = self.format_value(value, part.format, member)? else {
                return Ok(());
            };
            if part.placement == NodePlacement::Attribute {
                let name = QName::new(part.alias.as_str());
                if self.doc.attribute(entry, &name).is_some() {
                    let error = MappingError::DuplicateAttribute {
                        name: name.to_string(),
                    };
                    return self.session.report_member(member, error);
                }
                self.doc.add_attribute(entry, name, text)?;
            } else if !text.is_empty() {
                self.doc.append_text(entry, text);
            }
            return Ok(());
        }

        let child = self
            .doc
            .append_element(entry, QName::in_namespace(namespace, part.alias.as_str()));
        if formats_element(part, declared) {
            if let Some(text) = self.format_value(value, part.format, member)? {
                self.append_text(child, text, None);
            }
            return Ok(());
        }
        self.write_real_type(child, declared, value)?;
        self.write_value(value, declared, child, namespace, None)
    }
}

impl DeserializeContext<'_, '_> {
    /// Read a sequence, array, bit vector or map from `element`.
    pub(crate) fn read_container(
        &mut self,
        element: NodeId,
        data_type: &DataType,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        if let DataType::Map(key_type, value_type) = data_type {
            return self.read_map(element, key_type, value_type, namespace, member);
        }
        let item_type = data_type.item_type().cloned().unwrap_or(DataType::Any);
        let items = if member.is_some_and(|m| m.is_serial()) && item_type.has_text_form() {
            let text = self.doc.text(element);
            self.serial_items(&text, &item_type, member)?
        } else {
            self.read_items(element, &item_type, namespace, member)?
        };
        let marker = if member.is_some_and(|m| m.is_no_container()) {
            self.item_elements(element, &item_type, member).first().map(|(e, _)| *e)
        } else {
            Some(element)
        };
        self.build_container(marker, data_type, items, member)
    }

    /// Child elements of `element` that hold items, with their declared type.
    ///
    /// With an item name, or without a container, only elements carrying
    /// the item name or a type alias of the member are items. Otherwise
    /// every child element is one.
    fn item_elements(
        &self,
        element: NodeId,
        item_type: &DataType,
        member: Option<&MemberDescriptor>,
    ) -> Vec<(NodeId, DataType)> {
        let item_name = member
            .and_then(|m| m.collection.as_ref())
            .and_then(|c| c.item_name.as_deref())
            .map(sanitize_name);
        let filtered = item_name.is_some() || member.is_some_and(|m| m.is_no_container());
        let expected = item_name.unwrap_or_else(|| self.session.registry.type_alias(item_type));

        self.doc
            .child_elements(element)
            .filter_map(|child| {
                let local = self.doc.local_name(child);
                match member.and_then(|m| m.type_for_alias(local)) {
                    Some(data_type) => Some((child, data_type.clone())),
                    None if filtered && local != expected => None,
                    None => Some((child, item_type.clone())),
                }
            })
            .collect()
    }

    /// Read the items held by `element`.
    pub(crate) fn read_items(
        &mut self,
        element: NodeId,
        item_type: &DataType,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Vec<Value>> {
        let registry = self.session.registry;
        let mut items = Vec::new();
        for (child, declared) in self.item_elements(element, item_type, member) {
            if !registry.is_assignable(item_type, &declared) {
                let error = MappingError::TypeMismatch {
                    expected: item_type.type_name(),
                    actual: declared.type_name(),
                };
                self.session.report_structural(error)?;
                continue;
            }
            if let Some(value) = self.read_value(child, &declared, None, namespace, None)? {
                items.push(value);
            }
        }
        Ok(items)
    }

    /// Split serial text into parsed items. Empty tokens are skipped.
    pub(crate) fn serial_items(
        &mut self,
        text: &str,
        item_type: &DataType,
        member: Option<&MemberDescriptor>,
    ) -> Result<Vec<Value>> {
        let registry = self.session.registry;
        let config = member.and_then(|m| m.collection.clone()).unwrap_or_default();
        let format = member.and_then(|m| m.format.as_deref());

        let mut tokens: Vec<&str> = if config.separator.is_empty() {
            vec![text]
        } else {
            text.split(config.separator.as_str()).collect()
        };
        if config.whitespace_separates || config.separator.trim().is_empty() {
            tokens = tokens.into_iter().flat_map(str::split_whitespace).collect();
        }

        let mut items = Vec::with_capacity(tokens.len());
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match parse_basic(token, item_type, format, registry) {
                Ok(value) => items.push(value),
                Err(e) => self
                    .session
                    .report_member(member, malformed(token, item_type, e))?,
            }
        }
        Ok(items)
    }

    /// Parse a serial member stored as an attribute or text content.
    pub(crate) fn serial_value(
        &mut self,
        text: &str,
        member: &MemberDescriptor,
    ) -> Result<Option<Value>> {
        let registry = self.session.registry;
        let Some(item_type) = member.item_type(registry) else {
            return Ok(None);
        };
        let items = self.serial_items(text, &item_type, Some(member))?;
        match &member.data_type {
            DataType::Class(name) => match registry.instantiate(name) {
                Ok(object) => {
                    *object.write().items_mut() = items;
                    Ok(Some(Value::Class(object)))
                }
                Err(_) => {
                    let error = MappingError::NotInstantiable {
                        type_name: name.to_string(),
                    };
                    self.session.report_structural(error)?;
                    Ok(None)
                }
            },
            other => self.build_container(None, other, items, Some(member)),
        }
    }

    /// Turn read items into a container of `data_type`. Items the container
    /// rejects are reported and dropped.
    pub(crate) fn build_container(
        &mut self,
        element: Option<NodeId>,
        data_type: &DataType,
        items: Vec<Value>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        let container = data_type.type_name();
        match data_type {
            DataType::Sequence(kind, item_type) => {
                let mut seq = Sequence::new(*kind, (**item_type).clone());
                // Stacks were written top first
                let ordered: Vec<Value> = if *kind == SequenceKind::Stack {
                    items.into_iter().rev().collect()
                } else {
                    items
                };
                for item in ordered {
                    if let Err(e) = seq.insert(item) {
                        self.session
                            .report_insertion(member, container.clone(), e.to_string())?;
                    }
                }
                Ok(Some(Value::Sequence(seq)))
            }
            DataType::Array { item, rank } => {
                let dims = self.array_dims(element, *rank, items.len());
                match Array::with_dims((**item).clone(), dims, items) {
                    Ok(array) => Ok(Some(Value::Array(array))),
                    Err(e) => {
                        self.session
                            .report_insertion(member, container, e.to_string())?;
                        Ok(None)
                    }
                }
            }
            DataType::BitVector => {
                let mut bits = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_bool() {
                        Some(bit) => bits.push(bit),
                        None => self.session.report_insertion(
                            member,
                            container.clone(),
                            format!("'{}' is not a boolean", item),
                        )?,
                    }
                }
                Ok(Some(Value::BitVector(bits)))
            }
            _ => Ok(None),
        }
    }

    /// Dimensions from the metadata attribute, or `[count, 1, ...]`.
    fn array_dims(&self, element: Option<NodeId>, rank: usize, count: usize) -> Vec<usize> {
        let rank = rank.max(1);
        let marked = element.and_then(|e| self.doc.attribute(e, &self.session.dims_name()));
        if let Some(text) = marked {
            let dims: Option<Vec<usize>> = text.split(',').map(|d| d.trim().parse().ok()).collect();
            if let Some(dims) = dims.filter(|d| d.len() == rank) {
                return dims;
            }
        }
        let mut dims = vec![1; rank];
        dims[0] = count;
        dims
    }

    fn read_map(
        &mut self,
        element: NodeId,
        key_type: &DataType,
        value_type: &DataType,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        let config = member.and_then(|m| m.dictionary.clone()).unwrap_or_default();
        let (key_part, value_part) = pair_parts(&config);
        let entry_name = sanitize_name(&config.entry_name);
        let container = DataType::map(key_type.clone(), value_type.clone()).type_name();

        let entries: Vec<NodeId> = self
            .doc
            .children_named(element, namespace, &entry_name)
            .collect();
        let mut map = Map::new(key_type.clone(), value_type.clone());
        for entry in entries {
            let key = self.read_part(entry, key_type, &key_part, namespace, member)?;
            let value = self.read_part(entry, value_type, &value_part, namespace, member)?;
            let (Some(key), Some(value)) = (key, value) else {
                continue;
            };
            if let Err(e) = map.insert(key, value) {
                self.session
                    .report_insertion(member, container.clone(), e.to_string())?;
            }
        }
        Ok(Some(Value::Map(map)))
    }

    /// Read a standalone pair from `element`.
    pub(crate) fn read_pair(
        &mut self,
        element: NodeId,
        data_type: &DataType,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        let DataType::Pair(key_type, value_type) = data_type else {
            return Ok(None);
        };
        let config = member.and_then(|m| m.dictionary.clone()).unwrap_or_default();
        let (key_part, value_part) = pair_parts(&config);
        let key = self.read_part(element, key_type, &key_part, namespace, member)?;
        let value = self.read_part(element, value_type, &value_part, namespace, member)?;
        Ok(Some(Value::Pair(Box::new(Pair {
            key_type: (**key_type).clone(),
            value_type: (**value_type).clone(),
            key: key.unwrap_or_default(),
            value: value.unwrap_or_default(),
        }))))
    }

    fn read_part(
        &mut self,
        entry: NodeId,
        declared: &DataType,
        part: &PairPart<'_>,
        namespace: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        if writes_text(part, declared) {
            let text = if part.placement == NodePlacement::Attribute {
                match self.doc.attribute(entry, &QName::new(part.alias.as_str())) {
                    Some(text) => text.to_string(),
                    None => {
                        let error = MappingError::MissingAttribute {
                            member: member_name(member),
                            name: part.alias.clone(),
                        };
                        self.session.report_member(member, error)?;
                        return Ok(None);
                    }
                }
            } else {
                self.doc.text(entry)
            };
            return self.parse_part(&text, declared, part.format, member);
        }

        let Some(child) = self.doc.find_child(entry, namespace, &part.alias) else {
            let error = MappingError::MissingElement {
                member: member_name(member),
                name: part.alias.clone(),
            };
            self.session.report_member(member, error)?;
            return Ok(None);
        };
        if formats_element(part, declared) {
            let text = self.doc.text(child);
            return self.parse_part(&text, declared, part.format, member);
        }
        self.read_value(child, declared, None, namespace, None)
    }

    fn parse_part(
        &mut self,
        text: &str,
        declared: &DataType,
        format: Option<&str>,
        member: Option<&MemberDescriptor>,
    ) -> Result<Option<Value>> {
        let text = text.trim();
        if text.is_empty() && declared.is_nullable() {
            return Ok(Some(Value::Null));
        }
        match parse_basic(text, declared, format, self.session.registry) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.session
                    .report_member(member, malformed(text, declared, e))?;
                Ok(None)
            }
        }
    }
}
