//! Member discovery.

use std::fmt;

use xmap_dom::sanitize_name;

use crate::{
    ClassDef, DataType, FieldSelection, MemberDef, MemberDescriptor, MemberKind, TypeRegistry,
    Visibility,
};

/// Decides which members of a class are serialized and what types are
/// called in XML.
///
/// Called once per type; the results are cached in descriptors.
/// Substitute it with [`SchemaBuilder::inspector`](crate::SchemaBuilder::inspector)
/// to change what is considered serializable.
pub trait TypeInspector: fmt::Debug + Send + Sync {
    /// Serializable members of `class`, base class members first.
    fn members(
        &self,
        registry: &TypeRegistry,
        class: &ClassDef,
        include_private_from_base: bool,
    ) -> Vec<MemberDescriptor>;

    /// Element name of a type.
    fn type_alias(&self, registry: &TypeRegistry, data_type: &DataType) -> String;
}

/// Applies the class's field selection policy along the inheritance chain.
///
/// A member redeclared in a derived class replaces the inherited one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultInspector;

impl DefaultInspector {
    fn is_selected(
        policy: FieldSelection,
        member: &MemberDef,
        inherited: bool,
        include_private_from_base: bool,
    ) -> bool {
        if member.excluded {
            return false;
        }
        if inherited && member.visibility == Visibility::Private && !include_private_from_base {
            return false;
        }
        if member.explicitly_serializable {
            return true;
        }
        match policy {
            FieldSelection::AllFields => true,
            FieldSelection::PublicPropertiesOnly => {
                member.kind == MemberKind::Property && member.visibility == Visibility::Public
            }
            FieldSelection::AttributedFieldsOnly => false,
        }
    }
}

impl TypeInspector for DefaultInspector {
    fn members(
        &self,
        registry: &TypeRegistry,
        class: &ClassDef,
        include_private_from_base: bool,
    ) -> Vec<MemberDescriptor> {
        let chain = registry.class_chain(&class.name);
        let mut selected: Vec<&MemberDef> = Vec::new();

        for def in &chain {
            let inherited = def.name != class.name;
            for member in &def.members {
                let keep = Self::is_selected(
                    class.field_selection,
                    member,
                    inherited,
                    include_private_from_base,
                );
                match selected.iter().position(|m| m.name == member.name) {
                    Some(pos) if keep => selected[pos] = member,
                    Some(pos) => {
                        selected.remove(pos);
                    }
                    None if keep => selected.push(member),
                    None => {}
                }
            }
        }

        selected
            .into_iter()
            .enumerate()
            .map(|(index, member)| MemberDescriptor::from_def(registry, member, index))
            .collect()
    }

    fn type_alias(&self, registry: &TypeRegistry, data_type: &DataType) -> String {
        let alias = match data_type {
            DataType::Class(name) => registry
                .class(name)
                .and_then(|c| c.alias.clone())
                .unwrap_or_else(|| name.to_string()),
            DataType::Sequence(kind, item) => {
                format!("{}Of{}", kind.as_str(), self.type_alias(registry, item))
            }
            DataType::Array { item, rank: 1 } => {
                format!("ArrayOf{}", self.type_alias(registry, item))
            }
            DataType::Array { item, rank } => {
                format!("Array{}DOf{}", rank, self.type_alias(registry, item))
            }
            DataType::Map(key, value) => format!(
                "MapOf{}And{}",
                self.type_alias(registry, key),
                self.type_alias(registry, value)
            ),
            DataType::Pair(key, value) => format!(
                "PairOf{}And{}",
                self.type_alias(registry, key),
                self.type_alias(registry, value)
            ),
            other => other.type_name(),
        };
        sanitize_name(&alias)
    }
}
