//! Schema validation and registry construction.

use std::sync::Arc;

use log::debug;

use crate::{
    ClassDef, DataType, DefaultInspector, EnumDef, Error, FxHashMap, FxHashSet, Result,
    TypeInspector, TypeRegistry,
};

/// Collects definitions and validates them into a [`TypeRegistry`].
///
/// # Example
///
/// ```
/// use xmap_schema::{ClassDef, DataType, MemberDef, SchemaBuilder};
///
/// let mut builder = SchemaBuilder::new();
/// builder.add_class(
///     ClassDef::new("Person")
///         .member(MemberDef::new("Name", DataType::String))
///         .member(MemberDef::new("Age", DataType::Int32).attribute()),
/// );
/// let registry = builder.build().unwrap();
/// assert!(registry.class("Person").is_some());
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    classes: Vec<ClassDef>,
    enums: Vec<EnumDef>,
    inspector: Option<Arc<dyn TypeInspector>>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class.
    pub fn add_class(&mut self, class: ClassDef) -> &mut Self {
        self.classes.push(class);
        self
    }

    /// Register an enumeration.
    pub fn add_enum(&mut self, def: EnumDef) -> &mut Self {
        self.enums.push(def);
        self
    }

    /// Replace the member inspector.
    pub fn inspector(&mut self, inspector: Arc<dyn TypeInspector>) -> &mut Self {
        self.inspector = Some(inspector);
        self
    }

    /// Validate the definitions and build the registry.
    pub fn build(&self) -> Result<TypeRegistry> {
        let mut names = FxHashSet::default();
        for name in self
            .classes
            .iter()
            .map(|c| &c.name)
            .chain(self.enums.iter().map(|e| &e.name))
        {
            check_type_name(name)?;
            if !names.insert(name.clone()) {
                return Err(Error::DuplicateType(name.to_string()));
            }
        }

        let classes: FxHashMap<Arc<str>, Arc<ClassDef>> = self
            .classes
            .iter()
            .map(|c| (c.name.clone(), Arc::new(c.clone())))
            .collect();
        let enums: FxHashMap<Arc<str>, Arc<EnumDef>> = self
            .enums
            .iter()
            .map(|e| (e.name.clone(), Arc::new(e.clone())))
            .collect();

        for class in &self.classes {
            check_inheritance(&classes, class)?;

            let mut members = FxHashSet::default();
            for member in &class.members {
                if !members.insert(member.name.as_str()) {
                    return Err(Error::DuplicateMember {
                        class: class.name.to_string(),
                        member: member.name.clone(),
                    });
                }
                check_type_refs(&classes, &enums, &member.data_type)?;
                for (data_type, _) in &member.type_aliases {
                    check_type_refs(&classes, &enums, data_type)?;
                }
            }
            if let Some(item) = &class.collection_of {
                check_type_refs(&classes, &enums, item)?;
            }
        }

        for def in &self.enums {
            let mut variants = FxHashSet::default();
            for variant in &def.variants {
                if !variants.insert(variant.text()) {
                    return Err(Error::DuplicateMember {
                        class: def.name.to_string(),
                        member: variant.text().to_string(),
                    });
                }
            }
        }

        debug!(
            "built schema with {} classes and {} enums",
            classes.len(),
            enums.len()
        );
        let inspector = self
            .inspector
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultInspector));
        Ok(TypeRegistry::new(classes, enums, inspector))
    }
}

fn check_type_name(name: &str) -> Result<()> {
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    let valid_rest = name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.'));
    if !valid_start || !valid_rest || DataType::is_builtin_name(name) {
        return Err(Error::InvalidTypeName(name.to_string()));
    }
    Ok(())
}

fn check_inheritance(classes: &FxHashMap<Arc<str>, Arc<ClassDef>>, class: &ClassDef) -> Result<()> {
    let mut seen = FxHashSet::default();
    let mut current = class;
    seen.insert(current.name.clone());
    while let Some(base) = &current.base {
        let def = classes.get(base.as_str()).ok_or_else(|| Error::UnknownBase {
            class: current.name.to_string(),
            base: base.clone(),
        })?;
        if !seen.insert(def.name.clone()) {
            return Err(Error::InheritanceCycle(class.name.to_string()));
        }
        current = def.as_ref();
    }
    Ok(())
}

fn check_type_refs(
    classes: &FxHashMap<Arc<str>, Arc<ClassDef>>,
    enums: &FxHashMap<Arc<str>, Arc<EnumDef>>,
    data_type: &DataType,
) -> Result<()> {
    match data_type {
        DataType::Class(name) if !classes.contains_key(name) => {
            Err(Error::UnknownType(name.to_string()))
        }
        DataType::Enum(name) if !enums.contains_key(name) => {
            Err(Error::UnknownType(name.to_string()))
        }
        DataType::Sequence(_, item) | DataType::Array { item, .. } => {
            check_type_refs(classes, enums, item)
        }
        DataType::Map(key, value) | DataType::Pair(key, value) => {
            check_type_refs(classes, enums, key)?;
            check_type_refs(classes, enums, value)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemberDef;

    #[test]
    fn test_valid_schema() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_enum(EnumDef::new("Kind", ["A", "B"]))
            .add_class(ClassDef::new("Node").member(MemberDef::new(
                "Children",
                DataType::list(DataType::class("Node")),
            )))
            .add_class(
                ClassDef::new("Leaf")
                    .base("Node")
                    .member(MemberDef::new("Kind", DataType::enumeration("Kind"))),
            );
        let registry = builder.build().unwrap();
        assert!(registry.is_subclass("Leaf", "Node"));
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_class(ClassDef::new("A"))
            .add_enum(EnumDef::new("A", ["X"]));
        assert!(matches!(builder.build(), Err(Error::DuplicateType(_))));

        let mut builder = SchemaBuilder::new();
        builder.add_class(
            ClassDef::new("A")
                .member(MemberDef::new("X", DataType::Int32))
                .member(MemberDef::new("X", DataType::String)),
        );
        assert!(matches!(builder.build(), Err(Error::DuplicateMember { .. })));
    }

    #[test]
    fn test_rejects_bad_names() {
        for name in ["Int32", "List", "1abc", "a b", ""] {
            let mut builder = SchemaBuilder::new();
            builder.add_class(ClassDef::new(name));
            assert!(
                matches!(builder.build(), Err(Error::InvalidTypeName(_))),
                "{name}"
            );
        }
    }

    #[test]
    fn test_rejects_bad_inheritance() {
        let mut builder = SchemaBuilder::new();
        builder.add_class(ClassDef::new("A").base("Missing"));
        assert!(matches!(builder.build(), Err(Error::UnknownBase { .. })));

        let mut builder = SchemaBuilder::new();
        builder
            .add_class(ClassDef::new("A").base("B"))
            .add_class(ClassDef::new("B").base("A"));
        assert!(matches!(builder.build(), Err(Error::InheritanceCycle(_))));
    }

    #[test]
    fn test_rejects_unknown_member_types() {
        let mut builder = SchemaBuilder::new();
        builder.add_class(ClassDef::new("A").member(MemberDef::new(
            "M",
            DataType::map(DataType::String, DataType::class("Nope")),
        )));
        assert!(matches!(builder.build(), Err(Error::UnknownType(_))));
    }
}
