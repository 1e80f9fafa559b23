//! Validated, shareable set of class and enum definitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    ClassDef, DataType, EnumDef, EnumValue, Error, FxHashMap, Object, ObjectRef, Pair, Result,
    TypeInspector, Value,
};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Registered classes and enums.
///
/// Created by [`SchemaBuilder::build`](crate::SchemaBuilder::build). Each
/// registry has a unique id that keys the process-wide descriptor cache.
#[derive(Debug)]
pub struct TypeRegistry {
    id: u64,
    classes: FxHashMap<Arc<str>, Arc<ClassDef>>,
    enums: FxHashMap<Arc<str>, Arc<EnumDef>>,
    inspector: Arc<dyn TypeInspector>,
}

impl TypeRegistry {
    pub(crate) fn new(
        classes: FxHashMap<Arc<str>, Arc<ClassDef>>,
        enums: FxHashMap<Arc<str>, Arc<EnumDef>>,
        inspector: Arc<dyn TypeInspector>,
    ) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            classes,
            enums,
            inspector,
        }
    }

    /// Unique id of this registry.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Class definition by name.
    pub fn class(&self, name: &str) -> Option<&Arc<ClassDef>> {
        self.classes.get(name)
    }

    /// Enum definition by name.
    pub fn enum_def(&self, name: &str) -> Option<&Arc<EnumDef>> {
        self.enums.get(name)
    }

    /// All class definitions.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassDef>> {
        self.classes.values()
    }

    /// The member inspector.
    pub fn inspector(&self) -> &Arc<dyn TypeInspector> {
        &self.inspector
    }

    /// Resolve a fully-qualified type name.
    pub fn resolve_type_name(&self, name: &str) -> Option<DataType> {
        DataType::parse(name, &|n| {
            if let Some(class) = self.classes.get(n) {
                Some(DataType::Class(class.name.clone()))
            } else {
                self.enums.get(n).map(|e| DataType::Enum(e.name.clone()))
            }
        })
    }

    /// Element name of a type, as reported by the inspector.
    pub fn type_alias(&self, data_type: &DataType) -> String {
        self.inspector.type_alias(self, data_type)
    }

    /// Check whether `class` equals or derives from `base`.
    pub fn is_subclass(&self, class: &str, base: &str) -> bool {
        let mut current = Some(class);
        // Bases are validated acyclic at build time
        while let Some(name) = current {
            if name == base {
                return true;
            }
            current = self.classes.get(name).and_then(|c| c.base.as_deref());
        }
        false
    }

    /// Check whether a value of type `actual` may be stored where `declared`
    /// is expected.
    pub fn is_assignable(&self, declared: &DataType, actual: &DataType) -> bool {
        match (declared, actual) {
            (DataType::Any, _) => true,
            (DataType::Class(base), DataType::Class(class)) => self.is_subclass(class, base),
            (DataType::Sequence(k1, i1), DataType::Sequence(k2, i2)) => {
                k1 == k2 && self.is_assignable(i1, i2)
            }
            (DataType::Array { item: i1, rank: r1 }, DataType::Array { item: i2, rank: r2 }) => {
                r1 == r2 && self.is_assignable(i1, i2)
            }
            (DataType::Map(k1, v1), DataType::Map(k2, v2))
            | (DataType::Pair(k1, v1), DataType::Pair(k2, v2)) => {
                self.is_assignable(k1, k2) && self.is_assignable(v1, v2)
            }
            (declared, actual) => declared == actual,
        }
    }

    /// Check whether a value may be stored where `declared` is expected.
    /// Null is accepted only by nullable types.
    pub fn accepts(&self, declared: &DataType, value: &Value) -> bool {
        match value.runtime_type() {
            None => declared.is_nullable(),
            Some(actual) => self.is_assignable(declared, &actual),
        }
    }

    /// Chain of class definitions from the root base down to `class`.
    pub fn class_chain(&self, class: &str) -> Vec<Arc<ClassDef>> {
        let mut chain = Vec::new();
        let mut current = self.classes.get(class);
        while let Some(def) = current {
            chain.push(def.clone());
            current = def.base.as_deref().and_then(|b| self.classes.get(b));
        }
        chain.reverse();
        chain
    }

    /// Create a fresh instance with every member at its default value.
    pub fn instantiate(&self, class: &str) -> Result<ObjectRef> {
        let def = self
            .classes
            .get(class)
            .ok_or_else(|| Error::UnknownType(class.to_string()))?;
        if !def.instantiable {
            return Err(Error::NotInstantiable(class.to_string()));
        }

        let mut object = Object::new(&def.name);
        for def in self.class_chain(class) {
            for member in &def.members {
                let value = match &member.default_value {
                    Some(value) => value.clone(),
                    None => self.zero_value(&member.data_type),
                };
                object.set(member.name.clone(), value);
            }
        }
        Ok(object.into_ref())
    }

    /// Value of a member that was never assigned.
    ///
    /// Scalars get zero values; references and containers are null.
    pub fn zero_value(&self, data_type: &DataType) -> Value {
        match data_type {
            DataType::Boolean => Value::Bool(false),
            DataType::Char => Value::Char('\0'),
            DataType::SByte => Value::Int8(0),
            DataType::Int16 => Value::Int16(0),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Byte => Value::UInt8(0),
            DataType::UInt16 => Value::UInt16(0),
            DataType::UInt32 => Value::UInt32(0),
            DataType::UInt64 => Value::UInt64(0),
            DataType::Single => Value::Float(0.0),
            DataType::Double => Value::Double(0.0),
            DataType::Guid => Value::Guid(xmap_common::Guid::EMPTY),
            DataType::TimeSpan => Value::TimeSpan(xmap_common::TimeSpan::ZERO),
            DataType::DateTime => Value::DateTime(chrono::NaiveDateTime::default()),
            DataType::Enum(name) => self
                .enums
                .get(name)
                .and_then(|e| e.variants.first())
                .map(|v| Value::Enum(EnumValue::new(name, v.name.clone())))
                .unwrap_or(Value::Null),
            DataType::Pair(key, value) => Value::Pair(Box::new(Pair {
                key_type: (**key).clone(),
                value_type: (**value).clone(),
                key: self.zero_value(key),
                value: self.zero_value(value),
            })),
            _ => Value::Null,
        }
    }
}
