//! Dynamic object graph.
//!
//! A [`Value`] is any mappable value. Class instances are shared through
//! [`ObjectRef`], whose identity is the allocation, so graphs may contain
//! shared and cyclic references.

use std::cell::RefCell;
use std::collections::{LinkedList, VecDeque};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use xmap_common::{Guid, TimeSpan};

use crate::{DataType, Error, FxHashMap, Result, SequenceKind};

/// Any mappable value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null reference.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Unicode scalar value.
    Char(char),
    /// Signed 8-bit integer.
    Int8(i8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 8-bit integer.
    UInt8(u8),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// String value.
    String(String),
    /// GUID value.
    Guid(Guid),
    /// Date and time.
    DateTime(NaiveDateTime),
    /// Signed duration.
    TimeSpan(TimeSpan),
    /// Type reference.
    Type(DataType),
    /// Enumeration value.
    Enum(EnumValue),
    /// Class instance.
    Class(ObjectRef),
    /// Sequence container.
    Sequence(Sequence),
    /// Array, possibly multi-dimensional.
    Array(Array),
    /// Bit vector.
    BitVector(Vec<bool>),
    /// Associative container.
    Map(Map),
    /// Key/value pair.
    Pair(Box<Pair>),
}

impl Value {
    /// Check if this value is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String value shorthand.
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Runtime type of the value. `None` for null.
    pub fn runtime_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => DataType::Boolean,
            Value::Char(_) => DataType::Char,
            Value::Int8(_) => DataType::SByte,
            Value::Int16(_) => DataType::Int16,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::UInt8(_) => DataType::Byte,
            Value::UInt16(_) => DataType::UInt16,
            Value::UInt32(_) => DataType::UInt32,
            Value::UInt64(_) => DataType::UInt64,
            Value::Float(_) => DataType::Single,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
            Value::Guid(_) => DataType::Guid,
            Value::DateTime(_) => DataType::DateTime,
            Value::TimeSpan(_) => DataType::TimeSpan,
            Value::Type(_) => DataType::Type,
            Value::Enum(e) => DataType::Enum(e.enum_name.clone()),
            Value::Class(obj) => DataType::Class(obj.class_name()),
            Value::Sequence(seq) => DataType::sequence(seq.kind(), seq.item_type.clone()),
            Value::Array(array) => DataType::array(array.item_type.clone(), array.dims.len()),
            Value::BitVector(_) => DataType::BitVector,
            Value::Map(map) => DataType::map(map.key_type.clone(), map.value_type.clone()),
            Value::Pair(pair) => DataType::pair(pair.key_type.clone(), pair.value_type.clone()),
        })
    }

    /// Try to get this value as a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get this value as an i32.
    #[inline]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int8(v) => Some(*v as i32),
            Value::Int16(v) => Some(*v as i32),
            Value::Int32(v) => Some(*v),
            Value::UInt8(v) => Some(*v as i32),
            Value::UInt16(v) => Some(*v as i32),
            _ => None,
        }
    }

    /// Try to get this value as an i64.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::UInt8(v) => Some(*v as i64),
            Value::UInt16(v) => Some(*v as i64),
            Value::UInt32(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get this value as a string.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as an object reference.
    #[inline]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Class(obj) => Some(obj),
            _ => None,
        }
    }

    /// Try to get this value as a sequence.
    #[inline]
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Try to get this value as a map.
    #[inline]
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Class(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Guid(g) => write!(f, "{}", g),
            Value::DateTime(d) => write!(f, "{}", d),
            Value::TimeSpan(t) => write!(f, "{}", t),
            Value::Type(t) => write!(f, "{}", t),
            Value::Enum(e) => write!(f, "{}", e.variants.join(", ")),
            Value::Class(obj) => write!(f, "{}", obj.class_name()),
            Value::Sequence(seq) => write!(f, "{}[{}]", seq.kind().as_str(), seq.len()),
            Value::Array(array) => write!(f, "Array[{}]", array.items.len()),
            Value::BitVector(bits) => write!(f, "BitVector[{}]", bits.len()),
            Value::Map(map) => write!(f, "Map[{}]", map.len()),
            Value::Pair(pair) => write!(f, "({}, {})", pair.key, pair.value),
        }
    }
}

/// A value of a registered enumeration.
///
/// Flags enumerations may hold several variants; plain ones hold exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub enum_name: Arc<str>,
    pub variants: Vec<String>,
}

impl EnumValue {
    /// Single variant of an enumeration.
    pub fn new(enum_name: &str, variant: impl Into<String>) -> Self {
        Self {
            enum_name: Arc::from(enum_name),
            variants: vec![variant.into()],
        }
    }

    /// Combination of flags.
    pub fn flags<I, S>(enum_name: &str, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enum_name: Arc::from(enum_name),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}

/// Storage of a [`Sequence`], one real container per kind.
#[derive(Debug, Clone)]
pub enum SequenceItems {
    List(Vec<Value>),
    Queue(VecDeque<Value>),
    /// Bottom first; the top is the last element.
    Stack(Vec<Value>),
    LinkedList(LinkedList<Value>),
    Set(Vec<Value>),
}

/// A sequence container.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub item_type: DataType,
    items: SequenceItems,
}

impl Sequence {
    /// Create an empty sequence.
    pub fn new(kind: SequenceKind, item_type: DataType) -> Self {
        let items = match kind {
            SequenceKind::List => SequenceItems::List(Vec::new()),
            SequenceKind::Queue => SequenceItems::Queue(VecDeque::new()),
            SequenceKind::Stack => SequenceItems::Stack(Vec::new()),
            SequenceKind::LinkedList => SequenceItems::LinkedList(LinkedList::new()),
            SequenceKind::Set => SequenceItems::Set(Vec::new()),
        };
        Self { item_type, items }
    }

    /// Create a sequence by inserting each item in order.
    ///
    /// Duplicate set items are skipped.
    pub fn from_items(
        kind: SequenceKind,
        item_type: DataType,
        items: impl IntoIterator<Item = Value>,
    ) -> Self {
        let mut seq = Self::new(kind, item_type);
        for item in items {
            let _ = seq.insert(item);
        }
        seq
    }

    /// `List<item_type>` from items.
    pub fn list(item_type: DataType, items: impl IntoIterator<Item = Value>) -> Self {
        Self::from_items(SequenceKind::List, item_type, items)
    }

    /// Container kind.
    pub fn kind(&self) -> SequenceKind {
        match self.items {
            SequenceItems::List(_) => SequenceKind::List,
            SequenceItems::Queue(_) => SequenceKind::Queue,
            SequenceItems::Stack(_) => SequenceKind::Stack,
            SequenceItems::LinkedList(_) => SequenceKind::LinkedList,
            SequenceItems::Set(_) => SequenceKind::Set,
        }
    }

    /// Underlying container.
    pub fn items(&self) -> &SequenceItems {
        &self.items
    }

    /// Insert with the container's own primitive: append, enqueue, push,
    /// push at the tail, or add if absent.
    pub fn insert(&mut self, item: Value) -> Result<()> {
        match &mut self.items {
            SequenceItems::List(items) => items.push(item),
            SequenceItems::Queue(items) => items.push_back(item),
            SequenceItems::Stack(items) => items.push(item),
            SequenceItems::LinkedList(items) => items.push_back(item),
            SequenceItems::Set(items) => {
                if items.contains(&item) {
                    return Err(Error::Insert(format!("set already contains {}", item)));
                }
                items.push(item);
            }
        }
        Ok(())
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        match &self.items {
            SequenceItems::List(items) | SequenceItems::Stack(items) | SequenceItems::Set(items) => {
                items.len()
            }
            SequenceItems::Queue(items) => items.len(),
            SequenceItems::LinkedList(items) => items.len(),
        }
    }

    /// Check if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items in enumeration order. Stacks enumerate from the top.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match &self.items {
            SequenceItems::List(items) | SequenceItems::Set(items) => Box::new(items.iter()),
            SequenceItems::Stack(items) => Box::new(items.iter().rev()),
            SequenceItems::Queue(items) => Box::new(items.iter()),
            SequenceItems::LinkedList(items) => Box::new(items.iter()),
        }
    }

    /// Remove and return the top of a stack or the front of any other kind.
    pub fn pop(&mut self) -> Option<Value> {
        match &mut self.items {
            SequenceItems::Stack(items) => items.pop(),
            SequenceItems::List(items) | SequenceItems::Set(items) => {
                (!items.is_empty()).then(|| items.remove(0))
            }
            SequenceItems::Queue(items) => items.pop_front(),
            SequenceItems::LinkedList(items) => items.pop_front(),
        }
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        if self.item_type != other.item_type || self.kind() != other.kind() || self.len() != other.len() {
            return false;
        }
        match (&self.items, &other.items) {
            (SequenceItems::Set(a), SequenceItems::Set(b)) => a.iter().all(|item| b.contains(item)),
            _ => self.iter().zip(other.iter()).all(|(a, b)| a == b),
        }
    }
}

/// An array stored row-major; the first dimension is the most significant.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub item_type: DataType,
    dims: Vec<usize>,
    items: Vec<Value>,
}

impl Array {
    /// One-dimensional array.
    pub fn new(item_type: DataType, items: Vec<Value>) -> Self {
        Self {
            item_type,
            dims: vec![items.len()],
            items,
        }
    }

    /// Array with explicit dimensions.
    pub fn with_dims(item_type: DataType, dims: Vec<usize>, items: Vec<Value>) -> Result<Self> {
        let expected: usize = dims.iter().product();
        if dims.is_empty() || expected != items.len() {
            return Err(Error::DimensionMismatch {
                expected,
                actual: items.len(),
            });
        }
        Ok(Self {
            item_type,
            dims,
            items,
        })
    }

    /// Extent of each dimension.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Items in row-major order.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Item at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<&Value> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut linear = 0;
        for (&i, &extent) in index.iter().zip(&self.dims) {
            if i >= extent {
                return None;
            }
            linear = linear * extent + i;
        }
        self.items.get(linear)
    }
}

/// An associative container. Keys are unique; equality ignores order.
#[derive(Debug, Clone)]
pub struct Map {
    pub key_type: DataType,
    pub value_type: DataType,
    entries: Vec<(Value, Value)>,
    /// Entry positions by key text. Keys sharing a text are told apart by
    /// equality.
    index: FxHashMap<String, Vec<usize>>,
}

impl Map {
    /// Create an empty map.
    pub fn new(key_type: DataType, value_type: DataType) -> Self {
        Self {
            key_type,
            value_type,
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Insert an entry. Fails on a null or duplicate key.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<()> {
        if key.is_null() {
            return Err(Error::Insert("map key is null".to_string()));
        }
        if self.position(&key).is_some() {
            return Err(Error::Insert(format!("duplicate map key {}", key)));
        }
        self.index
            .entry(bucket(&key))
            .or_default()
            .push(self.entries.len());
        self.entries.push((key, value));
        Ok(())
    }

    /// Look up a value by key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.index
            .get(&bucket(key))?
            .iter()
            .copied()
            .find(|&i| self.entries[i].0 == *key)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Index key of a map key. Equal values always share a bucket.
fn bucket(key: &Value) -> String {
    match key {
        // 0.0 and -0.0 are equal but print differently
        Value::Float(v) if *v == 0.0 => "0".to_string(),
        Value::Double(v) if *v == 0.0 => "0".to_string(),
        other => other.to_string(),
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type
            && self.value_type == other.value_type
            && self.len() == other.len()
            && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

/// A key/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub key_type: DataType,
    pub value_type: DataType,
    pub key: Value,
    pub value: Value,
}

/// A class instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    class: Arc<str>,
    fields: FxHashMap<String, Value>,
    items: Vec<Value>,
}

impl Object {
    /// Create an instance with no field values.
    pub fn new(class: &str) -> Self {
        Self {
            class: Arc::from(class),
            fields: FxHashMap::default(),
            items: Vec::new(),
        }
    }

    /// Class name.
    pub fn class_name(&self) -> &Arc<str> {
        &self.class
    }

    /// Field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// All field values.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Items of a collection class.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Mutable items of a collection class.
    pub fn items_mut(&mut self) -> &mut Vec<Value> {
        &mut self.items
    }

    /// Builder-style item append.
    pub fn with_item(mut self, item: impl Into<Value>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Wrap into a shared reference.
    pub fn into_ref(self) -> ObjectRef {
        ObjectRef::new(self)
    }
}

thread_local! {
    /// Object pairs currently being compared, for cyclic graphs.
    static COMPARING: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
    /// Objects currently being formatted, for cyclic graphs.
    static FORMATTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Shared reference to a class instance.
///
/// Identity is the allocation: clones refer to the same object.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    /// Wrap an object.
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Identity of the referenced object.
    #[inline]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Check whether two references point to the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Lock for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.read()
    }

    /// Lock for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.write()
    }

    /// Class name of the referenced object.
    pub fn class_name(&self) -> Arc<str> {
        self.0.read().class.clone()
    }

    /// Clone of a field value.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.read().get(name).cloned()
    }

    /// Set a field value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.write().set(name, value);
    }
}

impl PartialEq for ObjectRef {
    /// Deep equality. A pair already under comparison counts as equal, so
    /// cyclic graphs compare structurally.
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let key = (self.id(), other.id());
        let active = COMPARING.with(|c| {
            let mut c = c.borrow_mut();
            if c.contains(&key) {
                true
            } else {
                c.push(key);
                false
            }
        });
        if active {
            return true;
        }

        let equal = *self.0.read() == *other.0.read();
        COMPARING.with(|c| {
            c.borrow_mut().retain(|k| *k != key);
        });
        equal
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id();
        let active = FORMATTING.with(|v| {
            let mut v = v.borrow_mut();
            if v.contains(&id) {
                true
            } else {
                v.push(id);
                false
            }
        });
        if active {
            return write!(f, "ObjectRef({} <cycle>)", self.class_name());
        }

        let result = f.debug_tuple("ObjectRef").field(&*self.0.read()).finish();
        FORMATTING.with(|v| {
            v.borrow_mut().retain(|x| *x != id);
        });
        result
    }
}
