//! Per-type serializers that convert between Rust values and [`Bson`].
//!
//! Every type that can appear in a mapped class implements [`BsonValue`], which names the
//! [`Serializer`] used for it unless the [`Registry`] or a member map overrides it. Many
//! serializers accept a *representation* through [`SerializationOptions`]:
//!
//! ```
//! use bson_mapping::{Bson, Registry, serializers::{BsonValue, SerializationOptions}, spec::ElementType};
//!
//! let registry = Registry::new();
//! let serializer = i64::default_serializer(&registry)?;
//! let options = SerializationOptions::new().representation(ElementType::String);
//! assert_eq!(serializer.serialize(&registry, &42i64, &options)?, Bson::String("42".into()));
//! assert_eq!(serializer.deserialize(&registry, Bson::Int32(7), &options)?, 7);
//! # Ok::<(), bson_mapping::error::Error>(())
//! ```

mod class;
mod collections;
mod dictionary;
mod enums;
mod numeric;
mod object;
mod primitives;

use std::{
    any::{Any, TypeId, type_name},
    fmt::Debug,
    sync::Arc,
};

pub use self::{
    class::ClassSerializer,
    collections::{OptionSerializer, TupleSerializer, VecSerializer},
    dictionary::{DictionaryRepresentation, DictionarySerializer},
    enums::{BsonEnum, EnumSerializer},
    numeric::{Numeric, NumericSerializer},
    object::{Object, ObjectSerializer, ObjectValue, Polymorphic, PolymorphicSerializer},
    primitives::{
        BinarySerializer,
        BoolSerializer,
        BsonSerializer,
        CharSerializer,
        DateTimeSerializer,
        Decimal128Serializer,
        DocumentSerializer,
        DurationSerializer,
        ObjectIdSerializer,
        RegexSerializer,
        StringSerializer,
        TimestampSerializer,
        UuidSerializer,
    },
};
use crate::{
    Bson,
    class_map::ClassMap,
    error::{Error, Result},
    registry::Registry,
    spec::ElementType,
    uuid::UuidRepresentation,
};

/// Converts values of type `T` to and from [`Bson`].
pub trait Serializer<T>: Send + Sync + 'static {
    /// Converts `value` to a BSON value.
    fn serialize(
        &self,
        registry: &Registry,
        value: &T,
        options: &SerializationOptions,
    ) -> Result<Bson>;

    /// Reads a `T` back from a BSON value.
    fn deserialize(
        &self,
        registry: &Registry,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<T>;
}

/// The broad shape of a [`BsonValue`], used by conventions to decide which members a rule
/// applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ValueKind {
    /// A single value such as a number, string or date.
    Scalar,
    /// A 128-bit identifier whose layout is chosen by a [`UuidRepresentation`].
    Guid,
    /// A C-like enum whose variants are stored as numbers or names.
    Enum,
    /// A sequence stored as a BSON array.
    Array,
    /// A key-value map whose layout is chosen by a [`DictionaryRepresentation`].
    Dictionary,
    /// A raw [`Document`](crate::Document) or [`Bson`] value.
    Document,
    /// A type described by a class map.
    Class,
    /// A slot that may hold a value of any type.
    Object,
}

/// A Rust type that can be stored in a BSON document.
pub trait BsonValue: Any + Clone + PartialEq + Debug + Send + Sync {
    /// The shape of this type.
    const KIND: ValueKind = ValueKind::Scalar;

    /// Whether values of this type can be null.
    const NULLABLE: bool = false;

    /// The serializer used for this type when neither the registry nor the member map names
    /// another one.
    fn default_serializer(registry: &Registry) -> Result<Arc<dyn Serializer<Self>>>;

    /// Whether this value is the null value of its type.
    fn is_null(&self) -> bool {
        false
    }

    /// The class map describing this type, if it is a mapped class.
    #[doc(hidden)]
    fn class_map(_registry: &Registry) -> Option<Result<Arc<ClassMap>>> {
        None
    }
}

/// Identifies a [`BsonValue`] type at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    kind: ValueKind,
    nullable: bool,
}

impl TypeInfo {
    pub fn of<T: BsonValue>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: T::KIND,
            nullable: T::NULLABLE,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name without its module path or generic arguments, e.g. `Dog` for
    /// `my_app::model::Dog`.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

pub(crate) fn short_type_name(name: &str) -> &str {
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

/// Options passed to a [`Serializer`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct SerializationOptions {
    /// The BSON type a value is stored as. `None` selects the serializer's default.
    pub representation: Option<ElementType>,

    /// Permit numeric conversions that overflow the target type.
    pub allow_overflow: bool,

    /// Permit numeric conversions that lose precision.
    pub allow_truncation: bool,

    /// The binary layout used for UUIDs.
    pub uuid_representation: UuidRepresentation,

    /// How key-value maps are stored.
    pub dictionary_representation: DictionaryRepresentation,

    /// Options for the keys of a map.
    pub key_options: Option<Box<SerializationOptions>>,

    /// Options for the items of a sequence or the values of a map.
    pub item_options: Option<Box<SerializationOptions>>,
}

static DEFAULT_OPTIONS: SerializationOptions = SerializationOptions::new();

impl Default for SerializationOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializationOptions {
    pub const fn new() -> Self {
        Self {
            representation: None,
            allow_overflow: false,
            allow_truncation: false,
            uuid_representation: UuidRepresentation::Standard,
            dictionary_representation: DictionaryRepresentation::Dynamic,
            key_options: None,
            item_options: None,
        }
    }

    pub fn representation(mut self, representation: ElementType) -> Self {
        self.representation = Some(representation);
        self
    }

    pub fn allow_overflow(mut self, allow: bool) -> Self {
        self.allow_overflow = allow;
        self
    }

    pub fn allow_truncation(mut self, allow: bool) -> Self {
        self.allow_truncation = allow;
        self
    }

    pub fn uuid_representation(mut self, representation: UuidRepresentation) -> Self {
        self.uuid_representation = representation;
        self
    }

    pub fn dictionary_representation(mut self, representation: DictionaryRepresentation) -> Self {
        self.dictionary_representation = representation;
        self
    }

    pub fn key_options(mut self, options: SerializationOptions) -> Self {
        self.key_options = Some(Box::new(options));
        self
    }

    pub fn item_options(mut self, options: SerializationOptions) -> Self {
        self.item_options = Some(Box::new(options));
        self
    }

    pub(crate) fn keys(&self) -> &SerializationOptions {
        self.key_options.as_deref().unwrap_or(&DEFAULT_OPTIONS)
    }

    pub(crate) fn items(&self) -> &SerializationOptions {
        self.item_options.as_deref().unwrap_or(&DEFAULT_OPTIONS)
    }
}

// A value of an unexpected BSON type was handed to the serializer for `T`.
pub(crate) fn unexpected<T>(bson: &Bson) -> Error {
    Error::format(format!(
        "cannot deserialize {} from a BSON {:?}",
        type_name::<T>(),
        bson.element_type()
    ))
}

pub(crate) fn unsupported_representation<T>(representation: ElementType) -> Error {
    Error::format(format!(
        "{} cannot be represented as BSON {representation:?}",
        type_name::<T>()
    ))
}
