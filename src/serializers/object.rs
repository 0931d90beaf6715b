use std::{
    any::{Any, TypeId, type_name},
    fmt::{self, Debug},
    marker::PhantomData,
    sync::Arc,
};

use super::{BsonValue, SerializationOptions, Serializer, TypeInfo, ValueKind, unexpected};
use crate::{
    Bson,
    Document,
    class_map::{ClassMap, DISCRIMINATOR, Mapped},
    error::{Error, Result},
    registry::Registry,
    spec::BinarySubtype,
};

/// A type-erased [`BsonValue`].
pub trait ObjectValue: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn clone_object(&self) -> Box<dyn ObjectValue>;

    fn eq_object(&self, other: &dyn ObjectValue) -> bool;

    fn type_info(&self) -> TypeInfo;

    fn is_null_value(&self) -> bool;

    /// The class map of the value's runtime type, if it is a mapped class.
    fn class_map(&self, registry: &Registry) -> Option<Result<Arc<ClassMap>>>;

    /// Serializes the value with the serializer the registry resolves for its runtime type.
    fn serialize_object(
        &self,
        registry: &Registry,
        options: &SerializationOptions,
    ) -> Result<Bson>;
}

impl<T: BsonValue> ObjectValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_object(&self) -> Box<dyn ObjectValue> {
        Box::new(self.clone())
    }

    fn eq_object(&self, other: &dyn ObjectValue) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn is_null_value(&self) -> bool {
        self.is_null()
    }

    fn class_map(&self, registry: &Registry) -> Option<Result<Arc<ClassMap>>> {
        T::class_map(registry)
    }

    fn serialize_object(
        &self,
        registry: &Registry,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        registry.lookup_serializer::<T>()?.serialize(registry, self, options)
    }
}

impl Clone for Box<dyn ObjectValue> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}

/// A slot that may hold a value of any [`BsonValue`] type, or nothing.
///
/// Mapped classes stored in an `Object` are written with a discriminator so that reading the
/// document back produces the same runtime type. Other values are read back as the natural Rust
/// type of their BSON type, so an `i16` written through an `Object` comes back as an `i32`.
///
/// ```
/// use bson_mapping::{Bson, Registry, serializers::{BsonValue, Object, SerializationOptions}};
///
/// let registry = Registry::new();
/// let serializer = Object::default_serializer(&registry)?;
/// let options = SerializationOptions::new();
///
/// let bson = serializer.serialize(&registry, &Object::new(7i16), &options)?;
/// assert_eq!(bson, Bson::Int32(7));
/// let back = serializer.deserialize(&registry, bson, &options)?;
/// assert_eq!(back.downcast_ref::<i32>(), Some(&7));
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Object(Option<Box<dyn ObjectValue>>);

impl Object {
    pub fn new<T: BsonValue>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn from_boxed(value: Box<dyn ObjectValue>) -> Self {
        Self(Some(value))
    }

    pub const fn null() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<&dyn ObjectValue> {
        self.0.as_deref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref()?.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_mut()?.as_any_mut().downcast_mut()
    }

    /// Takes the value out if it has type `T`.
    pub fn downcast<T: Any>(self) -> std::result::Result<T, Self> {
        match self.0 {
            Some(value) if value.as_any().is::<T>() => match value.into_any().downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => Err(Self(None)),
            },
            other => Err(Self(other)),
        }
    }

    pub fn type_info(&self) -> Option<TypeInfo> {
        self.0.as_ref().map(|value| value.type_info())
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => a.eq_object(b.as_ref()),
            (None, None) => true,
            _ => false,
        }
    }
}

impl BsonValue for Object {
    const KIND: ValueKind = ValueKind::Object;
    const NULLABLE: bool = true;

    fn default_serializer(_registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(ObjectSerializer))
    }

    fn is_null(&self) -> bool {
        self.0.as_ref().is_none_or(|value| value.is_null_value())
    }
}

/// Serializes [`Object`] slots.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectSerializer;

impl Serializer<Object> for ObjectSerializer {
    fn serialize(
        &self,
        registry: &Registry,
        value: &Object,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        let Some(value) = value.get() else {
            return Ok(Bson::Null);
        };
        match value.class_map(registry) {
            Some(class_map) => class_map?
                .serialize(registry, value.as_any(), TypeId::of::<Object>())
                .map(Bson::Document),
            None => value.serialize_object(registry, options),
        }
    }

    fn deserialize(
        &self,
        registry: &Registry,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<Object> {
        let value: Box<dyn ObjectValue> = match bson {
            Bson::Null => return Ok(Object::null()),
            Bson::Int32(i) => Box::new(i),
            Bson::Int64(i) => Box::new(i),
            Bson::Double(d) => Box::new(d),
            Bson::String(s) => Box::new(s),
            Bson::Boolean(b) => Box::new(b),
            Bson::DateTime(dt) => Box::new(dt),
            Bson::ObjectId(oid) => Box::new(oid),
            Bson::Binary(binary)
                if binary.subtype == BinarySubtype::Uuid && binary.bytes.len() == 16 =>
            {
                Box::new(binary.to_uuid()?)
            }
            Bson::Binary(binary) => Box::new(binary),
            Bson::RegularExpression(regex) => Box::new(regex),
            Bson::Timestamp(ts) => Box::new(ts),
            Bson::Decimal128(d) => Box::new(d),
            Bson::Array(array) => {
                let items = options.items();
                let array = array
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.deserialize(registry, item, items)
                            .map_err(|e| e.with_index(i))
                    })
                    .collect::<Result<Vec<Object>>>()?;
                Box::new(array)
            }
            Bson::Document(doc) => match doc.get(DISCRIMINATOR) {
                Some(discriminator) => {
                    let class_map =
                        registry.lookup_actual_type(TypeId::of::<Object>(), discriminator)?;
                    create_instance(registry, &class_map, doc)?
                }
                None => Box::new(doc),
            },
            other => Box::new(other),
        };
        Ok(Object(Some(value)))
    }
}

fn create_instance(
    registry: &Registry,
    class_map: &ClassMap,
    doc: Document,
) -> Result<Box<dyn ObjectValue>> {
    if class_map.is_abstract() {
        return Err(Error::format(format!(
            "cannot create an instance of abstract class {}",
            class_map.type_info().short_name()
        )));
    }
    let mut value = class_map.create();
    class_map.deserialize_into(registry, value.as_any_mut(), doc)?;
    Ok(value)
}

/// A slot whose nominal type is the mapped class `B` but which may hold an instance of any class
/// derived from `B`. The runtime type is written as a discriminator and restored on read.
pub struct Polymorphic<B> {
    value: Box<dyn ObjectValue>,
    base: PhantomData<fn() -> B>,
}

impl<B: Mapped> Polymorphic<B> {
    /// Wraps `value`, which must be `B` or a class that inherits from `B`.
    pub fn new<D: Mapped>(value: D) -> Self {
        Self {
            value: Box::new(value),
            base: PhantomData,
        }
    }

    pub fn get(&self) -> &dyn ObjectValue {
        self.value.as_ref()
    }

    pub fn is<D: Any>(&self) -> bool {
        self.value.as_any().is::<D>()
    }

    pub fn downcast_ref<D: Any>(&self) -> Option<&D> {
        self.value.as_any().downcast_ref()
    }

    pub fn downcast_mut<D: Any>(&mut self) -> Option<&mut D> {
        self.value.as_any_mut().downcast_mut()
    }

    /// The `B` part of the held value.
    pub fn base<'a>(&'a self, registry: &Registry) -> Result<&'a B> {
        if let Some(base) = self.value.as_any().downcast_ref::<B>() {
            return Ok(base);
        }
        let class_map = self
            .value
            .class_map(registry)
            .ok_or_else(|| not_derived::<B>(self.value.type_info()))??;
        class_map
            .project(self.value.as_any(), TypeId::of::<B>())
            .and_then(|base| base.downcast_ref::<B>())
            .ok_or_else(|| not_derived::<B>(self.value.type_info()))
    }
}

fn not_derived<B>(actual: TypeInfo) -> Error {
    Error::format(format!(
        "{} is not {} or a class derived from it",
        actual.name(),
        type_name::<B>()
    ))
}

impl<B: Mapped> Default for Polymorphic<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B> Clone for Polymorphic<B> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone_object(),
            base: PhantomData,
        }
    }
}

impl<B> PartialEq for Polymorphic<B> {
    fn eq(&self, other: &Self) -> bool {
        self.value.eq_object(other.value.as_ref())
    }
}

impl<B> Debug for Polymorphic<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Polymorphic").field(&self.value).finish()
    }
}

impl<B: Mapped> BsonValue for Polymorphic<B> {
    const KIND: ValueKind = ValueKind::Class;

    fn default_serializer(_registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(PolymorphicSerializer::<B>::new()))
    }
}

/// Serializes [`Polymorphic`] slots.
pub struct PolymorphicSerializer<B>(PhantomData<fn() -> B>);

impl<B> PolymorphicSerializer<B> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for PolymorphicSerializer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Mapped> Serializer<Polymorphic<B>> for PolymorphicSerializer<B> {
    fn serialize(
        &self,
        registry: &Registry,
        value: &Polymorphic<B>,
        _options: &SerializationOptions,
    ) -> Result<Bson> {
        let actual = value.value.type_info();
        let class_map = value
            .value
            .class_map(registry)
            .ok_or_else(|| not_derived::<B>(actual))??;
        if !class_map.is_assignable_to(TypeId::of::<B>()) {
            return Err(not_derived::<B>(actual));
        }
        class_map
            .serialize(registry, value.value.as_any(), TypeId::of::<B>())
            .map(Bson::Document)
    }

    fn deserialize(
        &self,
        registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<Polymorphic<B>> {
        let Bson::Document(doc) = bson else {
            return Err(unexpected::<B>(&bson));
        };
        let base = registry.lookup_class_map::<B>()?;
        let class_map = match doc.get(DISCRIMINATOR) {
            Some(discriminator) => registry.lookup_actual_type(TypeId::of::<B>(), discriminator)?,
            None => base,
        };
        Ok(Polymorphic {
            value: create_instance(registry, &class_map, doc)?,
            base: PhantomData,
        })
    }
}
