use std::{any::type_name, marker::PhantomData};

use super::{SerializationOptions, Serializer, unexpected, unsupported_representation};
use crate::{
    Bson,
    error::{Error, Result},
    registry::Registry,
    spec::ElementType,
};

/// A C-like enum that can be stored by its numeric value or its variant name. Implemented by
/// the [`bson_enum!`](crate::bson_enum) macro.
pub trait BsonEnum: Sized + Copy + Send + Sync + 'static {
    /// The numeric value of this variant.
    fn to_i64(self) -> i64;

    /// The variant with the given numeric value.
    fn from_i64(value: i64) -> Option<Self>;

    /// The name of this variant.
    fn name(self) -> &'static str;

    /// The variant with the given name.
    fn from_name(name: &str) -> Option<Self>;
}

/// Serializes a [`BsonEnum`] as `Int32` (the default), `Int64` or `String`.
pub struct EnumSerializer<E>(PhantomData<fn() -> E>);

impl<E> EnumSerializer<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EnumSerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BsonEnum> Serializer<E> for EnumSerializer<E> {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &E,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::Int32) {
            ElementType::Int32 => i32::try_from(value.to_i64()).map(Bson::Int32).map_err(|_| {
                Error::format(format!(
                    "{}::{} does not fit in an Int32",
                    type_name::<E>(),
                    value.name()
                ))
            }),
            ElementType::Int64 => Ok(Bson::Int64(value.to_i64())),
            ElementType::String => Ok(Bson::String(value.name().to_string())),
            other => Err(unsupported_representation::<E>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<E> {
        let found = match &bson {
            Bson::Int32(i) => E::from_i64((*i).into()),
            Bson::Int64(i) => E::from_i64(*i),
            Bson::String(name) => E::from_name(name),
            other => return Err(unexpected::<E>(other)),
        };
        found.ok_or_else(|| {
            Error::format(format!("{bson} is not a valid value for {}", type_name::<E>()))
        })
    }
}
