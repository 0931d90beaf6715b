use std::sync::Arc;

use super::{BsonValue, SerializationOptions, Serializer, ValueKind, unexpected};
use crate::{
    Bson,
    error::{Error, Result},
    registry::Registry,
};

/// Serializes `Option<T>` with `None` stored as BSON null.
pub struct OptionSerializer<T> {
    inner: Arc<dyn Serializer<T>>,
}

impl<T> OptionSerializer<T> {
    pub fn new(inner: Arc<dyn Serializer<T>>) -> Self {
        Self { inner }
    }
}

impl<T: 'static> Serializer<Option<T>> for OptionSerializer<T> {
    fn serialize(
        &self,
        registry: &Registry,
        value: &Option<T>,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match value {
            Some(value) => self.inner.serialize(registry, value, options),
            None => Ok(Bson::Null),
        }
    }

    fn deserialize(
        &self,
        registry: &Registry,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<Option<T>> {
        match bson {
            Bson::Null => Ok(None),
            bson => self.inner.deserialize(registry, bson, options).map(Some),
        }
    }
}

impl<T: BsonValue> BsonValue for Option<T> {
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;

    fn default_serializer(registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(OptionSerializer::new(registry.lookup_serializer::<T>()?)))
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }
}

/// Serializes `Vec<T>` as a BSON array, applying the item options to every element. Nested vectors
/// produce nested arrays.
pub struct VecSerializer<T> {
    item: Arc<dyn Serializer<T>>,
}

impl<T> VecSerializer<T> {
    pub fn new(item: Arc<dyn Serializer<T>>) -> Self {
        Self { item }
    }
}

impl<T: 'static> Serializer<Vec<T>> for VecSerializer<T> {
    fn serialize(
        &self,
        registry: &Registry,
        value: &Vec<T>,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        let items = options.items();
        value
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.item
                    .serialize(registry, item, items)
                    .map_err(|e| e.with_index(i))
            })
            .collect::<Result<_>>()
            .map(Bson::Array)
    }

    fn deserialize(
        &self,
        registry: &Registry,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<Vec<T>> {
        let Bson::Array(array) = bson else {
            return Err(unexpected::<Vec<T>>(&bson));
        };
        let items = options.items();
        array
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                self.item
                    .deserialize(registry, item, items)
                    .map_err(|e| e.with_index(i))
            })
            .collect()
    }
}

impl<T: BsonValue> BsonValue for Vec<T> {
    const KIND: ValueKind = ValueKind::Array;

    fn default_serializer(registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(VecSerializer::new(registry.lookup_serializer::<T>()?)))
    }
}

/// Serializes a tuple as a fixed-length BSON array.
pub struct TupleSerializer<T> {
    items: T,
}

macro_rules! tuple {
    ($len:literal; $($name:ident : $index:tt),+) => {
        impl<$($name: BsonValue),+> TupleSerializer<($(Arc<dyn Serializer<$name>>,)+)> {
            pub fn new(items: ($(Arc<dyn Serializer<$name>>,)+)) -> Self {
                Self { items }
            }
        }

        impl<$($name: BsonValue),+> Serializer<($($name,)+)>
            for TupleSerializer<($(Arc<dyn Serializer<$name>>,)+)>
        {
            fn serialize(
                &self,
                registry: &Registry,
                value: &($($name,)+),
                options: &SerializationOptions,
            ) -> Result<Bson> {
                let items = options.items();
                Ok(Bson::Array(vec![$(
                    self.items.$index
                        .serialize(registry, &value.$index, items)
                        .map_err(|e| e.with_index($index))?,
                )+]))
            }

            fn deserialize(
                &self,
                registry: &Registry,
                bson: Bson,
                options: &SerializationOptions,
            ) -> Result<($($name,)+)> {
                let array = match bson {
                    Bson::Array(array) if array.len() == $len => array,
                    Bson::Array(array) => {
                        return Err(Error::format(format!(
                            "expected an array of {} items, found {}",
                            $len,
                            array.len()
                        )));
                    }
                    other => return Err(unexpected::<($($name,)+)>(&other)),
                };
                let items = options.items();
                let mut array = array.into_iter();
                Ok(($({
                    let item = array.next().unwrap_or(Bson::Null);
                    self.items.$index
                        .deserialize(registry, item, items)
                        .map_err(|e| e.with_index($index))?
                },)+))
            }
        }

        impl<$($name: BsonValue),+> BsonValue for ($($name,)+) {
            const KIND: ValueKind = ValueKind::Array;

            fn default_serializer(registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
                Ok(Arc::new(TupleSerializer::<($(Arc<dyn Serializer<$name>>,)+)>::new((
                    $(registry.lookup_serializer::<$name>()?,)+
                ))))
            }
        }
    };
}

tuple!(2; A: 0, B: 1);
tuple!(3; A: 0, B: 1, C: 2);
tuple!(4; A: 0, B: 1, C: 2, D: 3);

