use std::{
    any::{TypeId, type_name},
    marker::PhantomData,
    sync::Arc,
};

use super::{SerializationOptions, Serializer, unexpected};
use crate::{
    Bson,
    class_map::{ClassMap, DISCRIMINATOR, Mapped},
    error::{Error, Result},
    registry::Registry,
};

/// Serializes a [`Mapped`] type member by member as described by its [`ClassMap`].
///
/// The value is always read back as exactly `T`. A document whose discriminator names a class
/// derived from `T` is rejected; store such values in a [`Polymorphic`](super::Polymorphic) or
/// [`Object`](super::Object) slot instead.
pub struct ClassSerializer<T> {
    class_map: Arc<ClassMap>,
    class: PhantomData<fn() -> T>,
}

impl<T: Mapped> ClassSerializer<T> {
    pub fn new(class_map: Arc<ClassMap>) -> Self {
        Self {
            class_map,
            class: PhantomData,
        }
    }

    pub fn class_map(&self) -> &Arc<ClassMap> {
        &self.class_map
    }
}

impl<T: Mapped> Serializer<T> for ClassSerializer<T> {
    fn serialize(
        &self,
        registry: &Registry,
        value: &T,
        _options: &SerializationOptions,
    ) -> Result<Bson> {
        self.class_map
            .serialize(registry, value, TypeId::of::<T>())
            .map(Bson::Document)
    }

    fn deserialize(
        &self,
        registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<T> {
        let Bson::Document(doc) = bson else {
            return Err(unexpected::<T>(&bson));
        };
        if let Some(discriminator) = doc.get(DISCRIMINATOR) {
            let actual = registry.lookup_actual_type(TypeId::of::<T>(), discriminator)?;
            if actual.type_info().id() != TypeId::of::<T>() {
                return Err(Error::format(format!(
                    "the document holds a {} which cannot be stored in a {}; use Polymorphic<{}> \
                     or Object for the slot",
                    actual.type_info().short_name(),
                    type_name::<T>(),
                    self.class_map.type_info().short_name(),
                )));
            }
        }
        if self.class_map.is_abstract() {
            return Err(Error::format(format!(
                "cannot create an instance of abstract class {}",
                self.class_map.type_info().short_name()
            )));
        }
        let mut value = T::default();
        self.class_map.deserialize_into(registry, &mut value, doc)?;
        Ok(value)
    }
}
