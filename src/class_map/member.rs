use std::{
    any::{Any, type_name},
    sync::Arc,
};

use once_cell::sync::OnceCell;

use crate::{
    Bson,
    error::{Error, Result},
    registry::Registry,
    serializers::{BsonValue, ObjectValue, SerializationOptions, Serializer},
};

pub(crate) type Projection =
    Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

pub(crate) type ProjectionMut =
    Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;

pub(crate) type ShouldSerialize = Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// Reaches the embedded base value of a derived class.
#[derive(Clone)]
pub(crate) struct BaseLink {
    pub(crate) projection: Projection,
    pub(crate) projection_mut: ProjectionMut,
}

fn erase<F>(f: F) -> F
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    f
}

fn erase_mut<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
{
    f
}

impl BaseLink {
    pub(crate) fn new<T: Any, B: Any>(
        get: impl Fn(&T) -> &B + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut B + Send + Sync + 'static,
    ) -> Self {
        Self {
            projection: Arc::new(erase(move |owner| {
                owner.downcast_ref::<T>().map(|owner| get(owner) as &dyn Any)
            })),
            projection_mut: Arc::new(erase_mut(move |owner| {
                owner
                    .downcast_mut::<T>()
                    .map(|owner| get_mut(owner) as &mut dyn Any)
            })),
        }
    }

    /// Wraps a predicate over the base type so that it accepts the derived type.
    pub(crate) fn predicate(&self, inner: ShouldSerialize) -> ShouldSerialize {
        let projection = self.projection.clone();
        Arc::new(move |owner: &dyn Any| projection(owner).is_some_and(|base| inner(base)))
    }
}

/// Type-erased access to one member of a mapped class.
pub(crate) trait MemberAccess: Send + Sync {
    fn can_read(&self) -> bool;

    fn can_write(&self) -> bool;

    fn get_boxed(&self, owner: &dyn Any) -> Option<Box<dyn ObjectValue>>;

    fn is_null(&self, owner: &dyn Any) -> bool;

    fn equals(&self, owner: &dyn Any, value: &dyn ObjectValue) -> bool;

    fn set_boxed(&self, owner: &mut dyn Any, value: Box<dyn ObjectValue>) -> Result<()>;

    fn serialize(
        &self,
        registry: &Registry,
        owner: &dyn Any,
        options: &SerializationOptions,
    ) -> Result<Bson>;

    fn deserialize(
        &self,
        registry: &Registry,
        owner: &mut dyn Any,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<()>;

    /// A fresh accessor for one frozen member map, using `serializer` (an
    /// `Arc<dyn Serializer<M>>`) instead of the registry's serializer for the member type.
    fn instantiate(
        &self,
        serializer: Option<&Arc<dyn Any + Send + Sync>>,
    ) -> Result<Arc<dyn MemberAccess>>;
}

pub(crate) enum Getter<T, M> {
    Ref(Arc<dyn Fn(&T) -> &M + Send + Sync>),
    Value(Arc<dyn Fn(&T) -> M + Send + Sync>),
    None,
}

impl<T, M> Clone for Getter<T, M> {
    fn clone(&self) -> Self {
        match self {
            Self::Ref(get) => Self::Ref(get.clone()),
            Self::Value(get) => Self::Value(get.clone()),
            Self::None => Self::None,
        }
    }
}

pub(crate) enum Setter<T, M> {
    Ref(Arc<dyn Fn(&mut T) -> &mut M + Send + Sync>),
    Value(Arc<dyn Fn(&mut T, M) + Send + Sync>),
    None,
}

impl<T, M> Clone for Setter<T, M> {
    fn clone(&self) -> Self {
        match self {
            Self::Ref(set) => Self::Ref(set.clone()),
            Self::Value(set) => Self::Value(set.clone()),
            Self::None => Self::None,
        }
    }
}

/// Accessor for a member of type `M` declared on class `T`.
pub(crate) struct TypedMember<T, M> {
    name: &'static str,
    getter: Getter<T, M>,
    setter: Setter<T, M>,
    serializer: OnceCell<Arc<dyn Serializer<M>>>,
}

impl<T: Any, M: BsonValue> TypedMember<T, M> {
    pub(crate) fn new(name: &'static str, getter: Getter<T, M>, setter: Setter<T, M>) -> Self {
        Self {
            name,
            getter,
            setter,
            serializer: OnceCell::new(),
        }
    }

    fn with_value<R>(&self, owner: &dyn Any, f: impl FnOnce(&M) -> R) -> Option<R> {
        let owner = owner.downcast_ref::<T>()?;
        match &self.getter {
            Getter::Ref(get) => Some(f(get(owner))),
            Getter::Value(get) => Some(f(&get(owner))),
            Getter::None => None,
        }
    }

    fn set(&self, owner: &mut dyn Any, value: M) -> Result<()> {
        let owner = owner
            .downcast_mut::<T>()
            .ok_or_else(|| self.wrong_owner())?;
        match &self.setter {
            Setter::Ref(get_mut) => *get_mut(owner) = value,
            Setter::Value(set) => set(owner, value),
            Setter::None => {
                return Err(Error::unsupported(format!(
                    "member {} of {} cannot be written",
                    self.name,
                    type_name::<T>()
                )));
            }
        }
        Ok(())
    }

    fn wrong_owner(&self) -> Error {
        Error::unsupported(format!(
            "member {} can only be accessed on a {}",
            self.name,
            type_name::<T>()
        ))
    }

    fn serializer(&self, registry: &Registry) -> Result<&Arc<dyn Serializer<M>>> {
        self.serializer
            .get_or_try_init(|| registry.lookup_serializer::<M>())
    }
}

impl<T: Any + Send + Sync, M: BsonValue> MemberAccess for TypedMember<T, M> {
    fn can_read(&self) -> bool {
        !matches!(self.getter, Getter::None)
    }

    fn can_write(&self) -> bool {
        !matches!(self.setter, Setter::None)
    }

    fn get_boxed(&self, owner: &dyn Any) -> Option<Box<dyn ObjectValue>> {
        self.with_value(owner, |value| Box::new(value.clone()) as Box<dyn ObjectValue>)
    }

    fn is_null(&self, owner: &dyn Any) -> bool {
        self.with_value(owner, |value| value.is_null())
            .unwrap_or(false)
    }

    fn equals(&self, owner: &dyn Any, other: &dyn ObjectValue) -> bool {
        self.with_value(owner, |value| other.as_any().downcast_ref::<M>() == Some(value))
            .unwrap_or(false)
    }

    fn set_boxed(&self, owner: &mut dyn Any, value: Box<dyn ObjectValue>) -> Result<()> {
        let actual = value.type_info();
        let value = value.into_any().downcast::<M>().map_err(|_| {
            Error::unsupported(format!(
                "cannot assign a {} to member {} of type {}",
                actual.name(),
                self.name,
                type_name::<M>()
            ))
        })?;
        self.set(owner, *value)
    }

    fn serialize(
        &self,
        registry: &Registry,
        owner: &dyn Any,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        let serializer = self.serializer(registry)?;
        self.with_value(owner, |value| serializer.serialize(registry, value, options))
            .ok_or_else(|| self.wrong_owner())?
    }

    fn deserialize(
        &self,
        registry: &Registry,
        owner: &mut dyn Any,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<()> {
        let value = self.serializer(registry)?.deserialize(registry, bson, options)?;
        self.set(owner, value)
    }

    fn instantiate(
        &self,
        serializer: Option<&Arc<dyn Any + Send + Sync>>,
    ) -> Result<Arc<dyn MemberAccess>> {
        let cell = OnceCell::new();
        if let Some(serializer) = serializer {
            let serializer = serializer
                .downcast_ref::<Arc<dyn Serializer<M>>>()
                .ok_or_else(|| {
                    Error::unsupported(format!(
                        "the serializer configured for member {} does not handle {}",
                        self.name,
                        type_name::<M>()
                    ))
                })?;
            let _ = cell.set(serializer.clone());
        }
        Ok(Arc::new(TypedMember {
            name: self.name,
            getter: self.getter.clone(),
            setter: self.setter.clone(),
            serializer: cell,
        }))
    }
}

/// A member inherited from a base class, reached through the derived class's [`BaseLink`].
pub(crate) struct Projected {
    pub(crate) link: BaseLink,
    pub(crate) inner: Arc<dyn MemberAccess>,
}

impl Projected {
    fn unreachable() -> Error {
        Error::unsupported("the value does not embed the class declaring this member")
    }
}

impl MemberAccess for Projected {
    fn can_read(&self) -> bool {
        self.inner.can_read()
    }

    fn can_write(&self) -> bool {
        self.inner.can_write()
    }

    fn get_boxed(&self, owner: &dyn Any) -> Option<Box<dyn ObjectValue>> {
        self.inner.get_boxed((self.link.projection)(owner)?)
    }

    fn is_null(&self, owner: &dyn Any) -> bool {
        (self.link.projection)(owner).is_some_and(|base| self.inner.is_null(base))
    }

    fn equals(&self, owner: &dyn Any, value: &dyn ObjectValue) -> bool {
        (self.link.projection)(owner).is_some_and(|base| self.inner.equals(base, value))
    }

    fn set_boxed(&self, owner: &mut dyn Any, value: Box<dyn ObjectValue>) -> Result<()> {
        let base = (self.link.projection_mut)(owner).ok_or_else(Self::unreachable)?;
        self.inner.set_boxed(base, value)
    }

    fn serialize(
        &self,
        registry: &Registry,
        owner: &dyn Any,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        let base = (self.link.projection)(owner).ok_or_else(Self::unreachable)?;
        self.inner.serialize(registry, base, options)
    }

    fn deserialize(
        &self,
        registry: &Registry,
        owner: &mut dyn Any,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<()> {
        let base = (self.link.projection_mut)(owner).ok_or_else(Self::unreachable)?;
        self.inner.deserialize(registry, base, bson, options)
    }

    fn instantiate(
        &self,
        _serializer: Option<&Arc<dyn Any + Send + Sync>>,
    ) -> Result<Arc<dyn MemberAccess>> {
        Ok(Arc::new(Projected {
            link: self.link.clone(),
            inner: self.inner.clone(),
        }))
    }
}
