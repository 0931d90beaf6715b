//! Strategies for detecting and filling in missing ids.

use std::fmt::Debug;

use crate::{
    error::{Error, Result},
    oid::ObjectId,
    serializers::ObjectValue,
    uuid::Uuid,
};

/// Detects an empty id and generates a new one. Generators are registered per id type with
/// [`Registry::register_id_generator`](crate::Registry::register_id_generator).
pub trait IdGenerator: Debug + Send + Sync {
    /// Whether `id` holds no id yet.
    fn is_empty(&self, id: &dyn ObjectValue) -> bool;

    /// A new id of the type this generator is registered for.
    fn generate(&self) -> Result<Box<dyn ObjectValue>>;
}

/// Generates [`ObjectId`]s. The all-zero id counts as empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectIdGenerator;

impl IdGenerator for ObjectIdGenerator {
    fn is_empty(&self, id: &dyn ObjectValue) -> bool {
        id.as_any()
            .downcast_ref::<ObjectId>()
            .is_none_or(ObjectId::is_empty)
    }

    fn generate(&self) -> Result<Box<dyn ObjectValue>> {
        Ok(Box::new(ObjectId::new()))
    }
}

/// Generates random (version 4) [`Uuid`]s. The nil UUID counts as empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn is_empty(&self, id: &dyn ObjectValue) -> bool {
        id.as_any().downcast_ref::<Uuid>().is_none_or(Uuid::is_nil)
    }

    fn generate(&self) -> Result<Box<dyn ObjectValue>> {
        Ok(Box::new(Uuid::new()))
    }
}

/// Only checks that an id is present; a null id is an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullIdChecker;

impl IdGenerator for NullIdChecker {
    fn is_empty(&self, id: &dyn ObjectValue) -> bool {
        id.is_null_value()
    }

    fn generate(&self) -> Result<Box<dyn ObjectValue>> {
        Err(Error::unsupported("the id must not be null"))
    }
}
