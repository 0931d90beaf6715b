//! The [`Registry`]: class maps, serializers, discriminators, id generators and conventions.

use std::{
    any::{Any, TypeId, type_name},
    fmt,
    sync::Arc,
};

use ahash::AHashMap;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::{
    Bson,
    Document,
    class_map::{ClassMap, ClassMapBuilder, IdGenerator, Mapped, ObjectIdGenerator, UuidGenerator},
    conventions::{ConventionPack, ConventionRegistry, DEFAULT_PACK},
    error::{Error, Result},
    extjson::{JsonReaderOptions, JsonWriterOptions},
    oid::ObjectId,
    raw,
    serializers::{BsonValue, Object, SerializationOptions, Serializer},
    uuid::Uuid,
};

type Configure<T> = Box<dyn FnOnce(&mut ClassMapBuilder<'_, T>) + Send>;

// One class map per type. Failed builds are cached like successful ones.
struct ClassMapSlot {
    configure: Mutex<Option<Box<dyn Any + Send>>>,
    class_map: OnceCell<Result<Arc<ClassMap>>>,
}

impl ClassMapSlot {
    fn new(configure: Option<Box<dyn Any + Send>>) -> Arc<Self> {
        Arc::new(Self {
            configure: Mutex::new(configure),
            class_map: OnceCell::new(),
        })
    }
}

/// Holds everything needed to map Rust values to BSON and back.
///
/// Most applications use the process-wide [`Registry::global`], which the top-level functions
/// such as [`to_document`](crate::to_document) go through. Separate registries are independent:
/// a class map built by one is never seen by another.
///
/// ```
/// use bson_mapping::{Registry, bson_class, doc};
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
/// bson_class!(Point { x, y });
///
/// let registry = Registry::new();
/// registry.register_class_map::<Point>(|class| {
///     class.auto_map();
///     class.map_member("x").set_element_name("X");
/// })?;
///
/// let doc = registry.to_document(&Point { x: 1, y: 2 })?;
/// assert_eq!(doc, doc! { "X": 1, "y": 2 });
/// assert_eq!(registry.from_document::<Point>(doc)?, Point { x: 1, y: 2 });
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
pub struct Registry {
    class_maps: RwLock<AHashMap<TypeId, Arc<ClassMapSlot>>>,
    serializers: RwLock<AHashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    discriminators: RwLock<AHashMap<String, Vec<Arc<ClassMap>>>>,
    id_generators: RwLock<AHashMap<TypeId, Arc<dyn IdGenerator>>>,
    conventions: ConventionRegistry,
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry with the default convention pack and the id generators for [`ObjectId`] and
    /// [`Uuid`].
    pub fn new() -> Self {
        let registry = Self {
            class_maps: Default::default(),
            serializers: Default::default(),
            discriminators: Default::default(),
            id_generators: Default::default(),
            conventions: ConventionRegistry::new(),
        };
        registry
            .conventions
            .register(DEFAULT_PACK, ConventionPack::defaults(), |_| true);
        registry.register_id_generator::<ObjectId>(ObjectIdGenerator);
        registry.register_id_generator::<Uuid>(UuidGenerator);
        registry
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub fn conventions(&self) -> &ConventionRegistry {
        &self.conventions
    }

    /// Registers the configuration used to build the class map of `T`. Configuration replaces
    /// auto-mapping unless it calls [`ClassMapBuilder::auto_map`].
    ///
    /// Fails if the class map of `T` was already registered or built.
    pub fn register_class_map<T: Mapped>(
        &self,
        configure: impl FnOnce(&mut ClassMapBuilder<'_, T>) + Send + 'static,
    ) -> Result<()> {
        let configure: Configure<T> = Box::new(configure);
        let mut class_maps = self.class_maps.write();
        if class_maps.contains_key(&TypeId::of::<T>()) {
            return Err(Error::mapping(
                type_name::<T>(),
                "a class map is already registered for this type",
            ));
        }
        class_maps.insert(TypeId::of::<T>(), ClassMapSlot::new(Some(Box::new(configure))));
        Ok(())
    }

    /// The class map of `T`, building it on first use.
    pub fn lookup_class_map<T: Mapped>(&self) -> Result<Arc<ClassMap>> {
        let slot = self.slot(TypeId::of::<T>());
        slot.class_map
            .get_or_init(|| {
                let configure = slot
                    .configure
                    .lock()
                    .take()
                    .and_then(|c| c.downcast::<Configure<T>>().ok())
                    .map(|c| *c);
                let class_map = ClassMap::build::<T>(self, configure).map(Arc::new)?;
                self.register_class_discriminator(&class_map);
                Ok(class_map)
            })
            .clone()
    }

    fn slot(&self, type_id: TypeId) -> Arc<ClassMapSlot> {
        if let Some(slot) = self.class_maps.read().get(&type_id) {
            return slot.clone();
        }
        self.class_maps
            .write()
            .entry(type_id)
            .or_insert_with(|| ClassMapSlot::new(None))
            .clone()
    }

    /// Whether a class map for `T` has been registered or built.
    pub fn is_class_map_registered<T: Mapped>(&self) -> bool {
        self.class_maps.read().contains_key(&TypeId::of::<T>())
    }

    /// The class map for the type with id `type_id`, if it has been built successfully.
    pub fn class_map_by_type_id(&self, type_id: TypeId) -> Option<Arc<ClassMap>> {
        let slot = self.class_maps.read().get(&type_id)?.clone();
        slot.class_map.get()?.as_ref().ok().cloned()
    }

    /// Uses `serializer` for every value of type `T`. Fails if a serializer for `T` has already
    /// been registered or used.
    pub fn register_serializer<T: BsonValue>(
        &self,
        serializer: impl Serializer<T> + 'static,
    ) -> Result<()> {
        let serializer: Arc<dyn Serializer<T>> = Arc::new(serializer);
        let mut serializers = self.serializers.write();
        if serializers.contains_key(&TypeId::of::<T>()) {
            return Err(Error::unsupported(format!(
                "a serializer is already registered for {}",
                type_name::<T>()
            )));
        }
        serializers.insert(TypeId::of::<T>(), Arc::new(serializer));
        Ok(())
    }

    /// The serializer for `T`: the registered one, or else the default serializer of `T`.
    pub fn lookup_serializer<T: BsonValue>(&self) -> Result<Arc<dyn Serializer<T>>> {
        if let Some(serializer) = self.serializers.read().get(&TypeId::of::<T>()) {
            return downcast_serializer::<T>(serializer);
        }
        let serializer: Arc<dyn Any + Send + Sync> = Arc::new(T::default_serializer(self)?);
        let mut serializers = self.serializers.write();
        let stored = serializers
            .entry(TypeId::of::<T>())
            .or_insert(serializer);
        downcast_serializer::<T>(stored)
    }

    /// Uses `generator` for id members of type `T` in class maps built after this call.
    pub fn register_id_generator<T: BsonValue>(&self, generator: impl IdGenerator + 'static) {
        self.id_generators
            .write()
            .insert(TypeId::of::<T>(), Arc::new(generator));
    }

    pub fn lookup_id_generator(&self, id_type: TypeId) -> Option<Arc<dyn IdGenerator>> {
        self.id_generators.read().get(&id_type).cloned()
    }

    pub(crate) fn id_generators(&self) -> AHashMap<TypeId, Arc<dyn IdGenerator>> {
        self.id_generators.read().clone()
    }

    /// Makes `discriminator` an additional name for `T` when reading polymorphic values.
    pub fn register_discriminator<T: Mapped>(&self, discriminator: impl Into<String>) -> Result<()> {
        let class_map = self.lookup_class_map::<T>()?;
        self.add_discriminator(discriminator.into(), class_map);
        Ok(())
    }

    fn register_class_discriminator(&self, class_map: &Arc<ClassMap>) {
        self.add_discriminator(class_map.discriminator().to_string(), class_map.clone());
    }

    fn add_discriminator(&self, discriminator: String, class_map: Arc<ClassMap>) {
        debug!(
            discriminator,
            class = class_map.type_info().short_name(),
            "registered discriminator"
        );
        let mut discriminators = self.discriminators.write();
        let classes = discriminators.entry(discriminator).or_default();
        if !classes
            .iter()
            .any(|c| c.type_info().id() == class_map.type_info().id())
        {
            classes.push(class_map);
        }
    }

    /// Resolves the class named by `discriminator` for a value stored in a slot of type
    /// `nominal`, which is either a mapped class or [`Object`].
    ///
    /// The resolved class must be `nominal` or derive from it, and the discriminator must name
    /// exactly one such class. A hierarchical discriminator is resolved by its last element.
    pub fn lookup_actual_type(&self, nominal: TypeId, discriminator: &Bson) -> Result<Arc<ClassMap>> {
        let name = match discriminator {
            Bson::String(name) => name.as_str(),
            Bson::Array(chain) => match chain.last() {
                Some(Bson::String(name)) => name.as_str(),
                _ => return Err(invalid_discriminator(discriminator)),
            },
            _ => return Err(invalid_discriminator(discriminator)),
        };

        let nominal_map = self.class_map_by_type_id(nominal);
        if let Some(nominal_map) = &nominal_map {
            self.load_known_types(nominal_map)?;
        }
        let nominal_name = nominal_map
            .as_ref()
            .map(|c| c.type_info().name())
            .unwrap_or(if nominal == TypeId::of::<Object>() {
                type_name::<Object>()
            } else {
                "the nominal type"
            });

        let discriminators = self.discriminators.read();
        let candidates: Vec<&Arc<ClassMap>> = discriminators
            .get(name)
            .map(|classes| {
                classes
                    .iter()
                    .filter(|c| nominal == TypeId::of::<Object>() || c.is_assignable_to(nominal))
                    .collect()
            })
            .unwrap_or_default();
        match candidates.as_slice() {
            [class_map] => Ok(Arc::clone(class_map)),
            [] => Err(Error::format(format!(
                "unknown discriminator {name:?} for {nominal_name}"
            ))),
            ambiguous => Err(Error::format(format!(
                "ambiguous discriminator {name:?} for {nominal_name}: {}",
                ambiguous
                    .iter()
                    .map(|c| c.type_info().name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    // Builds the known subclasses of `class_map` and theirs in turn. Runs once per class map;
    // concurrent callers wait for the first and a failure is replayed to every later caller.
    fn load_known_types(&self, class_map: &ClassMap) -> Result<()> {
        class_map
            .known_types_loaded
            .get_or_init(|| {
                let mut seen = vec![class_map.type_info().id()];
                let mut pending: Vec<_> = class_map.known_types.clone();
                while let Some((type_id, resolve)) = pending.pop() {
                    if seen.contains(&type_id) {
                        continue;
                    }
                    seen.push(type_id);
                    let known = resolve(self)?;
                    pending.extend(known.known_types.iter().cloned());
                }
                Ok(())
            })
            .clone()
    }

    /// Gives `value` a new id if its id member is empty. Returns whether an id was assigned.
    pub fn assign_id<T: Mapped>(&self, value: &mut T) -> Result<bool> {
        let class_map = self.lookup_class_map::<T>()?;
        let Some(id) = class_map.id_member_map() else {
            return Ok(false);
        };
        let generator = match id.id_generator() {
            Some(generator) => generator.clone(),
            None => match self.lookup_id_generator(id.type_info().id()) {
                Some(generator) => generator,
                None => return Ok(false),
            },
        };
        let is_empty = id
            .access
            .get_boxed(value)
            .is_none_or(|current| generator.is_empty(current.as_ref()));
        if !is_empty {
            return Ok(false);
        }
        id.access.set_boxed(value, generator.generate()?)?;
        Ok(true)
    }

    pub fn to_bson<T: BsonValue>(&self, value: &T) -> Result<Bson> {
        self.lookup_serializer::<T>()?
            .serialize(self, value, &SerializationOptions::new())
    }

    /// Converts `value` to a document. Fails if `value` is not stored as a document.
    pub fn to_document<T: BsonValue>(&self, value: &T) -> Result<Document> {
        match self.to_bson(value)? {
            Bson::Document(doc) => Ok(doc),
            other => Err(Error::unsupported(format!(
                "{} is stored as BSON {:?}, which cannot be a top-level document",
                type_name::<T>(),
                other.element_type()
            ))),
        }
    }

    pub fn to_vec<T: BsonValue>(&self, value: &T) -> Result<Vec<u8>> {
        raw::encode_document(&self.to_document(value)?)
    }

    pub fn to_json<T: BsonValue>(&self, value: &T, options: &JsonWriterOptions) -> Result<String> {
        Ok(self.to_document(value)?.to_json(options))
    }

    pub fn from_bson<T: BsonValue>(&self, bson: Bson) -> Result<T> {
        self.lookup_serializer::<T>()?
            .deserialize(self, bson, &SerializationOptions::new())
    }

    pub fn from_document<T: BsonValue>(&self, doc: Document) -> Result<T> {
        self.from_bson(Bson::Document(doc))
    }

    pub fn from_slice<T: BsonValue>(&self, bytes: &[u8]) -> Result<T> {
        self.from_document(raw::decode_document(bytes)?)
    }

    pub fn from_json<T: BsonValue>(&self, text: &str) -> Result<T> {
        self.from_json_with(text, JsonReaderOptions::default())
    }

    pub fn from_json_with<T: BsonValue>(&self, text: &str, options: JsonReaderOptions) -> Result<T> {
        self.from_document(Document::from_json_with(text, options)?)
    }
}

fn downcast_serializer<T: BsonValue>(
    stored: &Arc<dyn Any + Send + Sync>,
) -> Result<Arc<dyn Serializer<T>>> {
    stored
        .downcast_ref::<Arc<dyn Serializer<T>>>()
        .cloned()
        .ok_or_else(|| {
            Error::unsupported(format!(
                "the serializer registered for {} has the wrong type",
                type_name::<T>()
            ))
        })
}

fn invalid_discriminator(discriminator: &Bson) -> Error {
    Error::format(format!(
        "a discriminator must be a string or an array of strings, not {discriminator}"
    ))
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("class_maps", &self.class_maps.read().len())
            .field("serializers", &self.serializers.read().len())
            .field("conventions", &self.conventions)
            .finish_non_exhaustive()
    }
}
