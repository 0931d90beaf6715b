//! Conventions: ordered, pluggable rules that fill in the mapping decisions an application did
//! not make explicitly.
//!
//! A [`ConventionPack`] is an ordered list of [`Convention`]s. Packs are registered with a
//! [`ConventionRegistry`] under a name and a filter over candidate types; when a class is
//! auto-mapped every pack whose filter accepts the class runs, in registration order, and within a
//! pack every convention runs in the order it was added. A later convention may overwrite a
//! decision made by an earlier one, but no convention overwrites an explicit decision.
//!
//! ```
//! use bson_mapping::{
//!     Registry,
//!     bson_class,
//!     conventions::{CamelCaseElementNameConvention, ConventionPack},
//!     doc,
//! };
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Person {
//!     first_name: String,
//! }
//! bson_class!(Person { first_name });
//!
//! let registry = Registry::new();
//! let mut pack = ConventionPack::new();
//! pack.add(CamelCaseElementNameConvention);
//! registry.conventions().register("camel case", pack, |_| true);
//!
//! let person = Person { first_name: "Ada".into() };
//! assert_eq!(registry.to_document(&person)?, doc! { "firstName": "Ada" });
//! # Ok::<(), bson_mapping::error::Error>(())
//! ```

mod builtin;

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

pub use self::builtin::{
    CamelCaseElementNameConvention,
    DelegateConvention,
    DictionaryRepresentationConvention,
    EnumRepresentationConvention,
    ExtraElementsMemberConvention,
    GuidRepresentationConvention,
    IdGeneratorConvention,
    IdMemberConvention,
    IgnoreExtraElementsConvention,
    IgnoreIfDefaultConvention,
    IgnoreIfNullConvention,
    MemberFinderConvention,
    MemberNameElementNameConvention,
    NoIdMemberConvention,
    UnderscoreElementNameConvention,
};
use crate::{class_map::ClassMapDraft, serializers::TypeInfo};

/// The name the default pack is registered under.
pub const DEFAULT_PACK: &str = "__defaults__";

/// A rule applied to a class map while it is auto-mapped.
pub trait Convention: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, class: &mut ClassMapDraft);
}

/// An ordered list of conventions.
#[derive(Clone, Default)]
pub struct ConventionPack {
    conventions: Vec<Arc<dyn Convention>>,
}

impl ConventionPack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pack registered as [`DEFAULT_PACK`] by [`Registry::new`](crate::Registry::new).
    pub fn defaults() -> Self {
        let mut pack = Self::new();
        pack.add(MemberFinderConvention)
            .add(MemberNameElementNameConvention)
            .add(IdMemberConvention::default())
            .add(ExtraElementsMemberConvention::default())
            .add(IdGeneratorConvention);
        pack
    }

    pub fn add(&mut self, convention: impl Convention + 'static) -> &mut Self {
        self.conventions.push(Arc::new(convention));
        self
    }

    /// Adds every convention of `other` after the conventions of this pack.
    pub fn append(&mut self, other: &ConventionPack) -> &mut Self {
        self.conventions.extend(other.conventions.iter().cloned());
        self
    }

    pub fn conventions(&self) -> &[Arc<dyn Convention>] {
        &self.conventions
    }

    pub fn len(&self) -> usize {
        self.conventions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conventions.is_empty()
    }
}

impl fmt::Debug for ConventionPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.conventions.iter().map(|c| c.name()))
            .finish()
    }
}

type Filter = Arc<dyn Fn(&TypeInfo) -> bool + Send + Sync>;

struct Entry {
    name: String,
    pack: Arc<ConventionPack>,
    filter: Filter,
}

/// The convention packs of a [`Registry`](crate::Registry), in registration order.
///
/// Packs only affect class maps built after they are registered.
#[derive(Default)]
pub struct ConventionRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl ConventionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pack` for every type accepted by `filter`. A pack registered under an existing
    /// name replaces that pack and keeps its position.
    pub fn register(
        &self,
        name: impl Into<String>,
        pack: ConventionPack,
        filter: impl Fn(&TypeInfo) -> bool + Send + Sync + 'static,
    ) {
        let entry = Entry {
            name: name.into(),
            pack: Arc::new(pack),
            filter: Arc::new(filter),
        };
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    /// Removes the pack registered under `name`, returning whether there was one.
    pub fn remove(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.name != name);
        entries.len() != before
    }

    /// The packs that apply to `type_info`, in the order they run.
    pub fn lookup(&self, type_info: &TypeInfo) -> Vec<Arc<ConventionPack>> {
        self.entries
            .read()
            .iter()
            .filter(|e| (e.filter)(type_info))
            .map(|e| e.pack.clone())
            .collect()
    }

    /// The names of the registered packs, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.name.clone()).collect()
    }
}

impl fmt::Debug for ConventionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionRegistry")
            .field("packs", &self.names())
            .finish()
    }
}
