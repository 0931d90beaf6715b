use std::{
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
    marker::PhantomData,
    sync::Arc,
};

use indexmap::IndexMap;

use super::{BsonValue, SerializationOptions, Serializer, ValueKind, unexpected};
use crate::{
    Bson,
    Document,
    error::{Error, Result},
    registry::Registry,
};

/// How a key-value map is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DictionaryRepresentation {
    /// An embedded document when every key serializes to a plain string, otherwise
    /// [`ArrayOfArrays`](Self::ArrayOfArrays).
    #[default]
    Dynamic,
    /// An embedded document keyed by the map keys.
    Document,
    /// An array of `[key, value]` arrays.
    ArrayOfArrays,
    /// An array of `{ "k" : key, "v" : value }` documents.
    ArrayOfDocuments,
}

/// Whether `key` can be used as an element name of an embedded document: non-empty, without `.`
/// and not starting with `$`.
pub(crate) fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('.') && !key.starts_with('$')
}

/// Serializes a map type `M` with keys `K` and values `V` according to its
/// [`DictionaryRepresentation`]. Reading accepts every representation.
pub struct DictionarySerializer<M, K, V> {
    key: Arc<dyn Serializer<K>>,
    value: Arc<dyn Serializer<V>>,
    map: PhantomData<fn() -> M>,
}

impl<M, K, V> DictionarySerializer<M, K, V> {
    pub fn new(key: Arc<dyn Serializer<K>>, value: Arc<dyn Serializer<V>>) -> Self {
        Self {
            key,
            value,
            map: PhantomData,
        }
    }
}

impl<M, K, V> DictionarySerializer<M, K, V>
where
    K: 'static,
    V: 'static,
{
    fn read_entry(
        &self,
        registry: &Registry,
        key: Bson,
        value: Bson,
        options: &SerializationOptions,
    ) -> Result<(K, V)> {
        let key = self.key.deserialize(registry, key, options.keys())?;
        let value = self.value.deserialize(registry, value, options.items())?;
        Ok((key, value))
    }

    fn read_array_entry(
        &self,
        registry: &Registry,
        entry: Bson,
        options: &SerializationOptions,
    ) -> Result<(K, V)> {
        match entry {
            Bson::Array(pair) if pair.len() == 2 => {
                let mut pair = pair.into_iter();
                let key = pair.next().unwrap_or(Bson::Null);
                let value = pair.next().unwrap_or(Bson::Null);
                self.read_entry(registry, key, value, options)
            }
            Bson::Document(mut doc) if doc.len() == 2 => {
                match (doc.remove("k"), doc.remove("v")) {
                    (Some(key), Some(value)) => self.read_entry(registry, key, value, options),
                    _ => Err(Error::format(
                        "expected a dictionary entry document with elements \"k\" and \"v\"",
                    )),
                }
            }
            other => Err(Error::format(format!(
                "expected a dictionary entry, found {other}"
            ))),
        }
    }
}

impl<M, K, V> Serializer<M> for DictionarySerializer<M, K, V>
where
    M: FromIterator<(K, V)> + 'static,
    for<'a> &'a M: IntoIterator<Item = (&'a K, &'a V)>,
    K: 'static,
    V: 'static,
{
    fn serialize(
        &self,
        registry: &Registry,
        value: &M,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        let mut entries = Vec::new();
        for (key, value) in value {
            let key = self.key.serialize(registry, key, options.keys())?;
            let element = match &key {
                Bson::String(name) => Some(name.as_str()),
                _ => None,
            };
            let value = self
                .value
                .serialize(registry, value, options.items())
                .map_err(|e| match element {
                    Some(name) => e.with_key(name),
                    None => e,
                })?;
            entries.push((key, value));
        }

        let all_plain = || {
            entries
                .iter()
                .all(|(key, _)| matches!(key, Bson::String(s) if is_plain_key(s)))
        };
        let representation = match options.dictionary_representation {
            DictionaryRepresentation::Dynamic if all_plain() => DictionaryRepresentation::Document,
            DictionaryRepresentation::Dynamic => DictionaryRepresentation::ArrayOfArrays,
            DictionaryRepresentation::Document if !all_plain() => {
                return Err(Error::format(
                    "a dictionary stored as a document must have non-empty string keys without \
                     '.' or a leading '$'",
                ));
            }
            other => other,
        };

        Ok(match representation {
            DictionaryRepresentation::ArrayOfArrays => Bson::Array(
                entries
                    .into_iter()
                    .map(|(key, value)| Bson::Array(vec![key, value]))
                    .collect(),
            ),
            DictionaryRepresentation::ArrayOfDocuments => Bson::Array(
                entries
                    .into_iter()
                    .map(|(key, value)| {
                        let mut doc = Document::new();
                        doc.push("k", key);
                        doc.push("v", value);
                        Bson::Document(doc)
                    })
                    .collect(),
            ),
            _ => {
                let mut doc = Document::new();
                for (key, value) in entries {
                    if let Bson::String(name) = key {
                        doc.push(name, value);
                    }
                }
                Bson::Document(doc)
            }
        })
    }

    fn deserialize(
        &self,
        registry: &Registry,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<M> {
        match bson {
            Bson::Document(doc) => doc
                .into_iter()
                .map(|(name, value)| {
                    self.read_entry(registry, Bson::String(name.clone()), value, options)
                        .map_err(|e| e.with_key(name))
                })
                .collect(),
            Bson::Array(array) => array
                .into_iter()
                .enumerate()
                .map(|(i, entry)| {
                    self.read_array_entry(registry, entry, options)
                        .map_err(|e| e.with_index(i))
                })
                .collect(),
            other => Err(unexpected::<M>(&other)),
        }
    }
}

impl<K, V, S> BsonValue for HashMap<K, V, S>
where
    K: BsonValue + Eq + Hash,
    V: BsonValue,
    S: BuildHasher + Default + Clone + Send + Sync + 'static,
{
    const KIND: ValueKind = ValueKind::Dictionary;

    fn default_serializer(registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(DictionarySerializer::<Self, K, V>::new(
            registry.lookup_serializer::<K>()?,
            registry.lookup_serializer::<V>()?,
        )))
    }
}

impl<K, V> BsonValue for BTreeMap<K, V>
where
    K: BsonValue + Ord,
    V: BsonValue,
{
    const KIND: ValueKind = ValueKind::Dictionary;

    fn default_serializer(registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(DictionarySerializer::<Self, K, V>::new(
            registry.lookup_serializer::<K>()?,
            registry.lookup_serializer::<V>()?,
        )))
    }
}

impl<K, V, S> BsonValue for IndexMap<K, V, S>
where
    K: BsonValue + Eq + Hash,
    V: BsonValue,
    S: BuildHasher + Default + Clone + Send + Sync + 'static,
{
    const KIND: ValueKind = ValueKind::Dictionary;

    fn default_serializer(registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(DictionarySerializer::<Self, K, V>::new(
            registry.lookup_serializer::<K>()?,
            registry.lookup_serializer::<V>()?,
        )))
    }
}
