//! A BSON document represented as an ordered list of elements.

use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

use ahash::AHashMap;

use crate::{
    Binary,
    Decimal128,
    Timestamp,
    bson::{Array, Bson},
    error::{Error, Result},
    extjson::{Json, JsonReader, JsonReaderOptions, JsonWriterOptions},
    oid::ObjectId,
};

/// A BSON document: an ordered sequence of named values.
///
/// Insertion order is preserved and observable. Element names need not be unique:
/// [`Document::push`] always appends, while [`Document::insert`] replaces the value of the first
/// element with the same name. Lookups by name see the first matching element.
#[derive(Clone, Default)]
pub struct Document {
    elements: Vec<(String, Bson)>,
    // name -> position of its first occurrence
    index: AHashMap<String, usize>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.elements.hash(state);
    }
}

/// Prints the document in the shell form of extended JSON.
impl Display for Document {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        Display::fmt(&Json::document(self, &JsonWriterOptions::shell()), fmt)
    }
}

impl Debug for Document {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "Document(")?;
        fmt.debug_map()
            .entries(self.elements.iter().map(|(k, v)| (k, v)))
            .finish()?;
        write!(fmt, ")")
    }
}

/// An iterator over Document entries.
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, (String, Bson)>,
}

/// An iterator over Document entries with mutable values.
pub struct IterMut<'a> {
    inner: std::slice::IterMut<'a, (String, Bson)>,
}

/// An owning iterator over Document entries.
pub struct IntoIter {
    inner: std::vec::IntoIter<(String, Bson)>,
}

/// An iterator over a Document's keys.
pub struct Keys<'a> {
    inner: Iter<'a>,
}

/// An iterator over a Document's values.
pub struct Values<'a> {
    inner: Iter<'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a String, &'a Bson);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k, v))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> Iterator for IterMut<'a> {
    type Item = (&'a String, &'a mut Bson);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }
}

impl Iterator for IntoIter {
    type Item = (String, Bson);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a String;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

impl<'a> Iterator for Values<'a> {
    type Item = &'a Bson;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

impl IntoIterator for Document {
    type Item = (String, Bson);
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.elements.into_iter(),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Bson);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Into<String>, V: Into<Bson>> FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut doc = Document::new();
        doc.extend(iter);
        doc
    }
}

impl<K: Into<String>, V: Into<Bson>> Extend<(K, V)> for Document {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl Document {
    /// Creates a new empty Document.
    pub fn new() -> Document {
        Document::default()
    }

    /// Gets an iterator over the entries of the document, in order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.elements.iter(),
        }
    }

    /// Gets an iterator over the entries with mutable references to the values.
    pub fn iter_mut(&mut self) -> IterMut<'_> {
        IterMut {
            inner: self.elements.iter_mut(),
        }
    }

    /// Clears the document, removing all values.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.index.clear();
    }

    /// Returns a reference to the value of the first element named `key`.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&Bson> {
        let pos = *self.index.get(key.as_ref())?;
        Some(&self.elements[pos].1)
    }

    /// Returns a mutable reference to the value of the first element named `key`.
    pub fn get_mut(&mut self, key: impl AsRef<str>) -> Option<&mut Bson> {
        let pos = *self.index.get(key.as_ref())?;
        Some(&mut self.elements[pos].1)
    }

    /// Returns every value stored under `key`, in document order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Bson> + 'a {
        self.elements
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the element at `position`.
    pub fn get_index(&self, position: usize) -> Option<(&str, &Bson)> {
        self.elements
            .get(position)
            .map(|(k, v)| (k.as_str(), v))
    }

    fn get_present(&self, key: &str) -> Result<&Bson> {
        self.get(key)
            .ok_or_else(|| Error::not_present().with_key(key))
    }

    /// Get a floating point value for this key if it exists and has the correct type.
    pub fn get_f64(&self, key: impl AsRef<str>) -> Result<f64> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_f64()
            .map_err(|e| e.with_key(key))
    }

    /// Get a [`Decimal128`] value for this key if it exists and has the correct type.
    pub fn get_decimal128(&self, key: impl AsRef<str>) -> Result<Decimal128> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_decimal128()
            .map_err(|e| e.with_key(key))
    }

    /// Get a string slice this key if it exists and has the correct type.
    pub fn get_str(&self, key: impl AsRef<str>) -> Result<&str> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_str()
            .map_err(|e| e.with_key(key))
    }

    /// Get a reference to an array for this key if it exists and has the correct type.
    pub fn get_array(&self, key: impl AsRef<str>) -> Result<&Array> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_array()
            .map_err(|e| e.with_key(key))
    }

    /// Get a reference to a document for this key if it exists and has the correct type.
    pub fn get_document(&self, key: impl AsRef<str>) -> Result<&Document> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_document()
            .map_err(|e| e.with_key(key))
    }

    /// Get a mutable reference to a document for this key if it exists and has the correct type.
    pub fn get_document_mut(&mut self, key: impl AsRef<str>) -> Result<&mut Document> {
        let key = key.as_ref();
        match self.get_mut(key) {
            Some(Bson::Document(doc)) => Ok(doc),
            Some(other) => Err(Error::type_mismatch(
                crate::spec::ElementType::EmbeddedDocument,
                other.element_type(),
            )
            .with_key(key)),
            None => Err(Error::not_present().with_key(key)),
        }
    }

    /// Get a bool value for this key if it exists and has the correct type.
    pub fn get_bool(&self, key: impl AsRef<str>) -> Result<bool> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_bool()
            .map_err(|e| e.with_key(key))
    }

    /// Returns whether this key has a null value.
    pub fn is_null(&self, key: impl AsRef<str>) -> bool {
        self.get(key) == Some(&Bson::Null)
    }

    /// Get an i32 value for this key if it exists and has the correct type.
    pub fn get_i32(&self, key: impl AsRef<str>) -> Result<i32> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_i32()
            .map_err(|e| e.with_key(key))
    }

    /// Get an i64 value for this key if it exists and has the correct type.
    pub fn get_i64(&self, key: impl AsRef<str>) -> Result<i64> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_i64()
            .map_err(|e| e.with_key(key))
    }

    /// Get a time stamp value for this key if it exists and has the correct type.
    pub fn get_timestamp(&self, key: impl AsRef<str>) -> Result<Timestamp> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_timestamp()
            .map_err(|e| e.with_key(key))
    }

    /// Get a reference to a binary value for this key if it exists and has the correct type.
    pub fn get_binary(&self, key: impl AsRef<str>) -> Result<&Binary> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_binary()
            .map_err(|e| e.with_key(key))
    }

    /// Get an object id value for this key if it exists and has the correct type.
    pub fn get_object_id(&self, key: impl AsRef<str>) -> Result<ObjectId> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_object_id()
            .map_err(|e| e.with_key(key))
    }

    /// Get a DateTime for this key if it exists and has the correct type.
    pub fn get_datetime(&self, key: impl AsRef<str>) -> Result<crate::DateTime> {
        let key = key.as_ref();
        self.get_present(key)?
            .try_as_datetime()
            .map_err(|e| e.with_key(key))
    }

    /// Returns true if the document contains an element named `key`.
    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.index.contains_key(key.as_ref())
    }

    /// Gets a collection of all keys in the document.
    pub fn keys(&self) -> Keys<'_> {
        Keys { inner: self.iter() }
    }

    /// Gets a collection of all values in the document.
    pub fn values(&self) -> Values<'_> {
        Values { inner: self.iter() }
    }

    /// Returns the number of elements in the document.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the document contains no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Sets the value of the first element named `key`, or appends a new element if there is
    /// none. Returns the replaced value, if any.
    pub fn insert<KT: Into<String>, BT: Into<Bson>>(&mut self, key: KT, val: BT) -> Option<Bson> {
        let key = key.into();
        let val = val.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.elements[pos].1, val)),
            None => {
                self.push(key, val);
                None
            }
        }
    }

    /// Appends an element, even if an element with the same name is already present.
    pub fn push<KT: Into<String>, BT: Into<Bson>>(&mut self, key: KT, val: BT) {
        let key = key.into();
        self.index
            .entry(key.clone())
            .or_insert(self.elements.len());
        self.elements.push((key, val.into()));
    }

    /// Takes the value of the first element named `key` out of the document, shifting the later
    /// elements down.
    pub fn remove(&mut self, key: impl AsRef<str>) -> Option<Bson> {
        let pos = self.index.remove(key.as_ref())?;
        let (_, value) = self.elements.remove(pos);
        self.reindex();
        Some(value)
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, (k, _)) in self.elements.iter().enumerate() {
            self.index.entry(k.clone()).or_insert(pos);
        }
    }

    /// Gets the given key's corresponding entry in the document for in-place manipulation.
    pub fn entry(&mut self, key: impl Into<String>) -> Entry<'_> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&pos) => Entry::Occupied(OccupiedEntry { doc: self, pos }),
            None => Entry::Vacant(VacantEntry { doc: self, key }),
        }
    }

    /// Encodes this document into its binary form.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        crate::raw::encode_document(self)
    }

    /// Decodes a single document from its binary form. Trailing bytes are an error.
    pub fn from_slice(bytes: &[u8]) -> Result<Document> {
        crate::raw::decode_document(bytes)
    }

    /// Parses a document from extended JSON text.
    pub fn from_json(text: &str) -> Result<Document> {
        Self::from_json_with(text, JsonReaderOptions::default())
    }

    /// Parses a document from extended JSON text with the given reader options.
    pub fn from_json_with(text: &str, options: JsonReaderOptions) -> Result<Document> {
        JsonReader::new(text, options).read_single_document()
    }

    /// Renders the document as extended JSON.
    pub fn to_json(&self, options: &JsonWriterOptions) -> String {
        Json::document(self, options).to_string()
    }

    /// Renders the document as strict extended JSON on a single line.
    pub fn to_json_string(&self) -> String {
        self.to_json(&JsonWriterOptions::default())
    }
}

/// A view into a single entry in a document, which may either be vacant or occupied.
pub enum Entry<'a> {
    /// An occupied entry.
    Occupied(OccupiedEntry<'a>),

    /// A vacant entry.
    Vacant(VacantEntry<'a>),
}

impl<'a> Entry<'a> {
    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &str {
        match self {
            Self::Vacant(v) => &v.key,
            Self::Occupied(o) => o.key(),
        }
    }

    /// Inserts the given default value in the entry if it is vacant and returns a mutable reference
    /// to it. Otherwise a mutable reference to an already existent value is returned.
    pub fn or_insert(self, default: Bson) -> &'a mut Bson {
        self.or_insert_with(|| default)
    }

    /// Inserts the result of the `default` function in the entry if it is vacant and returns a
    /// mutable reference to it. Otherwise a mutable reference to an already existent value is
    /// returned.
    pub fn or_insert_with<F: FnOnce() -> Bson>(self, default: F) -> &'a mut Bson {
        match self {
            Self::Occupied(OccupiedEntry { doc, pos }) => &mut doc.elements[pos].1,
            Self::Vacant(VacantEntry { doc, key }) => {
                let pos = doc.elements.len();
                doc.push(key, default());
                &mut doc.elements[pos].1
            }
        }
    }
}

/// A view into a vacant entry in a [Document]. It is part of the [Entry] enum.
pub struct VacantEntry<'a> {
    doc: &'a mut Document,
    key: String,
}

/// A view into an occupied entry in a [Document]. It is part of the [Entry] enum.
pub struct OccupiedEntry<'a> {
    doc: &'a mut Document,
    pos: usize,
}

impl OccupiedEntry<'_> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &str {
        &self.doc.elements[self.pos].0
    }
}
