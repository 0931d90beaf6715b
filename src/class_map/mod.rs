//! Class maps: compiled descriptions of how a [`Mapped`] type is stored as a document.
//!
//! A class map is built once per type and registry, the first time it is needed. The build
//! starts from the members declared by [`Mapped::describe`], applies the explicit configuration
//! given to [`Registry::register_class_map`] (if any), runs the registered
//! [conventions](crate::conventions) when the class is auto-mapped, and then freezes the result.
//! Frozen class maps are immutable and shared.

mod builder;
mod describe;
mod draft;
mod id_generator;
pub(crate) mod member;

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

use ahash::AHashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, trace, warn};

pub use self::{
    builder::{ClassMapBuilder, MemberMapBuilder},
    describe::{ClassDescription, Mapped},
    draft::{ClassMapDraft, MemberDraft, Setting, Visibility},
    id_generator::{IdGenerator, NullIdChecker, ObjectIdGenerator, UuidGenerator},
};
use self::{
    draft::ClassMapResolver,
    member::{BaseLink, MemberAccess, Projected, ShouldSerialize},
};
use crate::{
    Bson,
    Document,
    error::{Error, Result},
    registry::Registry,
    serializers::{ObjectValue, SerializationOptions, TypeInfo},
};

/// The element that stores the discriminator of a polymorphic value.
pub const DISCRIMINATOR: &str = "_t";

/// The element that stores the id member.
pub const ID_ELEMENT: &str = "_id";

/// How one member of a class is stored.
pub struct MemberMap {
    member_name: &'static str,
    element_name: String,
    declaring_class: TypeInfo,
    type_info: TypeInfo,
    order: i32,
    declaration_index: usize,
    ignore_if_null: bool,
    ignore_if_default: bool,
    is_required: bool,
    default_value: Option<Box<dyn ObjectValue>>,
    prototype_default: Option<Box<dyn ObjectValue>>,
    options: SerializationOptions,
    id_generator: Option<Arc<dyn IdGenerator>>,
    should_serialize: Option<ShouldSerialize>,
    pub(crate) access: Arc<dyn MemberAccess>,
}

impl MemberMap {
    fn from_draft(
        member: &MemberDraft,
        declaring_class: TypeInfo,
        element_name: String,
        prototype: &dyn Any,
    ) -> std::result::Result<Self, String> {
        let settings = &member.settings;
        let mut options = settings.options.value().cloned().unwrap_or_default();
        if let Some(representation) = settings.representation.value() {
            options.representation = Some(*representation);
        }
        if let Some(representation) = settings.uuid_representation.value() {
            options.uuid_representation = *representation;
        }
        if let Some(representation) = settings.dictionary_representation.value() {
            options.dictionary_representation = *representation;
        }
        let access = member
            .access
            .instantiate(settings.serializer.as_ref())
            .map_err(|e| e.to_string())?;

        Ok(Self {
            member_name: member.name,
            element_name,
            declaring_class,
            type_info: member.type_info,
            order: settings.order.get_or(i32::MAX),
            declaration_index: member.declaration_index,
            ignore_if_null: settings.ignore_if_null.get_or(false),
            ignore_if_default: settings.ignore_if_default.get_or(false),
            is_required: settings.is_required.get_or(false),
            default_value: settings.default_value.value().cloned(),
            prototype_default: member.access.get_boxed(prototype),
            options,
            id_generator: settings.id_generator.value().cloned(),
            should_serialize: settings.should_serialize.clone(),
            access,
        })
    }

    // The same member seen from a class derived from the declaring class.
    fn inherit(&self, link: &BaseLink) -> Self {
        Self {
            member_name: self.member_name,
            element_name: self.element_name.clone(),
            declaring_class: self.declaring_class,
            type_info: self.type_info,
            order: self.order,
            declaration_index: self.declaration_index,
            ignore_if_null: self.ignore_if_null,
            ignore_if_default: self.ignore_if_default,
            is_required: self.is_required,
            default_value: self.default_value.clone(),
            prototype_default: self.prototype_default.clone(),
            options: self.options.clone(),
            id_generator: self.id_generator.clone(),
            should_serialize: self
                .should_serialize
                .clone()
                .map(|predicate| link.predicate(predicate)),
            access: Arc::new(Projected {
                link: link.clone(),
                inner: self.access.clone(),
            }),
        }
    }

    pub fn member_name(&self) -> &'static str {
        self.member_name
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    /// The class that declares this member, which may be a base class of the class map.
    pub fn declaring_class(&self) -> TypeInfo {
        self.declaring_class
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn ignore_if_null(&self) -> bool {
        self.ignore_if_null
    }

    pub fn ignore_if_default(&self) -> bool {
        self.ignore_if_default
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    /// The value compared against by `ignore_if_default`.
    pub fn default_value(&self) -> Option<&dyn ObjectValue> {
        self.default_value
            .as_deref()
            .or(self.prototype_default.as_deref())
    }

    pub fn serialization_options(&self) -> &SerializationOptions {
        &self.options
    }

    pub fn id_generator(&self) -> Option<&Arc<dyn IdGenerator>> {
        self.id_generator.as_ref()
    }

    pub fn can_read(&self) -> bool {
        self.access.can_read()
    }

    pub fn can_write(&self) -> bool {
        self.access.can_write()
    }

    fn should_write(&self, owner: &dyn Any) -> bool {
        if !self.access.can_read() {
            return false;
        }
        if let Some(predicate) = &self.should_serialize {
            if !predicate(owner) {
                return false;
            }
        }
        if self.ignore_if_null && self.access.is_null(owner) {
            return false;
        }
        if self.ignore_if_default {
            if let Some(default) = self.default_value() {
                if self.access.equals(owner, default) {
                    return false;
                }
            }
        }
        true
    }
}

impl fmt::Debug for MemberMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberMap")
            .field("member_name", &self.member_name)
            .field("element_name", &self.element_name)
            .field("type", &self.type_info.name())
            .field("declaring_class", &self.declaring_class.short_name())
            .finish_non_exhaustive()
    }
}

fn create<T: Mapped>() -> Box<dyn ObjectValue> {
    Box::new(T::default())
}

/// The frozen description of how a [`Mapped`] type is stored.
pub struct ClassMap {
    type_info: TypeInfo,
    base: Option<Arc<ClassMap>>,
    base_link: Option<BaseLink>,
    all_members: Vec<MemberMap>,
    inherited_count: usize,
    id_member: Option<usize>,
    extra_elements_member: Option<MemberMap>,
    element_index: AHashMap<String, usize>,
    discriminator: String,
    discriminators: Vec<String>,
    discriminator_value: Bson,
    discriminator_is_required: bool,
    is_root_class: bool,
    has_root_class: bool,
    ignore_extra_elements: bool,
    ignore_extra_elements_is_inherited: bool,
    is_abstract: bool,
    create: fn() -> Box<dyn ObjectValue>,
    pub(crate) known_types: Vec<(TypeId, ClassMapResolver)>,
    pub(crate) known_types_loaded: OnceCell<Result<()>>,
}

impl ClassMap {
    /// Describes, configures, auto-maps and freezes the class map of `T`.
    pub(crate) fn build<T: Mapped>(
        registry: &Registry,
        configure: Option<Box<dyn FnOnce(&mut ClassMapBuilder<'_, T>) + Send>>,
    ) -> Result<ClassMap> {
        let mut description = ClassDescription::<T>::new();
        T::describe(&mut description);
        let mut draft = description.draft;
        let class = draft.type_info.short_name();

        if let Some(base) = &draft.base_declaration {
            let base_map = (base.resolve)(registry).map_err(|e| {
                Error::mapping(
                    class,
                    format!(
                        "base class {} cannot be mapped: {e}",
                        base.type_info.short_name()
                    ),
                )
            })?;
            draft.base = Some(base_map);
        }
        draft.id_generators = registry.id_generators();

        match configure {
            Some(configure) => configure(&mut ClassMapBuilder::new(&mut draft)),
            None => draft.auto_map = true,
        }

        if draft.auto_map {
            for pack in registry.conventions().lookup(&draft.type_info) {
                for convention in pack.conventions() {
                    trace!(class, convention = convention.name(), "applying convention");
                    convention.apply(&mut draft);
                }
            }
        }

        let prototype = T::default();
        let class_map = Self::freeze(draft, &prototype, create::<T>);
        match &class_map {
            Ok(class_map) => debug!(
                class,
                members = class_map.all_members.len(),
                discriminator = %class_map.discriminator_value,
                "built class map"
            ),
            Err(error) => warn!(class, %error, "class map build failed"),
        }
        class_map
    }

    fn freeze(
        draft: ClassMapDraft,
        prototype: &dyn Any,
        create: fn() -> Box<dyn ObjectValue>,
    ) -> Result<ClassMap> {
        let type_info = draft.type_info;
        let class = type_info.short_name();
        let fail = |message: String| Error::mapping(class, message);

        if let Some(error) = draft.errors.first() {
            return Err(fail(error.clone()));
        }

        let settings = &draft.settings;
        let base = draft.base.clone();
        let base_link = draft
            .base_declaration
            .as_ref()
            .map(|declaration| declaration.link.clone());
        let id_name = settings.id_member.value().copied().flatten();
        let extra_name = settings.extra_elements_member.value().copied().flatten();

        if let (Some(id_name), Some(base)) = (id_name, &base) {
            if let Some(base_id) = base.id_member_map() {
                return Err(fail(format!(
                    "member {id_name} cannot be the id because {} already declares the id \
                     member {}",
                    base_id.declaring_class.short_name(),
                    base_id.member_name
                )));
            }
        }
        for (role, name) in [("id", id_name), ("extra elements", extra_name)] {
            if let Some(name) = name {
                if draft.member(name).is_none() {
                    return Err(fail(format!("the {role} member {name} is not declared")));
                }
            }
        }

        let mut own = Vec::new();
        let mut own_extra = None;
        for member in &draft.members {
            let is_id = id_name == Some(member.name);
            let is_extra = extra_name == Some(member.name);
            if !(member.is_mapped() || is_id || is_extra) {
                continue;
            }
            let element_name = if is_id {
                ID_ELEMENT.to_string()
            } else {
                member
                    .element_name()
                    .unwrap_or(member.name)
                    .to_string()
            };
            let member_map =
                MemberMap::from_draft(member, type_info, element_name, prototype).map_err(fail)?;
            if is_extra {
                if member.type_info.id() != TypeId::of::<Document>() {
                    return Err(fail(format!(
                        "the extra elements member {} must be a Document, not {}",
                        member.name,
                        member.type_info.name()
                    )));
                }
                own_extra = Some(member_map);
                continue;
            }
            own.push(member_map);
        }
        own.sort_by_key(|member| (member.order, member.declaration_index));

        let mut all_members = Vec::new();
        let mut extra_elements_member = own_extra;
        if let (Some(base), Some(link)) = (&base, &base_link) {
            all_members.extend(base.all_members.iter().map(|m| m.inherit(link)));
            if let Some(base_extra) = &base.extra_elements_member {
                if let Some(own_extra) = &extra_elements_member {
                    return Err(fail(format!(
                        "member {} cannot collect extra elements because {} already declares \
                         the extra elements member {}",
                        own_extra.member_name,
                        base_extra.declaring_class.short_name(),
                        base_extra.member_name
                    )));
                }
                extra_elements_member = Some(base_extra.inherit(link));
            }
        }
        let inherited_count = all_members.len();
        all_members.extend(own);

        let id_member = match id_name {
            Some(name) => all_members[inherited_count..]
                .iter()
                .position(|m| m.member_name == name)
                .map(|i| i + inherited_count),
            None => base.as_ref().and_then(|base| base.id_member),
        };

        let mut element_index = AHashMap::with_capacity(all_members.len());
        for (i, member) in all_members.iter().enumerate() {
            if member.element_name == DISCRIMINATOR {
                return Err(fail(format!(
                    "member {} of {} cannot use the element name {DISCRIMINATOR}, which holds \
                     the discriminator",
                    member.member_name,
                    member.declaring_class.short_name()
                )));
            }
            if let Some(&previous) = element_index.get(&member.element_name) {
                let previous: &MemberMap = &all_members[previous];
                return Err(fail(format!(
                    "member {} of {} and member {} of {} both use the element name {}",
                    previous.member_name,
                    previous.declaring_class.short_name(),
                    member.member_name,
                    member.declaring_class.short_name(),
                    member.element_name
                )));
            }
            element_index.insert(member.element_name.clone(), i);
        }

        let inherited_policy = base
            .as_ref()
            .filter(|base| base.ignore_extra_elements_is_inherited);
        let (ignore_extra_elements, ignore_extra_elements_is_inherited) =
            match (&settings.ignore_extra_elements, inherited_policy) {
                (Setting::Explicit(ignore), _) => (
                    *ignore,
                    settings.ignore_extra_elements_is_inherited.get_or(false),
                ),
                (_, Some(base)) => (base.ignore_extra_elements, true),
                (own, None) => (
                    own.get_or(false),
                    settings.ignore_extra_elements_is_inherited.get_or(false),
                ),
            };

        let discriminator = settings
            .discriminator
            .value()
            .cloned()
            .unwrap_or_else(|| class.to_string());
        let is_root_class = settings.is_root_class.get_or(false);
        let has_root_class =
            is_root_class || base.as_ref().is_some_and(|base| base.has_root_class);
        let mut discriminators = match &base {
            Some(base) if has_root_class && !is_root_class => base.discriminators.clone(),
            _ => Vec::new(),
        };
        discriminators.push(discriminator.clone());
        let discriminator_value = match discriminators.as_slice() {
            [single] => Bson::String(single.clone()),
            chain => Bson::Array(chain.iter().cloned().map(Bson::String).collect()),
        };
        let discriminator_is_required = settings.discriminator_is_required.get_or(false)
            || base
                .as_ref()
                .is_some_and(|base| base.discriminator_is_required);

        Ok(ClassMap {
            type_info,
            base,
            base_link,
            all_members,
            inherited_count,
            id_member,
            extra_elements_member,
            element_index,
            discriminator,
            discriminators,
            discriminator_value,
            discriminator_is_required,
            is_root_class,
            has_root_class,
            ignore_extra_elements,
            ignore_extra_elements_is_inherited,
            is_abstract: settings.is_abstract.get_or(false),
            create,
            known_types: draft.known_types,
            known_types_loaded: OnceCell::new(),
        })
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    pub fn base(&self) -> Option<&Arc<ClassMap>> {
        self.base.as_ref()
    }

    /// The members declared by this class, in element order.
    pub fn declared_member_maps(&self) -> &[MemberMap] {
        &self.all_members[self.inherited_count..]
    }

    /// The members of this class and all its base classes, base class members first. Does not
    /// include the extra elements member.
    pub fn all_member_maps(&self) -> &[MemberMap] {
        &self.all_members
    }

    pub fn member_map(&self, member_name: &str) -> Option<&MemberMap> {
        self.all_members
            .iter()
            .find(|m| m.member_name == member_name)
    }

    pub fn member_map_for_element(&self, element_name: &str) -> Option<&MemberMap> {
        self.element_index
            .get(element_name)
            .map(|&i| &self.all_members[i])
    }

    pub fn id_member_map(&self) -> Option<&MemberMap> {
        self.id_member.map(|i| &self.all_members[i])
    }

    pub fn extra_elements_member_map(&self) -> Option<&MemberMap> {
        self.extra_elements_member.as_ref()
    }

    /// The discriminator of this class alone.
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// The value written to the discriminator element: the discriminator of this class, or the
    /// array of discriminators from the root class down when the hierarchy has a root class.
    pub fn discriminator_value(&self) -> &Bson {
        &self.discriminator_value
    }

    pub fn discriminator_is_required(&self) -> bool {
        self.discriminator_is_required
    }

    pub fn is_root_class(&self) -> bool {
        self.is_root_class
    }

    pub fn has_root_class(&self) -> bool {
        self.has_root_class
    }

    pub fn ignore_extra_elements(&self) -> bool {
        self.ignore_extra_elements
    }

    pub fn ignore_extra_elements_is_inherited(&self) -> bool {
        self.ignore_extra_elements_is_inherited
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether a value of this class can be stored in a slot of class `target`.
    pub fn is_assignable_to(&self, target: TypeId) -> bool {
        self.type_info.id() == target
            || self
                .base
                .as_ref()
                .is_some_and(|base| base.is_assignable_to(target))
    }

    /// The part of `owner`, a value of this class, that is a value of class `target`.
    pub fn project<'a>(&self, owner: &'a dyn Any, target: TypeId) -> Option<&'a dyn Any> {
        if self.type_info.id() == target {
            return Some(owner);
        }
        let base = self.base.as_ref()?;
        let link = self.base_link.as_ref()?;
        base.project((link.projection)(owner)?, target)
    }

    pub(crate) fn create(&self) -> Box<dyn ObjectValue> {
        (self.create)()
    }

    /// Writes `owner`, a value of this class, as a document. `nominal` is the class of the slot
    /// the value is stored in; a discriminator is written when it differs from this class.
    pub(crate) fn serialize(
        &self,
        registry: &Registry,
        owner: &dyn Any,
        nominal: TypeId,
    ) -> Result<Document> {
        let mut doc = Document::new();
        if let Some(id) = self.id_member_map() {
            Self::write_member(registry, owner, id, &mut doc)?;
        }
        if nominal != self.type_info.id() || self.discriminator_is_required || self.has_root_class
        {
            doc.push(DISCRIMINATOR, self.discriminator_value.clone());
        }
        for (i, member) in self.all_members.iter().enumerate() {
            if Some(i) != self.id_member {
                Self::write_member(registry, owner, member, &mut doc)?;
            }
        }
        if let Some(extra) = &self.extra_elements_member {
            if let Some(value) = extra.access.get_boxed(owner) {
                if let Some(extra) = value.as_any().downcast_ref::<Document>() {
                    for (name, value) in extra {
                        if !doc.contains_key(name) {
                            doc.push(name.clone(), value.clone());
                        }
                    }
                }
            }
        }
        Ok(doc)
    }

    fn write_member(
        registry: &Registry,
        owner: &dyn Any,
        member: &MemberMap,
        doc: &mut Document,
    ) -> Result<()> {
        if !member.should_write(owner) {
            return Ok(());
        }
        let value = member
            .access
            .serialize(registry, owner, &member.options)
            .map_err(|e| e.with_key(member.element_name.as_str()))?;
        doc.push(member.element_name.clone(), value);
        Ok(())
    }

    /// Reads the elements of `doc` into `owner`, a value of this class.
    pub(crate) fn deserialize_into(
        &self,
        registry: &Registry,
        owner: &mut dyn Any,
        doc: Document,
    ) -> Result<()> {
        let class = self.type_info.short_name();
        let mut found = vec![false; self.all_members.len()];
        let mut extra_elements = Document::new();

        for (name, value) in doc {
            if name == DISCRIMINATOR {
                continue;
            }
            match self.element_index.get(&name) {
                Some(&i) => {
                    found[i] = true;
                    let member = &self.all_members[i];
                    if !member.access.can_write() {
                        continue;
                    }
                    member
                        .access
                        .deserialize(registry, owner, value, &member.options)
                        .map_err(|e| e.with_key(name))?;
                }
                None if self.extra_elements_member.is_some() => extra_elements.push(name, value),
                None if self.ignore_extra_elements => {}
                None => return Err(Error::unknown_element(name, class)),
            }
        }

        for (member, found) in self.all_members.iter().zip(found) {
            if found || !member.access.can_write() {
                continue;
            }
            if member.is_required {
                return Err(Error::missing_required(
                    member.element_name.as_str(),
                    member.member_name,
                    member.declaring_class.short_name(),
                ));
            }
            if let Some(default) = &member.default_value {
                member
                    .access
                    .set_boxed(owner, default.clone_object())
                    .map_err(|e| e.with_key(member.element_name.as_str()))?;
            }
        }

        if let Some(extra) = &self.extra_elements_member {
            if !extra_elements.is_empty() {
                extra.access.set_boxed(owner, Box::new(extra_elements))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ClassMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMap")
            .field("class", &self.type_info.name())
            .field("base", &self.base.as_ref().map(|b| b.type_info.short_name()))
            .field("members", &self.all_members)
            .field("discriminator", &self.discriminator_value)
            .finish_non_exhaustive()
    }
}
