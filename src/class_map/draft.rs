use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use ahash::AHashMap;

use super::{
    ClassMap,
    IdGenerator,
    member::{BaseLink, MemberAccess, ShouldSerialize},
};
use crate::{
    serializers::{DictionaryRepresentation, ObjectValue, SerializationOptions, TypeInfo},
    registry::Registry,
    spec::ElementType,
    uuid::UuidRepresentation,
};

/// A decision about a class or member, remembering whether the application made it.
///
/// Conventions only ever write [`Setting::Convention`] and never replace an explicit decision.
#[derive(Clone, Debug, PartialEq)]
pub enum Setting<T> {
    Unset,
    Convention(T),
    Explicit(T),
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Setting<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Unset => None,
            Self::Convention(value) | Self::Explicit(value) => Some(value),
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }

    /// Records a convention decision unless the application made one.
    pub fn set_convention(&mut self, value: T) {
        if !self.is_explicit() {
            *self = Self::Convention(value);
        }
    }

    pub fn set_explicit(&mut self, value: T) {
        *self = Self::Explicit(value);
    }
}

impl<T: Copy> Setting<T> {
    pub(crate) fn get_or(&self, default: T) -> T {
        self.value().copied().unwrap_or(default)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Default)]
pub(crate) struct MemberSettings {
    pub(crate) mapped: Setting<bool>,
    pub(crate) element_name: Setting<String>,
    pub(crate) order: Setting<i32>,
    pub(crate) ignore_if_null: Setting<bool>,
    pub(crate) ignore_if_default: Setting<bool>,
    pub(crate) default_value: Setting<Box<dyn ObjectValue>>,
    pub(crate) is_required: Setting<bool>,
    pub(crate) representation: Setting<ElementType>,
    pub(crate) uuid_representation: Setting<UuidRepresentation>,
    pub(crate) dictionary_representation: Setting<DictionaryRepresentation>,
    pub(crate) options: Setting<SerializationOptions>,
    pub(crate) id_generator: Setting<Arc<dyn IdGenerator>>,
    pub(crate) serializer: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) should_serialize: Option<ShouldSerialize>,
}

/// A member declared by a class, with the mapping decisions made for it so far.
pub struct MemberDraft {
    pub(crate) name: &'static str,
    pub(crate) type_info: TypeInfo,
    pub(crate) visibility: Visibility,
    pub(crate) declaration_index: usize,
    pub(crate) access: Arc<dyn MemberAccess>,
    pub(crate) settings: MemberSettings,
}

impl MemberDraft {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn can_read(&self) -> bool {
        self.access.can_read()
    }

    pub fn can_write(&self) -> bool {
        self.access.can_write()
    }

    pub fn is_mapped(&self) -> bool {
        self.settings.mapped.get_or(false)
    }

    pub fn set_mapped(&mut self, mapped: bool) {
        self.settings.mapped.set_convention(mapped);
    }

    /// The element name decided so far. `None` means the member name is used.
    pub fn element_name(&self) -> Option<&str> {
        self.settings.element_name.value().map(String::as_str)
    }

    pub fn set_element_name(&mut self, name: impl Into<String>) {
        self.settings.element_name.set_convention(name.into());
    }

    pub fn set_order(&mut self, order: i32) {
        self.settings.order.set_convention(order);
    }

    pub fn set_ignore_if_null(&mut self, ignore: bool) {
        self.settings.ignore_if_null.set_convention(ignore);
    }

    pub fn set_ignore_if_default(&mut self, ignore: bool) {
        self.settings.ignore_if_default.set_convention(ignore);
    }

    pub fn set_is_required(&mut self, required: bool) {
        self.settings.is_required.set_convention(required);
    }

    pub fn representation(&self) -> Option<ElementType> {
        self.settings.representation.value().copied()
    }

    pub fn set_representation(&mut self, representation: ElementType) {
        self.settings.representation.set_convention(representation);
    }

    pub fn set_uuid_representation(&mut self, representation: UuidRepresentation) {
        self.settings.uuid_representation.set_convention(representation);
    }

    pub fn set_dictionary_representation(&mut self, representation: DictionaryRepresentation) {
        self.settings
            .dictionary_representation
            .set_convention(representation);
    }

    pub fn has_id_generator(&self) -> bool {
        self.settings.id_generator.is_set()
    }

    pub fn set_id_generator(&mut self, generator: Arc<dyn IdGenerator>) {
        self.settings.id_generator.set_convention(generator);
    }
}

/// Class-level decisions.
#[derive(Default)]
pub(crate) struct ClassSettings {
    pub(crate) id_member: Setting<Option<&'static str>>,
    pub(crate) extra_elements_member: Setting<Option<&'static str>>,
    pub(crate) discriminator: Setting<String>,
    pub(crate) discriminator_is_required: Setting<bool>,
    pub(crate) is_root_class: Setting<bool>,
    pub(crate) ignore_extra_elements: Setting<bool>,
    pub(crate) ignore_extra_elements_is_inherited: Setting<bool>,
    pub(crate) is_abstract: Setting<bool>,
}

pub(crate) type ClassMapResolver = fn(&Registry) -> crate::error::Result<Arc<ClassMap>>;

pub(crate) struct BaseDeclaration {
    pub(crate) type_info: TypeInfo,
    pub(crate) resolve: ClassMapResolver,
    pub(crate) link: BaseLink,
}

/// A class map under construction. Conventions receive a `&mut ClassMapDraft` and fill in every
/// decision the application has not made explicitly.
pub struct ClassMapDraft {
    pub(crate) type_info: TypeInfo,
    pub(crate) base_declaration: Option<BaseDeclaration>,
    pub(crate) base: Option<Arc<ClassMap>>,
    pub(crate) members: Vec<MemberDraft>,
    pub(crate) settings: ClassSettings,
    pub(crate) known_types: Vec<(TypeId, ClassMapResolver)>,
    pub(crate) id_generators: AHashMap<TypeId, Arc<dyn IdGenerator>>,
    pub(crate) auto_map: bool,
    pub(crate) errors: Vec<String>,
}

impl ClassMapDraft {
    pub(crate) fn new(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            base_declaration: None,
            base: None,
            members: Vec::new(),
            settings: ClassSettings::default(),
            known_types: Vec::new(),
            id_generators: AHashMap::new(),
            auto_map: false,
            errors: Vec::new(),
        }
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// The class map of the base class, if this class inherits from one.
    pub fn base(&self) -> Option<&Arc<ClassMap>> {
        self.base.as_ref()
    }

    /// The members declared by this class itself, in declaration order.
    pub fn members(&self) -> &[MemberDraft] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [MemberDraft] {
        &mut self.members
    }

    pub fn member(&self, name: &str) -> Option<&MemberDraft> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut MemberDraft> {
        self.members.iter_mut().find(|m| m.name == name)
    }

    /// Whether an id member has been decided, including a decision that there is none.
    pub fn has_id_decision(&self) -> bool {
        self.settings.id_member.is_set()
    }

    pub fn id_member(&self) -> Option<&'static str> {
        self.settings.id_member.value().copied().flatten()
    }

    /// Makes the named member the id and maps it. Unknown names are ignored.
    pub fn set_id_member(&mut self, name: &str) {
        if let Some(member) = self.member_mut(name) {
            let name = member.name;
            member.set_mapped(true);
            self.settings.id_member.set_convention(Some(name));
        }
    }

    /// Decides that this class has no id member.
    pub fn set_no_id_member(&mut self) {
        self.settings.id_member.set_convention(None);
    }

    pub fn extra_elements_member(&self) -> Option<&'static str> {
        self.settings.extra_elements_member.value().copied().flatten()
    }

    pub fn set_extra_elements_member(&mut self, name: &str) {
        if let Some(member) = self.member_mut(name) {
            let name = member.name;
            member.set_mapped(true);
            self.settings.extra_elements_member.set_convention(Some(name));
        }
    }

    pub fn set_discriminator(&mut self, discriminator: impl Into<String>) {
        self.settings
            .discriminator
            .set_convention(discriminator.into());
    }

    pub fn set_discriminator_is_required(&mut self, required: bool) {
        self.settings
            .discriminator_is_required
            .set_convention(required);
    }

    pub fn set_is_root_class(&mut self, root: bool) {
        self.settings.is_root_class.set_convention(root);
    }

    pub fn set_ignore_extra_elements(&mut self, ignore: bool) {
        self.settings.ignore_extra_elements.set_convention(ignore);
    }

    pub fn set_ignore_extra_elements_is_inherited(&mut self, inherited: bool) {
        self.settings
            .ignore_extra_elements_is_inherited
            .set_convention(inherited);
    }

    pub fn set_is_abstract(&mut self, is_abstract: bool) {
        self.settings.is_abstract.set_convention(is_abstract);
    }

    /// The id generator registered for ids of the given type.
    pub fn lookup_id_generator(&self, id_type: TypeId) -> Option<Arc<dyn IdGenerator>> {
        self.id_generators.get(&id_type).cloned()
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}
