use std::{
    any::{Any, TypeId, type_name},
    marker::PhantomData,
    sync::Arc,
};

use super::{
    IdGenerator,
    Mapped,
    draft::{ClassMapDraft, MemberDraft},
    member::ShouldSerialize,
};
use crate::{
    serializers::{BsonValue, DictionaryRepresentation, SerializationOptions, Serializer},
    spec::ElementType,
    uuid::UuidRepresentation,
};

/// Explicit configuration of a class map. Every decision made here takes precedence over the
/// conventions.
///
/// ```
/// use bson_mapping::{Registry, bson_class, doc};
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Person {
///     name: String,
///     age: i32,
/// }
/// bson_class!(Person { name, age });
///
/// let registry = Registry::new();
/// registry.register_class_map::<Person>(|cm| {
///     cm.auto_map();
///     cm.map_member("name").set_element_name("n");
///     cm.set_ignore_extra_elements(true, false);
/// })?;
///
/// let person = Person { name: "Ann".into(), age: 30 };
/// assert_eq!(registry.to_document(&person)?, doc! { "n": "Ann", "age": 30 });
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
pub struct ClassMapBuilder<'a, T> {
    draft: &'a mut ClassMapDraft,
    class: PhantomData<fn() -> T>,
}

impl<'a, T: Mapped> ClassMapBuilder<'a, T> {
    pub(crate) fn new(draft: &'a mut ClassMapDraft) -> Self {
        Self {
            draft,
            class: PhantomData,
        }
    }

    /// Runs the registered conventions for this class once explicit configuration is complete.
    pub fn auto_map(&mut self) -> &mut Self {
        self.draft.auto_map = true;
        self
    }

    /// Maps the named member and returns its builder.
    pub fn map_member(&mut self, name: &str) -> MemberMapBuilder<'_, T> {
        let mut builder = self.member(name);
        if let Some(member) = builder.member.as_deref_mut() {
            member.settings.mapped.set_explicit(true);
        }
        builder
    }

    /// Excludes the named member from the class map.
    pub fn unmap_member(&mut self, name: &str) -> &mut Self {
        let mut builder = self.member(name);
        if let Some(member) = builder.member.as_deref_mut() {
            member.settings.mapped.set_explicit(false);
        }
        self
    }

    /// Maps the named member as the id, stored under the element name `_id`.
    pub fn map_id_member(&mut self, name: &str) -> MemberMapBuilder<'_, T> {
        if let Some(member) = self.draft.member(name) {
            let name = member.name;
            self.draft.settings.id_member.set_explicit(Some(name));
        }
        self.map_member(name)
    }

    /// Declares that this class has no id member.
    pub fn set_no_id(&mut self) -> &mut Self {
        self.draft.settings.id_member.set_explicit(None);
        self
    }

    /// Collects elements that match no member into the named [`Document`](crate::Document)
    /// member, and writes them back out on serialization.
    pub fn map_extra_elements_member(&mut self, name: &str) -> MemberMapBuilder<'_, T> {
        if let Some(member) = self.draft.member(name) {
            let name = member.name;
            self.draft
                .settings
                .extra_elements_member
                .set_explicit(Some(name));
        }
        self.map_member(name)
    }

    pub fn set_discriminator(&mut self, discriminator: impl Into<String>) -> &mut Self {
        self.draft
            .settings
            .discriminator
            .set_explicit(discriminator.into());
        self
    }

    /// Writes the discriminator even when the nominal and actual types agree.
    pub fn set_discriminator_is_required(&mut self, required: bool) -> &mut Self {
        self.draft
            .settings
            .discriminator_is_required
            .set_explicit(required);
        self
    }

    /// Makes this class the root of a hierarchy. Root classes and their subclasses write the
    /// discriminators of the whole chain as an array.
    pub fn set_is_root_class(&mut self, root: bool) -> &mut Self {
        self.draft.settings.is_root_class.set_explicit(root);
        self
    }

    /// Silently drops unknown elements. With `inherited`, derived classes adopt the same policy
    /// unless they declare their own.
    pub fn set_ignore_extra_elements(&mut self, ignore: bool, inherited: bool) -> &mut Self {
        self.draft.settings.ignore_extra_elements.set_explicit(ignore);
        self.draft
            .settings
            .ignore_extra_elements_is_inherited
            .set_explicit(inherited);
        self
    }

    /// Abstract classes are never instantiated when reading; a discriminator must name a concrete
    /// subclass.
    pub fn set_is_abstract(&mut self, is_abstract: bool) -> &mut Self {
        self.draft.settings.is_abstract.set_explicit(is_abstract);
        self
    }

    /// Builds the class map of `D` before the first discriminator is resolved against this class,
    /// so that a document naming `D` can be read without `D` having been used before.
    pub fn add_known_type<D: Mapped>(&mut self) -> &mut Self {
        self.draft
            .known_types
            .push((TypeId::of::<D>(), |registry| registry.lookup_class_map::<D>()));
        self
    }

    fn member(&mut self, name: &str) -> MemberMapBuilder<'_, T> {
        let ClassMapDraft {
            members, errors, ..
        } = &mut *self.draft;
        let member = members.iter_mut().find(|m| m.name == name);
        if member.is_none() {
            errors.push(format!("{} has no member named {name}", type_name::<T>()));
        }
        MemberMapBuilder::new(member, errors)
    }
}

/// Explicit configuration of one member.
pub struct MemberMapBuilder<'a, T> {
    member: Option<&'a mut MemberDraft>,
    errors: &'a mut Vec<String>,
    class: PhantomData<fn() -> T>,
}

impl<'a, T: Mapped> MemberMapBuilder<'a, T> {
    pub(crate) fn new(member: Option<&'a mut MemberDraft>, errors: &'a mut Vec<String>) -> Self {
        Self {
            member,
            errors,
            class: PhantomData,
        }
    }

    fn update(&mut self, f: impl FnOnce(&mut MemberDraft)) -> &mut Self {
        if let Some(member) = self.member.as_deref_mut() {
            f(member);
        }
        self
    }

    // Checks that a value of type `M` can be stored in the member.
    fn check_type<M: Any>(&mut self, what: &str) -> bool {
        let Some(member) = self.member.as_deref() else {
            return false;
        };
        if member.type_info.id() == TypeId::of::<M>() {
            return true;
        }
        self.errors.push(format!(
            "the {what} configured for member {} must handle {}, not {}",
            member.name,
            member.type_info.name(),
            type_name::<M>()
        ));
        false
    }

    pub fn set_element_name(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.update(|m| m.settings.element_name.set_explicit(name))
    }

    /// Members are written in ascending order; members without an order follow in declaration
    /// order.
    pub fn set_order(&mut self, order: i32) -> &mut Self {
        self.update(|m| m.settings.order.set_explicit(order))
    }

    pub fn set_ignore_if_null(&mut self, ignore: bool) -> &mut Self {
        self.update(|m| m.settings.ignore_if_null.set_explicit(ignore))
    }

    /// Omits the element when the value equals the member's default value.
    pub fn set_ignore_if_default(&mut self, ignore: bool) -> &mut Self {
        self.update(|m| m.settings.ignore_if_default.set_explicit(ignore))
    }

    /// The value assigned when the element is missing, and compared against by
    /// [`set_ignore_if_default`](Self::set_ignore_if_default). Without one the value in
    /// `T::default()` is used for the comparison.
    pub fn set_default_value<M: BsonValue>(&mut self, value: M) -> &mut Self {
        if self.check_type::<M>("default value") {
            self.update(|m| m.settings.default_value.set_explicit(Box::new(value)));
        }
        self
    }

    /// Fails deserialization when the element is missing.
    pub fn set_is_required(&mut self, required: bool) -> &mut Self {
        self.update(|m| m.settings.is_required.set_explicit(required))
    }

    pub fn set_representation(&mut self, representation: ElementType) -> &mut Self {
        self.update(|m| m.settings.representation.set_explicit(representation))
    }

    pub fn set_uuid_representation(&mut self, representation: UuidRepresentation) -> &mut Self {
        self.update(|m| m.settings.uuid_representation.set_explicit(representation))
    }

    pub fn set_dictionary_representation(
        &mut self,
        representation: DictionaryRepresentation,
    ) -> &mut Self {
        self.update(|m| {
            m.settings
                .dictionary_representation
                .set_explicit(representation)
        })
    }

    /// Replaces all serialization options of the member.
    pub fn set_serialization_options(&mut self, options: SerializationOptions) -> &mut Self {
        self.update(|m| m.settings.options.set_explicit(options))
    }

    /// Uses `serializer` for this member instead of the one the registry resolves for `M`.
    pub fn set_serializer<M: BsonValue>(&mut self, serializer: impl Serializer<M>) -> &mut Self {
        if self.check_type::<M>("serializer") {
            let serializer: Arc<dyn Serializer<M>> = Arc::new(serializer);
            let erased: Arc<dyn Any + Send + Sync> = Arc::new(serializer);
            self.update(|m| m.settings.serializer = Some(erased));
        }
        self
    }

    pub fn set_id_generator(&mut self, generator: impl IdGenerator + 'static) -> &mut Self {
        let generator: Arc<dyn IdGenerator> = Arc::new(generator);
        self.update(|m| m.settings.id_generator.set_explicit(generator))
    }

    /// Writes the member only when `predicate` returns true for the owning value.
    pub fn set_should_serialize(
        &mut self,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        let predicate: ShouldSerialize = Arc::new(move |owner: &dyn Any| {
            owner.downcast_ref::<T>().is_some_and(|owner| predicate(owner))
        });
        self.update(|m| m.settings.should_serialize = Some(predicate))
    }
}
