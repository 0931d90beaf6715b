use std::{
    any::Any,
    fmt::Debug,
    marker::PhantomData,
    sync::Arc,
};

use super::{
    ClassMap,
    builder::{ClassMapBuilder, MemberMapBuilder},
    draft::{BaseDeclaration, ClassMapDraft, MemberDraft, MemberSettings, Visibility},
    member::{BaseLink, Getter, Setter, TypedMember},
};
use crate::{
    error::Result,
    registry::Registry,
    serializers::{BsonValue, ClassSerializer, Serializer, TypeInfo, ValueKind},
};

/// A Rust type that is stored as a document described by a [`ClassMap`].
///
/// Implementations declare the members of the type; how each member is stored is decided when
/// the class map is built, by explicit configuration and the registered conventions. The
/// [`bson_class!`](crate::bson_class) macro writes this implementation for plain structs.
///
/// ```
/// use bson_mapping::{ClassDescription, Mapped, oid::ObjectId};
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Account {
///     id: ObjectId,
///     owner: String,
///     balance: i64,
/// }
///
/// impl Mapped for Account {
///     fn describe(class: &mut ClassDescription<Self>) {
///         class.field("id", |a| &a.id, |a| &mut a.id);
///         class.field("owner", |a| &a.owner, |a| &mut a.owner);
///         class
///             .field("balance", |a| &a.balance, |a| &mut a.balance)
///             .set_ignore_if_default(true);
///     }
/// }
///
/// let account = Account { owner: "Ann".into(), ..Default::default() };
/// let doc = bson_mapping::to_document(&account)?;
/// assert_eq!(doc.keys().collect::<Vec<_>>(), ["_id", "owner"]);
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
pub trait Mapped: Any + Clone + PartialEq + Debug + Default + Send + Sync {
    /// Declares the members, base class and known subclasses of this type.
    fn describe(class: &mut ClassDescription<Self>);
}

impl<T: Mapped> BsonValue for T {
    const KIND: ValueKind = ValueKind::Class;

    fn default_serializer(registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(ClassSerializer::<T>::new(
            registry.lookup_class_map::<T>()?,
        )))
    }

    fn class_map(registry: &Registry) -> Option<Result<Arc<ClassMap>>> {
        Some(registry.lookup_class_map::<T>())
    }
}

/// The member declarations of a [`Mapped`] type.
pub struct ClassDescription<T> {
    pub(crate) draft: ClassMapDraft,
    class: PhantomData<fn() -> T>,
}

impl<T: Mapped> ClassDescription<T> {
    pub(crate) fn new() -> Self {
        Self {
            draft: ClassMapDraft::new(TypeInfo::of::<T>()),
            class: PhantomData,
        }
    }

    fn declare<M: BsonValue>(
        &mut self,
        name: &'static str,
        visibility: Visibility,
        getter: Getter<T, M>,
        setter: Setter<T, M>,
    ) -> MemberMapBuilder<'_, T> {
        let draft = &mut self.draft;
        if draft.member(name).is_some() {
            draft.fail(format!("member {name} is declared twice"));
        }
        let declaration_index = draft.members.len();
        draft.members.push(MemberDraft {
            name,
            type_info: TypeInfo::of::<M>(),
            visibility,
            declaration_index,
            access: Arc::new(TypedMember::new(name, getter, setter)),
            settings: MemberSettings::default(),
        });
        let ClassMapDraft {
            members, errors, ..
        } = draft;
        MemberMapBuilder::new(members.last_mut(), errors)
    }

    /// Declares a public field reached by reference.
    pub fn field<M: BsonValue>(
        &mut self,
        name: &'static str,
        get: impl Fn(&T) -> &M + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut M + Send + Sync + 'static,
    ) -> MemberMapBuilder<'_, T> {
        self.declare::<M>(
            name,
            Visibility::Public,
            Getter::Ref(Arc::new(get)),
            Setter::Ref(Arc::new(get_mut)),
        )
    }

    /// Declares a public property read and written by value.
    pub fn property<M: BsonValue>(
        &mut self,
        name: &'static str,
        get: impl Fn(&T) -> M + Send + Sync + 'static,
        set: impl Fn(&mut T, M) + Send + Sync + 'static,
    ) -> MemberMapBuilder<'_, T> {
        self.declare::<M>(
            name,
            Visibility::Public,
            Getter::Value(Arc::new(get)),
            Setter::Value(Arc::new(set)),
        )
    }

    /// Declares a computed value that is written but never read back.
    pub fn read_only<M: BsonValue>(
        &mut self,
        name: &'static str,
        get: impl Fn(&T) -> M + Send + Sync + 'static,
    ) -> MemberMapBuilder<'_, T> {
        self.declare::<M>(name, Visibility::Public, Getter::Value(Arc::new(get)), Setter::None)
    }

    /// Declares a value that is read from documents but never written.
    pub fn write_only<M: BsonValue>(
        &mut self,
        name: &'static str,
        set: impl Fn(&mut T, M) + Send + Sync + 'static,
    ) -> MemberMapBuilder<'_, T> {
        self.declare::<M>(name, Visibility::Public, Getter::None, Setter::Value(Arc::new(set)))
    }

    /// Declares a field that conventions do not map on their own. Map it with
    /// [`ClassMapBuilder::map_member`].
    pub fn private_field<M: BsonValue>(
        &mut self,
        name: &'static str,
        get: impl Fn(&T) -> &M + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut M + Send + Sync + 'static,
    ) -> MemberMapBuilder<'_, T> {
        self.declare::<M>(
            name,
            Visibility::Private,
            Getter::Ref(Arc::new(get)),
            Setter::Ref(Arc::new(get_mut)),
        )
    }

    /// Declares that `T` derives from `B`, embedding it in the field reached by `get`/`get_mut`.
    /// The members of `B` are mapped before those of `T`.
    pub fn inherits<B: Mapped>(
        &mut self,
        get: impl Fn(&T) -> &B + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut B + Send + Sync + 'static,
    ) -> &mut Self {
        if self.draft.base_declaration.is_some() {
            self.draft.fail("a class can only inherit from one base class");
        }
        self.draft.base_declaration = Some(BaseDeclaration {
            type_info: TypeInfo::of::<B>(),
            resolve: |registry| registry.lookup_class_map::<B>(),
            link: BaseLink::new(get, get_mut),
        });
        self
    }

    /// Names a class derived from `T` whose discriminator must be known when reading `T`.
    pub fn known_type<D: Mapped>(&mut self) -> &mut Self {
        self.annotate().add_known_type::<D>();
        self
    }

    /// Explicit class-level settings, equivalent to those given to
    /// [`Registry::register_class_map`].
    pub fn annotate(&mut self) -> ClassMapBuilder<'_, T> {
        ClassMapBuilder::new(&mut self.draft)
    }
}
