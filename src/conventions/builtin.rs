use std::any::TypeId;

use super::Convention;
use crate::{
    Document,
    class_map::{ClassMapDraft, ID_ELEMENT, Visibility},
    error::{Error, Result},
    serializers::{DictionaryRepresentation, ValueKind},
    spec::ElementType,
    uuid::UuidRepresentation,
};

/// Maps every public member that can be both read and written.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemberFinderConvention;

impl Convention for MemberFinderConvention {
    fn name(&self) -> &str {
        "MemberFinder"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            if member.visibility() == Visibility::Public && member.can_read() && member.can_write()
            {
                member.set_mapped(true);
            }
        }
    }
}

/// Uses the member name as the element name.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemberNameElementNameConvention;

impl Convention for MemberNameElementNameConvention {
    fn name(&self) -> &str {
        "MemberNameElementName"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            member.set_element_name(member.name());
        }
    }
}

/// Converts member names to camel case: `first_name` and `FirstName` become `firstName`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CamelCaseElementNameConvention;

impl Convention for CamelCaseElementNameConvention {
    fn name(&self) -> &str {
        "CamelCaseElementName"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            member.set_element_name(camel_case(member.name()));
        }
    }
}

/// Converts member names to snake case: `firstName` and `FirstName` become `first_name`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnderscoreElementNameConvention;

impl Convention for UnderscoreElementNameConvention {
    fn name(&self) -> &str {
        "UnderscoreElementName"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            member.set_element_name(snake_case(member.name()));
        }
    }
}

pub(crate) fn camel_case(name: &str) -> String {
    let body = name.trim_start_matches('_');
    let mut out = String::with_capacity(name.len());
    out.push_str(&name[..name.len() - body.len()]);
    for (i, word) in body.split('_').filter(|w| !w.is_empty()).enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

pub(crate) fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if previous_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            previous_lower = false;
        } else {
            out.push(c);
            previous_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Makes the first member whose name is in the candidate list the id member, unless the id has
/// already been decided or a base class declares one.
#[derive(Clone, Debug)]
pub struct IdMemberConvention {
    names: Vec<String>,
}

impl IdMemberConvention {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for IdMemberConvention {
    fn default() -> Self {
        Self::new(["Id", "id", ID_ELEMENT])
    }
}

impl Convention for IdMemberConvention {
    fn name(&self) -> &str {
        "IdMember"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        if class.has_id_decision() || class.base().is_some_and(|b| b.id_member_map().is_some()) {
            return;
        }
        let found = self
            .names
            .iter()
            .find_map(|name| class.member(name).map(|m| m.name()));
        if let Some(name) = found {
            class.set_id_member(name);
        }
    }
}

/// Decides that classes have no id member.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIdMemberConvention;

impl Convention for NoIdMemberConvention {
    fn name(&self) -> &str {
        "NoIdMember"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        class.set_no_id_member();
    }
}

/// Sets whether unknown elements are ignored when reading.
#[derive(Clone, Copy, Debug)]
pub struct IgnoreExtraElementsConvention(pub bool);

impl Convention for IgnoreExtraElementsConvention {
    fn name(&self) -> &str {
        "IgnoreExtraElements"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        class.set_ignore_extra_elements(self.0);
    }
}

/// Sets whether null members are left out when writing.
#[derive(Clone, Copy, Debug)]
pub struct IgnoreIfNullConvention(pub bool);

impl Convention for IgnoreIfNullConvention {
    fn name(&self) -> &str {
        "IgnoreIfNull"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            member.set_ignore_if_null(self.0);
        }
    }
}

/// Sets whether members equal to their default value are left out when writing.
#[derive(Clone, Copy, Debug)]
pub struct IgnoreIfDefaultConvention(pub bool);

impl Convention for IgnoreIfDefaultConvention {
    fn name(&self) -> &str {
        "IgnoreIfDefault"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            member.set_ignore_if_default(self.0);
        }
    }
}

/// Sets the representation of enum members.
#[derive(Clone, Copy, Debug)]
pub struct EnumRepresentationConvention {
    representation: ElementType,
}

impl EnumRepresentationConvention {
    /// Fails unless `representation` is `Int32`, `Int64` or `String`.
    pub fn new(representation: ElementType) -> Result<Self> {
        match representation {
            ElementType::Int32 | ElementType::Int64 | ElementType::String => {
                Ok(Self { representation })
            }
            other => Err(Error::unsupported(format!(
                "enums cannot be represented as BSON {other:?}"
            ))),
        }
    }

    pub fn representation(&self) -> ElementType {
        self.representation
    }
}

impl Convention for EnumRepresentationConvention {
    fn name(&self) -> &str {
        "EnumRepresentation"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            if member.type_info().kind() == ValueKind::Enum {
                member.set_representation(self.representation);
            }
        }
    }
}

/// Sets the binary layout of UUID members.
#[derive(Clone, Copy, Debug)]
pub struct GuidRepresentationConvention(pub UuidRepresentation);

impl Convention for GuidRepresentationConvention {
    fn name(&self) -> &str {
        "GuidRepresentation"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            if member.type_info().kind() == ValueKind::Guid {
                member.set_uuid_representation(self.0);
            }
        }
    }
}

/// Sets how map members are stored.
#[derive(Clone, Copy, Debug)]
pub struct DictionaryRepresentationConvention(pub DictionaryRepresentation);

impl Convention for DictionaryRepresentationConvention {
    fn name(&self) -> &str {
        "DictionaryRepresentation"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        for member in class.members_mut() {
            if member.type_info().kind() == ValueKind::Dictionary {
                member.set_dictionary_representation(self.0);
            }
        }
    }
}

/// Makes a [`Document`] member with one of the candidate names collect the elements that match
/// no other member.
#[derive(Clone, Debug)]
pub struct ExtraElementsMemberConvention {
    names: Vec<String>,
}

impl ExtraElementsMemberConvention {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ExtraElementsMemberConvention {
    fn default() -> Self {
        Self::new(["ExtraElements", "extra_elements"])
    }
}

impl Convention for ExtraElementsMemberConvention {
    fn name(&self) -> &str {
        "ExtraElementsMember"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        if class.extra_elements_member().is_some()
            || class
                .base()
                .is_some_and(|b| b.extra_elements_member_map().is_some())
        {
            return;
        }
        let found = self.names.iter().find_map(|name| {
            class
                .member(name)
                .filter(|m| m.type_info().id() == TypeId::of::<Document>())
                .map(|m| m.name())
        });
        if let Some(name) = found {
            class.set_extra_elements_member(name);
        }
    }
}

/// Gives the id member the generator registered for its type, unless it already has one.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGeneratorConvention;

impl Convention for IdGeneratorConvention {
    fn name(&self) -> &str {
        "IdGenerator"
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        let Some(name) = class.id_member() else {
            return;
        };
        let generator = class
            .member(name)
            .filter(|m| !m.has_id_generator())
            .and_then(|m| class.lookup_id_generator(m.type_info().id()));
        if let (Some(generator), Some(member)) = (generator, class.member_mut(name)) {
            member.set_id_generator(generator);
        }
    }
}

/// A convention defined by a closure.
pub struct DelegateConvention {
    name: String,
    action: Box<dyn Fn(&mut ClassMapDraft) + Send + Sync>,
}

impl DelegateConvention {
    pub fn new(
        name: impl Into<String>,
        action: impl Fn(&mut ClassMapDraft) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }
}

impl Convention for DelegateConvention {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, class: &mut ClassMapDraft) {
        (self.action)(class)
    }
}
