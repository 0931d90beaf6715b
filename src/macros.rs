/// Construct a [`Bson`](crate::Bson) value from a literal.
///
/// ```rust
/// use bson_mapping::bson;
///
/// let value = bson!({
///     "code": 200,
///     "success": true,
///     "payload": {
///         "some": [
///             "pay",
///             "loads",
///         ]
///     }
/// });
/// ```
#[macro_export]
macro_rules! bson {
    //////////////////////////////////////////////////////////////////////////
    // TT muncher for parsing the inside of an array [...]. Produces a vec![...]
    // of the elements.
    //
    // Must be invoked as: bson!(@array [] $($tt)*)
    //////////////////////////////////////////////////////////////////////////

    // Finished with trailing comma.
    (@array [$($elems:expr,)*]) => {
        vec![$($elems,)*]
    };

    // Finished without trailing comma.
    (@array [$($elems:expr),*]) => {
        vec![$($elems),*]
    };

    // Next element is `null`.
    (@array [$($elems:expr,)*] null $($rest:tt)*) => {
        $crate::bson!(@array [$($elems,)* $crate::bson!(null)] $($rest)*)
    };

    // Next element is an array.
    (@array [$($elems:expr,)*] [$($array:tt)*] $($rest:tt)*) => {
        $crate::bson!(@array [$($elems,)* $crate::bson!([$($array)*])] $($rest)*)
    };

    // Next element is a map.
    (@array [$($elems:expr,)*] {$($map:tt)*} $($rest:tt)*) => {
        $crate::bson!(@array [$($elems,)* $crate::bson!({$($map)*})] $($rest)*)
    };

    // Next element is an expression followed by comma.
    (@array [$($elems:expr,)*] $next:expr, $($rest:tt)*) => {
        $crate::bson!(@array [$($elems,)* $crate::bson!($next),] $($rest)*)
    };

    // Last element is an expression with no trailing comma.
    (@array [$($elems:expr,)*] $last:expr) => {
        $crate::bson!(@array [$($elems,)* $crate::bson!($last)])
    };

    // Comma after the most recent element.
    (@array [$($elems:expr),*] , $($rest:tt)*) => {
        $crate::bson!(@array [$($elems,)*] $($rest)*)
    };

    //////////////////////////////////////////////////////////////////////////
    // TT muncher for parsing the inside of a document {...}. Each entry is
    // appended to the given document variable.
    //
    // Must be invoked as: bson!(@object $doc () ($($tt)*) ($($tt)*))
    //////////////////////////////////////////////////////////////////////////

    // Done.
    (@object $object:ident () () ()) => {};

    // Insert the current entry followed by trailing comma.
    (@object $object:ident [$($key:tt)+] ($value:expr) , $($rest:tt)*) => {
        $object.insert(($($key)+), $value);
        $crate::bson!(@object $object () ($($rest)*) ($($rest)*));
    };

    // Insert the last entry without trailing comma.
    (@object $object:ident [$($key:tt)+] ($value:expr)) => {
        $object.insert(($($key)+), $value);
    };

    // Next value is `null`.
    (@object $object:ident ($($key:tt)+) (: null $($rest:tt)*) $copy:tt) => {
        $crate::bson!(@object $object [$($key)+] ($crate::bson!(null)) $($rest)*);
    };

    // Next value is an array.
    (@object $object:ident ($($key:tt)+) (: [$($array:tt)*] $($rest:tt)*) $copy:tt) => {
        $crate::bson!(@object $object [$($key)+] ($crate::bson!([$($array)*])) $($rest)*);
    };

    // Next value is a map.
    (@object $object:ident ($($key:tt)+) (: {$($map:tt)*} $($rest:tt)*) $copy:tt) => {
        $crate::bson!(@object $object [$($key)+] ($crate::bson!({$($map)*})) $($rest)*);
    };

    // Next value is an expression followed by comma.
    (@object $object:ident ($($key:tt)+) (: $value:expr , $($rest:tt)*) $copy:tt) => {
        $crate::bson!(@object $object [$($key)+] ($crate::bson!($value)) , $($rest)*);
    };

    // Last value is an expression with no trailing comma.
    (@object $object:ident ($($key:tt)+) (: $value:expr) $copy:tt) => {
        $crate::bson!(@object $object [$($key)+] ($crate::bson!($value)));
    };

    // Missing value for last entry.
    (@object $object:ident ($($key:tt)+) (:) $copy:tt) => {
        $crate::bson!();
    };

    // Key is fully parenthesized. This avoids clippy double_parens false
    // positives because the parenthesization may be necessary here.
    (@object $object:ident () (($key:expr) : $($rest:tt)*) $copy:tt) => {
        $crate::bson!(@object $object ($key) (: $($rest)*) (: $($rest)*));
    };

    // Munch a token into the current key.
    (@object $object:ident ($($key:tt)*) ($tt:tt $($rest:tt)*) $copy:tt) => {
        $crate::bson!(@object $object ($($key)* $tt) ($($rest)*) ($($rest)*));
    };

    //////////////////////////////////////////////////////////////////////////
    // The main implementation.
    //
    // Must be invoked as: bson!($($bson)+)
    //////////////////////////////////////////////////////////////////////////

    (null) => {
        $crate::Bson::Null
    };

    ([]) => {
        $crate::Bson::Array(vec![])
    };

    ([ $($tt:tt)+ ]) => {
        $crate::Bson::Array($crate::bson!(@array [] $($tt)+))
    };

    ({}) => {
        $crate::Bson::Document($crate::doc!{})
    };

    ({$($tt:tt)+}) => {
        $crate::Bson::Document($crate::doc!{$($tt)+})
    };

    // Any Into<Bson> type.
    // Must be below every other rule.
    ($other:expr) => {
        $crate::Bson::from($other)
    };
}

/// Construct a [`Document`](crate::Document) from a literal. Keys are any expression that
/// converts into a `String`; values are anything [`bson!`] accepts.
///
/// ```rust
/// use bson_mapping::doc;
///
/// let doc = doc! {
///    "code": 200,
///    "success": true,
///    "payload": {
///      "some": [
///          "pay",
///          "loads",
///      ]
///    }
/// };
/// assert_eq!(doc.len(), 3);
/// ```
#[macro_export]
macro_rules! doc {
    () => {{ $crate::Document::new() }};
    ( $($tt:tt)+ ) => {{
        let mut object = $crate::Document::new();
        $crate::bson!(@object object () ($($tt)+) ($($tt)+));
        object
    }};
}

/// Implement [`Mapped`](crate::Mapped) for a struct by declaring each listed field as a public
/// member.
///
/// A derived class names its base class and the field that embeds it:
///
/// ```rust
/// use bson_mapping::{Registry, bson_class, doc, serializers::Polymorphic};
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Animal {
///     name: String,
/// }
/// bson_class!(Animal { name });
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Dog {
///     animal: Animal,
///     breed: String,
/// }
/// bson_class!(Dog : Animal = animal { breed });
///
/// let registry = Registry::new();
/// let dog = Dog { animal: Animal { name: "Rex".into() }, breed: "Beagle".into() };
/// let doc = registry.to_document(&Polymorphic::<Animal>::new(dog))?;
/// assert_eq!(doc, doc! { "_t": "Dog", "name": "Rex", "breed": "Beagle" });
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
#[macro_export]
macro_rules! bson_class {
    ($name:ty : $base:ty = $base_field:ident { $($field:ident),* $(,)? }) => {
        impl $crate::Mapped for $name {
            fn describe(class: &mut $crate::ClassDescription<Self>) {
                class.inherits::<$base>(|v| &v.$base_field, |v| &mut v.$base_field);
                $(
                    class.field(stringify!($field), |v| &v.$field, |v| &mut v.$field);
                )*
            }
        }
    };

    ($name:ty { $($field:ident),* $(,)? }) => {
        impl $crate::Mapped for $name {
            fn describe(class: &mut $crate::ClassDescription<Self>) {
                $(
                    class.field(stringify!($field), |v| &v.$field, |v| &mut v.$field);
                )*
            }
        }
    };
}

/// Declare a C-like enum that is stored as its numeric value or its variant name.
///
/// ```rust
/// use bson_mapping::{Bson, Registry, bson_enum};
///
/// bson_enum! {
///     #[derive(Clone, Copy, Debug, PartialEq, Eq)]
///     pub enum Color {
///         Red = 1,
///         Green = 2,
///     }
/// }
///
/// let registry = Registry::new();
/// assert_eq!(registry.to_bson(&Color::Green)?, Bson::Int32(2));
/// assert_eq!(registry.from_bson::<Color>(Bson::String("Red".into()))?, Color::Red);
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
#[macro_export]
macro_rules! bson_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident $(= $value:expr)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$variant_meta])* $variant $(= $value)?),*
        }

        impl $crate::serializers::BsonEnum for $name {
            fn to_i64(self) -> i64 {
                self as i64
            }

            fn from_i64(value: i64) -> ::std::option::Option<Self> {
                $(
                    if value == $name::$variant as i64 {
                        return ::std::option::Option::Some($name::$variant);
                    }
                )*
                ::std::option::Option::None
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)*
                }
            }

            fn from_name(name: &str) -> ::std::option::Option<Self> {
                match name {
                    $(stringify!($variant) => ::std::option::Option::Some($name::$variant),)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl $crate::serializers::BsonValue for $name {
            const KIND: $crate::serializers::ValueKind = $crate::serializers::ValueKind::Enum;

            fn default_serializer(
                _registry: &$crate::Registry,
            ) -> $crate::error::Result<
                ::std::sync::Arc<dyn $crate::serializers::Serializer<Self>>,
            > {
                ::std::result::Result::Ok(::std::sync::Arc::new(
                    $crate::serializers::EnumSerializer::<Self>::new(),
                ))
            }
        }
    };
}
