use std::{any::type_name, marker::PhantomData, sync::Arc};

use super::{BsonValue, SerializationOptions, Serializer, unexpected, unsupported_representation};
use crate::{
    Bson,
    Decimal128,
    error::{Error, Result},
    extjson::format_double,
    registry::Registry,
    spec::ElementType,
};

/// The value of a number in transit between representations.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

fn overflow<N>(value: impl std::fmt::Display) -> Error {
    Error::format(format!("{value} overflows {}", type_name::<N>()))
}

fn truncation<N>(value: impl std::fmt::Display) -> Error {
    Error::format(format!("{value} cannot be stored in {} without truncation", type_name::<N>()))
}

impl Number {
    fn parse(text: &str) -> Option<Number> {
        text.parse()
            .map(Number::Int)
            .ok()
            .or_else(|| text.parse().map(Number::Float).ok())
    }

    pub(crate) fn from_bson<N>(bson: &Bson) -> Result<Number> {
        let number = match bson {
            Bson::Int32(i) => Some(Number::Int((*i).into())),
            Bson::Int64(i) => Some(Number::Int((*i).into())),
            Bson::Double(d) => Some(Number::Float(*d)),
            Bson::Decimal128(d) => Number::parse(&d.to_string()),
            Bson::String(s) => Number::parse(s.trim()),
            _ => return Err(unexpected::<N>(bson)),
        };
        number.ok_or_else(|| Error::format(format!("{bson} is not a valid {}", type_name::<N>())))
    }

    /// Converts to an integer in `min..=max`. With `allow_overflow` the result may lie outside the
    /// range and is wrapped by the caller's cast.
    pub(crate) fn to_integer<N>(
        self,
        min: i128,
        max: i128,
        options: &SerializationOptions,
    ) -> Result<i128> {
        let value = match self {
            Number::Int(i) => i,
            Number::Float(f) => {
                if !f.is_finite() && !options.allow_overflow {
                    return Err(overflow::<N>(f));
                }
                if f.fract() != 0.0 && f.is_finite() && !options.allow_truncation {
                    return Err(truncation::<N>(f));
                }
                f.trunc() as i128
            }
        };
        if (value < min || value > max) && !options.allow_overflow {
            return Err(overflow::<N>(value));
        }
        Ok(value)
    }

    pub(crate) fn to_f64<N>(self, options: &SerializationOptions) -> Result<f64> {
        match self {
            Number::Float(f) => Ok(f),
            Number::Int(i) => {
                let f = i as f64;
                if f as i128 != i && !options.allow_truncation {
                    return Err(truncation::<N>(i));
                }
                Ok(f)
            }
        }
    }

    pub(crate) fn to_f32<N>(self, options: &SerializationOptions) -> Result<f32> {
        let f = self.to_f64::<N>(options)?;
        let narrowed = f as f32;
        if f.is_finite() {
            if narrowed.is_infinite() && !options.allow_overflow {
                return Err(overflow::<N>(f));
            }
            if f64::from(narrowed) != f && !narrowed.is_infinite() && !options.allow_truncation {
                return Err(truncation::<N>(f));
            }
        }
        Ok(narrowed)
    }

    /// Stores this number as the given BSON type.
    pub(crate) fn to_bson<N>(
        self,
        representation: ElementType,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        Ok(match representation {
            ElementType::Int32 => Bson::Int32(
                self.to_integer::<i32>(i32::MIN.into(), i32::MAX.into(), options)? as i32,
            ),
            ElementType::Int64 => Bson::Int64(
                self.to_integer::<i64>(i64::MIN.into(), i64::MAX.into(), options)? as i64,
            ),
            ElementType::Double => Bson::Double(self.to_f64::<f64>(options)?),
            ElementType::Decimal128 => Bson::Decimal128(self.to_text().parse::<Decimal128>()?),
            ElementType::String => Bson::String(self.to_text()),
            other => return Err(unsupported_representation::<N>(other)),
        })
    }

    fn to_text(self) -> String {
        match self {
            Number::Int(i) => i.to_string(),
            Number::Float(f) if f.is_nan() => "NaN".to_string(),
            Number::Float(f) if f.is_infinite() => {
                if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
            }
            Number::Float(f) => format_double(f),
        }
    }
}

/// A Rust numeric type handled by [`NumericSerializer`].
pub trait Numeric: BsonValue + Copy {
    /// The representation used when none is configured.
    const DEFAULT_REPRESENTATION: ElementType;

    #[doc(hidden)]
    fn to_number(self) -> Number;

    #[doc(hidden)]
    fn from_number(number: Number, options: &SerializationOptions) -> Result<Self>;
}

/// Serializes the primitive numeric types. Writing to a narrower representation fails unless
/// `allow_overflow` or `allow_truncation` permit the loss.
pub struct NumericSerializer<N>(PhantomData<fn() -> N>);

impl<N> NumericSerializer<N> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<N> Default for NumericSerializer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Numeric> Serializer<N> for NumericSerializer<N> {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &N,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        let representation = options.representation.unwrap_or(N::DEFAULT_REPRESENTATION);
        value.to_number().to_bson::<N>(representation, options)
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<N> {
        N::from_number(Number::from_bson::<N>(&bson)?, options)
    }
}

macro_rules! integer {
    ($($t:ty => $rep:ident),+ $(,)?) => {$(
        impl Numeric for $t {
            const DEFAULT_REPRESENTATION: ElementType = ElementType::$rep;

            fn to_number(self) -> Number {
                Number::Int(self.into())
            }

            fn from_number(number: Number, options: &SerializationOptions) -> Result<Self> {
                let value = number.to_integer::<$t>(<$t>::MIN.into(), <$t>::MAX.into(), options)?;
                Ok(value as $t)
            }
        }

        impl BsonValue for $t {
            fn default_serializer(_registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
                Ok(Arc::new(NumericSerializer::<$t>::new()))
            }
        }
    )+};
}

integer! {
    i8 => Int32,
    i16 => Int32,
    i32 => Int32,
    i64 => Int64,
    u8 => Int32,
    u16 => Int32,
    u32 => Int64,
    u64 => Int64,
}

impl Numeric for f64 {
    const DEFAULT_REPRESENTATION: ElementType = ElementType::Double;

    fn to_number(self) -> Number {
        Number::Float(self)
    }

    fn from_number(number: Number, options: &SerializationOptions) -> Result<Self> {
        number.to_f64::<f64>(options)
    }
}

impl Numeric for f32 {
    const DEFAULT_REPRESENTATION: ElementType = ElementType::Double;

    fn to_number(self) -> Number {
        Number::Float(self.into())
    }

    fn from_number(number: Number, options: &SerializationOptions) -> Result<Self> {
        number.to_f32::<f32>(options)
    }
}

impl BsonValue for f64 {
    fn default_serializer(_registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(NumericSerializer::<f64>::new()))
    }
}

impl BsonValue for f32 {
    fn default_serializer(_registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(NumericSerializer::<f32>::new()))
    }
}
