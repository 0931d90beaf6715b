use std::{sync::Arc, time::Duration};

use super::{
    BsonValue,
    SerializationOptions,
    Serializer,
    ValueKind,
    numeric::Number,
    unexpected,
    unsupported_representation,
};
use crate::{
    Binary,
    Bson,
    DateTime,
    Decimal128,
    Document,
    Regex,
    Timestamp,
    error::{Error, Result},
    extjson::format_double,
    oid::ObjectId,
    registry::Registry,
    spec::ElementType,
    uuid::Uuid,
};

macro_rules! default_serializer {
    ($t:ty => $serializer:ident $(, $name:ident = $value:expr)*) => {
        impl BsonValue for $t {
            $(const $name: ValueKind = $value;)*

            fn default_serializer(_registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
                Ok(Arc::new($serializer))
            }
        }
    };
}

/// Serializes `bool` as a BSON boolean, a number (0 or 1) or the strings `"true"`/`"false"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoolSerializer;

impl Serializer<bool> for BoolSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &bool,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        let value = *value;
        Ok(match options.representation.unwrap_or(ElementType::Boolean) {
            ElementType::Boolean => Bson::Boolean(value),
            ElementType::Int32 => Bson::Int32(value.into()),
            ElementType::Int64 => Bson::Int64(value.into()),
            ElementType::Double => Bson::Double(u8::from(value).into()),
            ElementType::Decimal128 => Bson::Decimal128(u8::from(value).to_string().parse()?),
            ElementType::String => Bson::String(value.to_string()),
            other => return Err(unsupported_representation::<bool>(other)),
        })
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<bool> {
        match bson {
            Bson::Boolean(b) => Ok(b),
            Bson::Int32(i) => Ok(i != 0),
            Bson::Int64(i) => Ok(i != 0),
            Bson::Double(d) => Ok(d != 0.0 && !d.is_nan()),
            Bson::Decimal128(d) => Ok(d.to_string().parse::<f64>().is_ok_and(|f| f != 0.0)),
            Bson::String(ref s) => s
                .parse()
                .map_err(|_| Error::format(format!("{s:?} is not a valid bool"))),
            other => Err(unexpected::<bool>(&other)),
        }
    }
}

default_serializer!(bool => BoolSerializer);

/// Serializes `char` as a one-character string, or as its code point with the `Int32`
/// representation.
#[derive(Clone, Copy, Debug, Default)]
pub struct CharSerializer;

impl Serializer<char> for CharSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &char,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::String) {
            ElementType::String => Ok(Bson::String(value.to_string())),
            ElementType::Int32 => Ok(Bson::Int32(u32::from(*value) as i32)),
            other => Err(unsupported_representation::<char>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<char> {
        match bson {
            Bson::String(ref s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(Error::format(format!("{s:?} is not a single character"))),
                }
            }
            Bson::Int32(i) => u32::try_from(i)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Error::format(format!("{i} is not a valid character code point"))),
            other => Err(unexpected::<char>(&other)),
        }
    }
}

default_serializer!(char => CharSerializer);

/// Serializes `String` as a BSON string, a symbol, or an ObjectId parsed from hex.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringSerializer;

impl Serializer<String> for StringSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &String,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::String) {
            ElementType::String => Ok(Bson::String(value.clone())),
            ElementType::Symbol => Ok(Bson::Symbol(value.clone())),
            ElementType::ObjectId => Ok(Bson::ObjectId(ObjectId::parse_str(value)?)),
            other => Err(unsupported_representation::<String>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<String> {
        match bson {
            Bson::String(s) | Bson::Symbol(s) => Ok(s),
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            other => Err(unexpected::<String>(&other)),
        }
    }
}

default_serializer!(String => StringSerializer);

#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectIdSerializer;

impl Serializer<ObjectId> for ObjectIdSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &ObjectId,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::ObjectId) {
            ElementType::ObjectId => Ok(Bson::ObjectId(*value)),
            ElementType::String => Ok(Bson::String(value.to_hex())),
            other => Err(unsupported_representation::<ObjectId>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<ObjectId> {
        match bson {
            Bson::ObjectId(oid) => Ok(oid),
            Bson::String(s) => ObjectId::parse_str(s),
            other => Err(unexpected::<ObjectId>(&other)),
        }
    }
}

default_serializer!(ObjectId => ObjectIdSerializer);

/// Serializes [`DateTime`] as a BSON datetime, as milliseconds since the epoch (`Int64`), or as an
/// RFC 3339 string.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateTimeSerializer;

impl Serializer<DateTime> for DateTimeSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &DateTime,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::DateTime) {
            ElementType::DateTime => Ok(Bson::DateTime(*value)),
            ElementType::Int64 => Ok(Bson::Int64(value.timestamp_millis())),
            ElementType::String => Ok(Bson::String(value.try_to_rfc3339_string()?)),
            other => Err(unsupported_representation::<DateTime>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<DateTime> {
        match bson {
            Bson::DateTime(dt) => Ok(dt),
            Bson::Int64(ms) => Ok(DateTime::from_millis(ms)),
            Bson::Int32(ms) => Ok(DateTime::from_millis(ms.into())),
            Bson::String(s) => {
                DateTime::parse_rfc3339_str(&s).or_else(|_| DateTime::parse_iso8601(&s))
            }
            other => Err(unexpected::<DateTime>(&other)),
        }
    }
}

default_serializer!(DateTime => DateTimeSerializer);

/// Serializes [`Duration`] as whole milliseconds (`Int64`, the default, or `Int32`), or as seconds
/// (`Double` or `String`). Sub-millisecond precision is only dropped with `allow_truncation`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DurationSerializer;

impl Serializer<Duration> for DurationSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &Duration,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        let representation = options.representation.unwrap_or(ElementType::Int64);
        match representation {
            ElementType::Int64 | ElementType::Int32 => {
                if value.subsec_nanos() % 1_000_000 != 0 && !options.allow_truncation {
                    return Err(Error::format(format!(
                        "{value:?} cannot be stored as milliseconds without truncation"
                    )));
                }
                Number::Int(value.as_millis() as i128).to_bson::<Duration>(representation, options)
            }
            ElementType::Double => Ok(Bson::Double(value.as_secs_f64())),
            ElementType::String => Ok(Bson::String(format_double(value.as_secs_f64()))),
            other => Err(unsupported_representation::<Duration>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<Duration> {
        match bson {
            Bson::Int32(_) | Bson::Int64(_) => {
                let ms = Number::from_bson::<Duration>(&bson)?.to_integer::<Duration>(
                    0,
                    u64::MAX.into(),
                    options,
                )?;
                let ms = u64::try_from(ms).map_err(|_| invalid_duration(ms))?;
                Ok(Duration::from_millis(ms))
            }
            Bson::Double(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|_| invalid_duration(secs)),
            Bson::String(ref s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| invalid_duration(format!("{s:?}"))),
            other => Err(unexpected::<Duration>(&other)),
        }
    }
}

default_serializer!(Duration => DurationSerializer);

fn invalid_duration(value: impl std::fmt::Display) -> Error {
    Error::format(format!("{value} is not a valid duration"))
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Decimal128Serializer;

impl Serializer<Decimal128> for Decimal128Serializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &Decimal128,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::Decimal128) {
            ElementType::Decimal128 => Ok(Bson::Decimal128(*value)),
            ElementType::String => Ok(Bson::String(value.to_string())),
            ElementType::Double => {
                let text = value.to_string();
                let double = match text.as_str() {
                    "NaN" => f64::NAN,
                    "Infinity" => f64::INFINITY,
                    "-Infinity" => f64::NEG_INFINITY,
                    _ => text.parse().map_err(Error::format)?,
                };
                Ok(Bson::Double(double))
            }
            other => Err(unsupported_representation::<Decimal128>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<Decimal128> {
        match bson {
            Bson::Decimal128(d) => Ok(d),
            Bson::String(s) => s.parse(),
            Bson::Int32(i) => i.to_string().parse(),
            Bson::Int64(i) => i.to_string().parse(),
            Bson::Double(d) if d.is_nan() => "NaN".parse(),
            Bson::Double(d) if d.is_infinite() => {
                if d > 0.0 { "Infinity" } else { "-Infinity" }.parse()
            }
            Bson::Double(d) => format_double(d).parse(),
            other => Err(unexpected::<Decimal128>(&other)),
        }
    }
}

default_serializer!(Decimal128 => Decimal128Serializer);

/// Serializes [`Uuid`] as binary in the configured [`UuidRepresentation`](crate::uuid::UuidRepresentation),
/// or as a hyphenated string.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidSerializer;

impl Serializer<Uuid> for UuidSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &Uuid,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::Binary) {
            ElementType::Binary => Ok(Bson::Binary(Binary::from_uuid_with_representation(
                *value,
                options.uuid_representation,
            ))),
            ElementType::String => Ok(Bson::String(value.to_string())),
            other => Err(unsupported_representation::<Uuid>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        options: &SerializationOptions,
    ) -> Result<Uuid> {
        match bson {
            Bson::Binary(binary) => binary.to_uuid_with_representation(options.uuid_representation),
            Bson::String(s) => Uuid::parse_str(s),
            other => Err(unexpected::<Uuid>(&other)),
        }
    }
}

default_serializer!(Uuid => UuidSerializer, KIND = ValueKind::Guid);

#[derive(Clone, Copy, Debug, Default)]
pub struct BinarySerializer;

impl Serializer<Binary> for BinarySerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &Binary,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::Binary) {
            ElementType::Binary => Ok(Bson::Binary(value.clone())),
            ElementType::String => Ok(Bson::String(value.to_base64())),
            other => Err(unsupported_representation::<Binary>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<Binary> {
        match bson {
            Bson::Binary(binary) => Ok(binary),
            Bson::String(s) => Binary::from_base64(s, None),
            other => Err(unexpected::<Binary>(&other)),
        }
    }
}

default_serializer!(Binary => BinarySerializer);

/// Serializes [`Regex`] as a BSON regular expression, or as its `/pattern/options` text.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegexSerializer;

impl Serializer<Regex> for RegexSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &Regex,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::RegularExpression) {
            ElementType::RegularExpression => Ok(Bson::RegularExpression(value.clone())),
            ElementType::String => Ok(Bson::String(value.to_string())),
            other => Err(unsupported_representation::<Regex>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<Regex> {
        match bson {
            Bson::RegularExpression(regex) => Ok(regex),
            Bson::String(s) => match s.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
                Some((pattern, options)) => Ok(Regex::new(pattern, options)),
                None => Ok(Regex::new(s, "")),
            },
            other => Err(unexpected::<Regex>(&other)),
        }
    }
}

default_serializer!(Regex => RegexSerializer);

#[derive(Clone, Copy, Debug, Default)]
pub struct TimestampSerializer;

impl Serializer<Timestamp> for TimestampSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &Timestamp,
        options: &SerializationOptions,
    ) -> Result<Bson> {
        match options.representation.unwrap_or(ElementType::Timestamp) {
            ElementType::Timestamp => Ok(Bson::Timestamp(*value)),
            ElementType::Int64 => Ok(Bson::Int64(value.to_u64() as i64)),
            other => Err(unsupported_representation::<Timestamp>(other)),
        }
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<Timestamp> {
        match bson {
            Bson::Timestamp(ts) => Ok(ts),
            Bson::Int64(i) => Ok(Timestamp::from_u64(i as u64)),
            other => Err(unexpected::<Timestamp>(&other)),
        }
    }
}

default_serializer!(Timestamp => TimestampSerializer);

/// Passes [`Bson`] values through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct BsonSerializer;

impl Serializer<Bson> for BsonSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &Bson,
        _options: &SerializationOptions,
    ) -> Result<Bson> {
        Ok(value.clone())
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<Bson> {
        Ok(bson)
    }
}

impl BsonValue for Bson {
    const KIND: ValueKind = ValueKind::Document;
    const NULLABLE: bool = true;

    fn default_serializer(_registry: &Registry) -> Result<Arc<dyn Serializer<Self>>> {
        Ok(Arc::new(BsonSerializer))
    }

    fn is_null(&self) -> bool {
        Bson::is_null(self)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentSerializer;

impl Serializer<Document> for DocumentSerializer {
    fn serialize(
        &self,
        _registry: &Registry,
        value: &Document,
        _options: &SerializationOptions,
    ) -> Result<Bson> {
        Ok(Bson::Document(value.clone()))
    }

    fn deserialize(
        &self,
        _registry: &Registry,
        bson: Bson,
        _options: &SerializationOptions,
    ) -> Result<Document> {
        match bson {
            Bson::Document(doc) => Ok(doc),
            other => Err(unexpected::<Document>(&other)),
        }
    }
}

default_serializer!(Document => DocumentSerializer, KIND = ValueKind::Document);
