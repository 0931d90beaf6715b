//! [BSON Decimal128](https://github.com/mongodb/specifications/blob/master/source/bson-decimal128/decimal128.rst) data type representation

use std::{fmt, str::FromStr};

use crate::error::{Decimal128ErrorKind, Error, Result};

const EXPONENT_BIAS: i32 = 6176;
const EXPONENT_MIN: i32 = -6176;
const EXPONENT_MAX: i32 = 6111;
const MAX_DIGITS: usize = 34;
const COEFFICIENT_HIGH_MASK: u64 = (1 << 49) - 1;

/// Struct representing a BSON Decimal128 type.
///
/// The value is kept in its IEEE 754-2008 128-bit binary integer decimal (BID) encoding. Parsing
/// and formatting follow the decimal string rules shared by all MongoDB drivers.
///
/// ```
/// use bson_mapping::Decimal128;
///
/// let d: Decimal128 = "1.5E+40".parse()?;
/// assert_eq!(d.to_string(), "1.5E+40");
/// # Ok::<(), bson_mapping::error::Error>(())
/// ```
#[derive(Copy, Clone, Hash, PartialEq, Eq)]
pub struct Decimal128 {
    /// BSON bytes containing the decimal128. Stored for round tripping.
    pub(crate) bytes: [u8; 16],
}

impl Decimal128 {
    /// Constructs a new `Decimal128` from the provided raw byte representation.
    pub fn from_bytes(bytes: [u8; 128 / 8]) -> Self {
        Self { bytes }
    }

    /// Returns the raw byte representation of this `Decimal128`.
    pub fn bytes(&self) -> [u8; 128 / 8] {
        self.bytes
    }

    fn from_parts(negative: bool, exponent: i32, coefficient: u128) -> Self {
        let biased = (exponent + EXPONENT_BIAS) as u64;
        let mut high = (biased << 49) | ((coefficient >> 64) as u64 & COEFFICIENT_HIGH_MASK);
        if negative {
            high |= 1 << 63;
        }
        Self::from_halves(high, coefficient as u64)
    }

    fn from_halves(high: u64, low: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&low.to_le_bytes());
        bytes[8..].copy_from_slice(&high.to_le_bytes());
        Self { bytes }
    }

    fn halves(&self) -> (u64, u64) {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&self.bytes[..8]);
        high.copy_from_slice(&self.bytes[8..]);
        (u64::from_le_bytes(high), u64::from_le_bytes(low))
    }

    fn decode(&self) -> Decoded {
        let (high, low) = self.halves();
        let negative = high >> 63 == 1;
        let combination = (high >> 58) & 0x1F;
        if combination == 0x1F {
            return Decoded::NaN;
        }
        if combination == 0x1E {
            return Decoded::Infinity { negative };
        }

        let (exponent, coefficient) = if (high >> 61) & 0b11 == 0b11 {
            // the implicit 100 prefix always exceeds the largest valid coefficient
            ((high >> 47) & 0x3FFF, 0)
        } else {
            let coefficient = (((high & COEFFICIENT_HIGH_MASK) as u128) << 64) | low as u128;
            let coefficient = if coefficient > max_coefficient() {
                0
            } else {
                coefficient
            };
            ((high >> 49) & 0x3FFF, coefficient)
        };

        Decoded::Finite {
            negative,
            exponent: exponent as i32 - EXPONENT_BIAS,
            coefficient,
        }
    }

    /// Whether this value is NaN.
    pub fn is_nan(&self) -> bool {
        matches!(self.decode(), Decoded::NaN)
    }

    /// Whether this value is positive or negative infinity.
    pub fn is_infinite(&self) -> bool {
        matches!(self.decode(), Decoded::Infinity { .. })
    }
}

enum Decoded {
    NaN,
    Infinity {
        negative: bool,
    },
    Finite {
        negative: bool,
        exponent: i32,
        coefficient: u128,
    },
}

fn max_coefficient() -> u128 {
    10u128.pow(MAX_DIGITS as u32) - 1
}

impl Default for Decimal128 {
    fn default() -> Self {
        Self::from_parts(false, 0, 0)
    }
}

impl FromStr for Decimal128 {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let unparseable = || Error::decimal128_unparseable(input);

        let (negative, body) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };

        if body.eq_ignore_ascii_case("nan") {
            return Ok(Self::from_halves(0x7C00_0000_0000_0000, 0));
        }
        if body.eq_ignore_ascii_case("infinity") || body.eq_ignore_ascii_case("inf") {
            let high = 0x7800_0000_0000_0000 | if negative { 1 << 63 } else { 0 };
            return Ok(Self::from_halves(high, 0));
        }

        let (mantissa, exponent_part) = match body.find(['e', 'E']) {
            Some(i) => (&body[..i], Some(&body[i + 1..])),
            None => (body, None),
        };
        let mut exponent: i32 = match exponent_part {
            Some(e) => {
                let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(unparseable());
                }
                // large exponents are clamped below, so saturate instead of failing
                e.parse::<i64>()
                    .map(|v| v.clamp(i32::MIN as i64 / 2, i32::MAX as i64 / 2) as i32)
                    .unwrap_or(if e.starts_with('-') { i32::MIN / 2 } else { i32::MAX / 2 })
            }
            None => 0,
        };

        let (integral, fractional) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        if integral.is_empty() && fractional.is_empty()
            || !integral.bytes().chain(fractional.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(unparseable());
        }
        exponent = exponent.saturating_sub(fractional.len() as i32);

        let all_digits: String = integral.chars().chain(fractional.chars()).collect();
        let mut digits = all_digits.trim_start_matches('0');
        if digits.is_empty() {
            let exponent = exponent.clamp(EXPONENT_MIN, EXPONENT_MAX);
            return Ok(Self::from_parts(negative, exponent, 0));
        }

        // drop exact trailing zeros that do not fit in 34 digits
        while digits.len() > MAX_DIGITS {
            match digits.strip_suffix('0') {
                Some(rest) => {
                    digits = rest;
                    exponent = exponent.saturating_add(1);
                }
                None => {
                    return Err(Error::decimal128(Decimal128ErrorKind::InexactRounding));
                }
            }
        }
        let mut coefficient: u128 = digits.parse().map_err(|_| unparseable())?;
        let mut precision = digits.len();

        while exponent > EXPONENT_MAX {
            if coefficient == 0 || precision >= MAX_DIGITS {
                return Err(Error::decimal128(Decimal128ErrorKind::Overflow));
            }
            coefficient *= 10;
            precision += 1;
            exponent -= 1;
        }
        while exponent < EXPONENT_MIN {
            if coefficient % 10 != 0 {
                return Err(Error::decimal128(Decimal128ErrorKind::InexactRounding));
            }
            coefficient /= 10;
            exponent += 1;
        }

        Ok(Self::from_parts(negative, exponent, coefficient))
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (negative, exponent, coefficient) = match self.decode() {
            Decoded::NaN => return f.write_str("NaN"),
            Decoded::Infinity { negative: true } => return f.write_str("-Infinity"),
            Decoded::Infinity { negative: false } => return f.write_str("Infinity"),
            Decoded::Finite {
                negative,
                exponent,
                coefficient,
            } => (negative, exponent, coefficient),
        };

        if negative {
            f.write_str("-")?;
        }

        let digits = coefficient.to_string();
        let adjusted = exponent + digits.len() as i32 - 1;

        if exponent <= 0 && adjusted >= -6 {
            if exponent == 0 {
                return f.write_str(&digits);
            }
            let point = digits.len() as i32 + exponent;
            if point > 0 {
                let (whole, fraction) = digits.split_at(point as usize);
                write!(f, "{whole}.{fraction}")
            } else {
                write!(f, "0.{}{digits}", "0".repeat((-point) as usize))
            }
        } else {
            let (first, rest) = digits.split_at(1);
            f.write_str(first)?;
            if !rest.is_empty() {
                write!(f, ".{rest}")?;
            }
            write!(f, "E{adjusted:+}")
        }
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128({self})")
    }
}
