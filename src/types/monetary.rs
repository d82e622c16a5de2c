use crate::types::errors::MonetaryError;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DECIMAL_PLACES: usize = 4;
const SCALE: i64 = 10i64.pow(DECIMAL_PLACES as u32);

/// Fixed-point amount of money, stored as a count of minor units (1/10000).
///
/// Serialized as decimal text so that no JSON layer ever turns it into a float.
/// Deserialization accepts both decimal text and JSON numbers.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Monetary(i64);

impl Monetary {
    pub fn zero() -> Self {
        Monetary(0)
    }

    #[cfg(test)]
    pub fn from_minor_units(units: i64) -> Self {
        Monetary(units)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Monetary) -> Option<Monetary> {
        self.0.checked_add(rhs.0).map(Monetary)
    }

    #[cfg(test)]
    pub fn checked_sub(self, rhs: Monetary) -> Option<Monetary> {
        self.0.checked_sub(rhs.0).map(Monetary)
    }

    pub fn checked_neg(self) -> Option<Monetary> {
        self.0.checked_neg().map(Monetary)
    }
}

impl Display for Monetary {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let integer = abs / SCALE as u64;
        let fraction = abs % SCALE as u64;
        write!(formatter, "{}{}.{:0width$}", sign, integer, fraction, width = DECIMAL_PLACES)
    }
}

impl FromStr for Monetary {
    type Err = MonetaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if value.is_empty() {
            return Err(MonetaryError::InvalidFormat("Value is an empty string".to_string()));
        }

        let (integer_part, fraction_part) = match value.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (value, None)
        };

        if fraction_part.is_some_and(|fraction| fraction.contains('.')) {
            return Err(MonetaryError::InvalidFormat("Value has more than one decimal point".to_string()));
        }

        let integer: i64 = integer_part.parse().map_err(|error| {
            MonetaryError::InvalidFormat(format!("Value has an invalid integer part: {:?}", error))
        })?;

        let fraction: i64 = match fraction_part {
            Some(fraction) => {
                if fraction.len() > DECIMAL_PLACES {
                    return Err(MonetaryError::TooPrecise(DECIMAL_PLACES as u32));
                }

                if !fraction.chars().all(|c| c.is_ascii_digit()) {
                    return Err(MonetaryError::InvalidFormat("Value has an invalid fraction part".to_string()));
                }

                let padded = format!("{:0<width$}", fraction, width = DECIMAL_PLACES);

                padded.parse().map_err(|error| {
                    MonetaryError::InvalidFormat(format!("Value has an invalid fraction part: {:?}", error))
                })?
            }
            None => 0
        };

        let sign = if value.starts_with('-') { -1 } else { 1 };
        let result = integer.checked_mul(SCALE)
            .and_then(|v| v.checked_add(sign * fraction))
            .ok_or(MonetaryError::Overflow)?;

        Ok(Monetary(result))
    }
}

impl From<Monetary> for Decimal {
    fn from(value: Monetary) -> Self {
        Decimal::new(value.0, DECIMAL_PLACES as u32)
    }
}

impl TryFrom<Decimal> for Monetary {
    type Error = MonetaryError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let mut value = value.normalize();

        if value.scale() > DECIMAL_PLACES as u32 {
            return Err(MonetaryError::TooPrecise(DECIMAL_PLACES as u32));
        }

        value.rescale(DECIMAL_PLACES as u32);

        i64::try_from(value.mantissa())
            .map(Monetary)
            .map_err(|_| MonetaryError::Overflow)
    }
}

impl Serialize for Monetary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Monetary {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Monetary::try_from(value).map_err(de::Error::custom)
    }
}
