use std::{fmt, str::FromStr};

use crate::error::ByteCapacityParseError;

pub const KILOBYTE: u64 = 1000;
pub const MEGABYTE: u64 = 1000 * KILOBYTE;
pub const GIGABYTE: u64 = 1000 * MEGABYTE;
pub const TERABYTE: u64 = 1000 * GIGABYTE;

/// Byte amount expressed in decimal units, used to configure batch ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteCapacity {
    B(u64),
    KB(u64),
    MB(u64),
    GB(u64),
    TB(u64),
}

impl ByteCapacity {
    pub fn bytes(&self) -> u64 {
        match self {
            ByteCapacity::B(x) => *x,
            ByteCapacity::KB(x) => x.saturating_mul(KILOBYTE),
            ByteCapacity::MB(x) => x.saturating_mul(MEGABYTE),
            ByteCapacity::GB(x) => x.saturating_mul(GIGABYTE),
            ByteCapacity::TB(x) => x.saturating_mul(TERABYTE),
        }
    }
}

impl From<u64> for ByteCapacity {
    fn from(bytes: u64) -> Self {
        ByteCapacity::B(bytes)
    }
}

impl FromStr for ByteCapacity {
    type Err = ByteCapacityParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ByteCapacityParseError::Empty);
        }

        let split = input
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(input.len());
        let (digits, unit) = input.split_at(split);

        let constructor: fn(u64) -> ByteCapacity = match unit.trim() {
            "" | "B" => ByteCapacity::B,
            "KB" => ByteCapacity::KB,
            "MB" => ByteCapacity::MB,
            "GB" => ByteCapacity::GB,
            "TB" => ByteCapacity::TB,
            _ => return Err(ByteCapacityParseError::Invalid(input.to_owned())),
        };

        if digits.is_empty() {
            return Err(ByteCapacityParseError::Invalid(input.to_owned()));
        }
        let num = digits
            .parse()
            .map_err(|_| ByteCapacityParseError::Overflow(input.to_owned()))?;

        Ok(constructor(num))
    }
}

impl fmt::Display for ByteCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteCapacity::B(x) => write!(f, "{}B", x),
            ByteCapacity::KB(x) => write!(f, "{}KB", x),
            ByteCapacity::MB(x) => write!(f, "{}MB", x),
            ByteCapacity::GB(x) => write!(f, "{}GB", x),
            ByteCapacity::TB(x) => write!(f, "{}TB", x),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ByteCapacity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Visitor;

        struct U64OrStringVisitor;

        impl Visitor<'_> for U64OrStringVisitor {
            type Value = ByteCapacity;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a u64 or a \\d+(B|KB|MB|GB|TB) string")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ByteCapacity::B(v))
            }

            fn visit_str<E>(self, str: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                str.parse().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(U64OrStringVisitor)
    }
}
