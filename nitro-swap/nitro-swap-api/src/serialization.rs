//! Serialization helpers for the router API types

/// A module for serializing and deserializing U256 as decimal strings
pub mod u256_string_serialization {
    use alloy_primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize a U256 to a decimal string
    pub fn serialize<S: Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    /// Deserialize a decimal string to a U256
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let s = String::deserialize(d)?;
        U256::from_str_radix(s.trim(), 10).map_err(|_| D::Error::custom("Invalid U256 value"))
    }
}

/// A module for deserializing numeric values that the router API sends either
/// as JSON numbers or as strings, e.g. chain ids
pub mod u64_or_string_serialization {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// The two encodings accepted on the wire
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        /// A JSON number
        Number(u64),
        /// A decimal string
        String(String),
    }

    /// Serialize a u64 as a JSON number
    pub fn serialize<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(*value)
    }

    /// Deserialize a u64 from either a number or a decimal string
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match NumberOrString::deserialize(d)? {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => {
                s.trim().parse().map_err(|_| D::Error::custom("Invalid numeric string"))
            },
        }
    }
}
