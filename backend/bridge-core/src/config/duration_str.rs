//! `serde(with)` adapter storing a `Duration` as a humantime string.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer, de::Error as DeError};

pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(DeError::custom)
}
