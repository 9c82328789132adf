//! Serde helpers for nullable store columns.
//!
//! The hosted store returns `null` for most optional columns instead of
//! omitting them, so `#[serde(default)]` alone is not enough. Each helper
//! decodes the column as an `Option` and resolves `None` to the documented
//! fallback.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Boolean flags whose column default is `true` (e.g. `active`).
pub fn or_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

/// Minimum order quantities: anything missing or below one becomes one.
pub fn at_least_one<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| u32::try_from(v).ok()).filter(|v| *v >= 1).unwrap_or(1))
}

/// Optional enum columns written by other clients: unknown values read as `None`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

pub(crate) fn default_true() -> bool { true }

pub(crate) fn default_one() -> u32 { 1 }
