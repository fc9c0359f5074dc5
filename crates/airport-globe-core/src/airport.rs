//! Airport records as they appear in the input dataset

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::entity::EntityId;

/// One airport from the dataset
///
/// `airport_id` may be a JSON string or number; both become an [`EntityId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRecord {
    #[serde(deserialize_with = "deserialize_airport_id")]
    pub airport_id: EntityId,
    pub name: String,
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
    /// Zero means "no data": the record is not rendered
    pub altitude: f64,
}

impl AirportRecord {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        AirportRecord::deserialize(value)
    }

    /// Records with an altitude of exactly zero carry no data
    pub fn has_altitude(&self) -> bool {
        self.altitude != 0.0
    }
}

fn deserialize_airport_id<'de, D>(deserializer: D) -> Result<EntityId, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Ok(EntityId(s)),
        Value::Number(n) => Ok(EntityId(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "airport_id must be a non-empty string or a number, got {}",
            other
        ))),
    }
}
