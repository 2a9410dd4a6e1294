use chrono::{DateTime, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier of a persisted row, assigned by the record store on insert.
///
/// The store is loose about this column on the wire: the same int8 id can
/// arrive as a JSON number or as a decimal string depending on the path it
/// took. Both forms parse to the same id; serialization always emits a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Self),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RecordId::from_value(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid record id: {}", value)))
    }
}

/// The two tables the dashboard persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Goals,
    Events,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goals => "goals",
            Self::Events => "events",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    CreatedDesc,
    CreatedAsc,
}

impl Order {
    /// Query form understood by the store's REST API.
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::CreatedDesc => "created_at.desc",
            Self::CreatedAsc => "created_at.asc",
        }
    }
}

/// A raw row as persisted: untyped info blob plus store-managed metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub id: RecordId,
    pub user_id: String,
    pub info: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
