use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use super::record::{RecordId, Row};

/// Longest title the surfaces accept.
pub const TITLE_MAX: usize = 50;
/// Longest free-form description.
pub const DESC_MAX: usize = 200;
/// Longest display color string.
pub const COLOR_MAX: usize = 16;
/// Color assigned to to-do items created without an explicit choice.
pub const DEFAULT_TODO_COLOR: &str = "#00ffff";

/// Shape of the `info` blob stored per event row.
///
/// `todo` is the projection discriminator: true routes the event to the
/// to-do list, false to the calendar grid. Wire keys keep the store's
/// spellings (`allday`, `toDo`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub desc: String,
    pub color: String,
    pub all_day: bool,
    pub todo: bool,
}

impl Default for EventInfo {
    fn default() -> Self {
        Self {
            title: String::new(),
            start: DateTime::UNIX_EPOCH,
            end: DateTime::UNIX_EPOCH,
            desc: String::new(),
            color: String::new(),
            all_day: false,
            todo: false,
        }
    }
}

impl EventInfo {
    /// Normalize an untyped info blob into a fully-populated record.
    ///
    /// Same contract as [`crate::core::goal::GoalInfo::parse`]: total and
    /// deterministic. Invalid time fields fall back to the Unix epoch (never
    /// the wall clock, so the same input always parses the same way), and a
    /// missing end collapses onto the start. After this returns, `todo` is a
    /// definite boolean, so an event is in exactly one projection.
    pub fn parse(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };
        if !obj.contains_key("title") {
            return Self::default();
        }

        let start = parse_epoch_ms(obj.get("start")).unwrap_or(DateTime::UNIX_EPOCH);
        Self {
            title: str_or_empty(obj.get("title")),
            start,
            end: parse_epoch_ms(obj.get("end")).unwrap_or(start),
            desc: str_or_empty(obj.get("desc")),
            color: str_or_empty(obj.get("color")),
            all_day: matches!(obj.get("allday"), Some(Value::Bool(true))),
            todo: matches!(obj.get("toDo"), Some(Value::Bool(true))),
        }
    }

    /// Wire form written back to the store (times as epoch milliseconds).
    pub fn to_value(&self) -> Value {
        json!({
            "start": self.start.timestamp_millis(),
            "end": self.end.timestamp_millis(),
            "title": self.title,
            "desc": self.desc,
            "color": self.color,
            "allday": self.all_day,
            "toDo": self.todo,
        })
    }
}

fn str_or_empty(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn parse_epoch_ms(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let ms = value?.as_f64()?;
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

/// An event row with its info blob parsed.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: RecordId,
    pub owner: String,
    pub info: EventInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EventRecord {
    pub fn from_row(row: Row) -> Self {
        Self {
            id: row.id,
            owner: row.user_id,
            info: EventInfo::parse(&row.info),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn is_todo(&self) -> bool {
        self.info.todo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn parse_well_formed_round_trips() {
        let raw = json!({
            "start": 1772534400000i64,
            "end": 1772538000000i64,
            "title": "Standup",
            "desc": "daily",
            "color": "#00ffff",
            "allday": false,
            "toDo": true,
        });
        let info = EventInfo::parse(&raw);
        assert_eq!(info.title, "Standup");
        assert_eq!(info.start, epoch_ms(1772534400000));
        assert_eq!(info.end, epoch_ms(1772538000000));
        assert!(info.todo);
        assert_eq!(info.to_value(), raw);
    }

    #[test]
    fn parse_missing_title_yields_default() {
        assert_eq!(
            EventInfo::parse(&json!({"start": 123})),
            EventInfo::default()
        );
        assert_eq!(EventInfo::parse(&json!(null)), EventInfo::default());
        assert_eq!(EventInfo::parse(&json!([1, 2])), EventInfo::default());
    }

    #[test]
    fn parse_missing_end_collapses_onto_start() {
        let info = EventInfo::parse(&json!({"title": "t", "start": 5000}));
        assert_eq!(info.start, epoch_ms(5000));
        assert_eq!(info.end, info.start);
    }

    #[test]
    fn parse_invalid_start_falls_back_to_epoch() {
        let info = EventInfo::parse(&json!({"title": "t", "start": "soon"}));
        assert_eq!(info.start, DateTime::UNIX_EPOCH);
        assert_eq!(info.end, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn parse_todo_flag_requires_strict_true() {
        let todo = EventInfo::parse(&json!({"title": "t", "toDo": true}));
        assert!(todo.todo);
        for raw in [json!(1), json!("true"), json!(null)] {
            let info = EventInfo::parse(&json!({"title": "t", "toDo": raw.clone()}));
            assert!(!info.todo, "coerced {} to todo", raw);
        }
    }

    #[test]
    fn parse_is_deterministic_on_malformed_input() {
        let raw = json!({"title": "t", "start": "later", "end": [], "allday": "yes"});
        assert_eq!(EventInfo::parse(&raw), EventInfo::parse(&raw));
    }
}
