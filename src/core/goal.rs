use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Value, json};

use super::record::{RecordId, Row};

/// Shape of the `info` blob stored per goal row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalInfo {
    pub title: String,
    pub deadline: Option<NaiveDate>,
    /// Absent means an uncounted goal; the counter is clamped to it when set.
    pub target: Option<u32>,
    pub counter: u32,
    pub completed: bool,
}

impl Default for GoalInfo {
    fn default() -> Self {
        Self {
            title: String::new(),
            deadline: None,
            target: None,
            counter: 0,
            completed: false,
        }
    }
}

impl GoalInfo {
    /// Normalize an untyped info blob into a fully-populated record.
    ///
    /// Total: any input yields a usable value, deterministically. An object
    /// carrying a `title` key is coerced field by field; anything else falls
    /// back to the default. This is the only boundary that absorbs
    /// storage-layer schema drift; nothing untyped leaks past it.
    pub fn parse(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };
        if !obj.contains_key("title") {
            return Self::default();
        }

        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let deadline = parse_date(obj.get("deadline"));
        let target = obj
            .get("target")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map(|t| t as u32);
        let mut counter = obj
            .get("counter")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .map(|c| c.max(0.0) as u32)
            .unwrap_or(0);
        // Multiple control paths write this blob; re-establish the clamp here
        // rather than trusting whoever wrote it last.
        if let Some(t) = target {
            counter = counter.min(t);
        }
        let completed = matches!(obj.get("completed"), Some(Value::Bool(true)));

        Self {
            title,
            deadline,
            target,
            counter,
            completed,
        }
    }

    /// Wire form written back to the store.
    pub fn to_value(&self) -> Value {
        json!({
            "title": self.title,
            "deadline": self.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
            "target": self.target,
            "counter": self.counter,
            "completed": self.completed,
        })
    }

    /// Progress label for the goal card: "c / t" with a target, bare counter without.
    pub fn progress_label(&self) -> String {
        match self.target {
            Some(target) => format!("{} / {}", self.counter, target),
            None => self.counter.to_string(),
        }
    }

    pub fn can_increment(&self) -> bool {
        self.target.is_none_or(|t| self.counter < t)
    }

    pub fn can_decrement(&self) -> bool {
        self.counter > 0
    }

    /// Counter after a ±delta step, clamped to `[0, target]`.
    pub fn stepped_counter(&self, delta: i64) -> u32 {
        let mut next = self.counter as i64 + delta;
        if next < 0 {
            next = 0;
        }
        if let Some(target) = self.target {
            next = next.min(target as i64);
        }
        next as u32
    }
}

fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    let s = value?.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    // Stored as YYYY-MM-DD; tolerate a trailing time component.
    let s = if s.len() > 10 {
        s.get(..10).unwrap_or(s)
    } else {
        s
    };
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// A goal row with its info blob parsed.
#[derive(Debug, Clone)]
pub struct GoalRecord {
    pub id: RecordId,
    pub owner: String,
    pub info: GoalInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl GoalRecord {
    pub fn from_row(row: Row) -> Self {
        Self {
            id: row.id,
            owner: row.user_id,
            info: GoalInfo::parse(&row.info),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed_round_trips() {
        let raw = json!({
            "title": "Read",
            "deadline": "2026-06-30",
            "target": 10,
            "counter": 3,
            "completed": false,
        });
        let info = GoalInfo::parse(&raw);
        assert_eq!(info.title, "Read");
        assert_eq!(info.deadline, NaiveDate::from_ymd_opt(2026, 6, 30));
        assert_eq!(info.target, Some(10));
        assert_eq!(info.counter, 3);
        assert_eq!(GoalInfo::parse(&info.to_value()), info);
    }

    #[test]
    fn parse_missing_title_yields_default() {
        assert_eq!(GoalInfo::parse(&json!({"counter": 5})), GoalInfo::default());
        assert_eq!(GoalInfo::parse(&json!(null)), GoalInfo::default());
        assert_eq!(GoalInfo::parse(&json!("oops")), GoalInfo::default());
        assert_eq!(GoalInfo::parse(&json!(17)), GoalInfo::default());
    }

    #[test]
    fn parse_is_deterministic_on_malformed_input() {
        let raw = json!({"title": 42, "counter": "three", "target": -5});
        assert_eq!(GoalInfo::parse(&raw), GoalInfo::parse(&raw));
    }

    #[test]
    fn parse_coerces_field_by_field() {
        let info = GoalInfo::parse(&json!({
            "title": 42,
            "deadline": "",
            "target": "10",
            "counter": "three",
            "completed": "yes",
        }));
        assert_eq!(info.title, ""); // non-string title
        assert_eq!(info.deadline, None); // empty string collapses to null
        assert_eq!(info.target, None); // non-numeric target
        assert_eq!(info.counter, 0); // non-numeric counter
        assert!(!info.completed); // only strict true counts
    }

    #[test]
    fn parse_rejects_negative_target_and_counter() {
        let info = GoalInfo::parse(&json!({"title": "t", "target": -3, "counter": -1}));
        assert_eq!(info.target, None);
        assert_eq!(info.counter, 0);
    }

    #[test]
    fn parse_clamps_counter_to_target() {
        let info = GoalInfo::parse(&json!({"title": "t", "target": 5, "counter": 99}));
        assert_eq!(info.counter, 5);
    }

    #[test]
    fn parse_deadline_tolerates_time_suffix() {
        let info = GoalInfo::parse(&json!({"title": "t", "deadline": "2026-06-30T00:00:00"}));
        assert_eq!(info.deadline, NaiveDate::from_ymd_opt(2026, 6, 30));
    }

    #[test]
    fn stepped_counter_clamps_both_ends() {
        let mut info = GoalInfo {
            title: "Read".into(),
            target: Some(10),
            counter: 10,
            ..GoalInfo::default()
        };
        assert_eq!(info.stepped_counter(1), 10); // ceiling
        info.counter = 0;
        assert_eq!(info.stepped_counter(-1), 0); // floor
        info.target = None;
        assert_eq!(info.stepped_counter(1), 1);
    }

    #[test]
    fn progress_label_with_and_without_target() {
        let mut info = GoalInfo {
            counter: 4,
            target: Some(10),
            ..GoalInfo::default()
        };
        assert_eq!(info.progress_label(), "4 / 10");
        info.target = None;
        assert_eq!(info.progress_label(), "4");
    }
}
