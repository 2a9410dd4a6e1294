use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use super::StateError;
use crate::core::event::{
    COLOR_MAX, DEFAULT_TODO_COLOR, DESC_MAX, EventInfo, EventRecord, TITLE_MAX,
};
use crate::core::record::{Order, RecordId, Table};
use crate::drag::DragPayload;
use crate::store::RecordStore;

/// Form fields for a new to-do item. Times are implicit: the item gets a
/// one-hour window starting now.
#[derive(Debug, Clone, Default)]
pub struct TodoDraft {
    pub title: String,
    pub desc: String,
    /// Blank means the default to-do color.
    pub color: String,
}

/// Form fields from the event edit dialog. Times come from datetime-local
/// controls as `YYYY-MM-DDTHH:MM` strings.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: String,
    pub desc: String,
    pub color: String,
    pub start: String,
    pub end: String,
}

/// Concrete time bounds handed over by a calendar drop slot or an
/// in-calendar drag/resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

/// Session cache of the signed-in user's events plus its mutation handlers.
///
/// One cache feeds both surfaces: the calendar projection is `todo == false`
/// and the to-do projection is `todo == true`, so an event is always in
/// exactly one of them. Dialog-driven handlers are write-then-reflect like
/// the goal board; the drag paths (`move_to_todo`, `move_to_calendar`,
/// `reschedule`) instead reload the whole cache from the store when their
/// write fails, since the surface has already moved something visually.
/// Handlers take `&mut self`; the exclusive borrow is the write lock.
pub struct EventBoard<S> {
    store: Arc<S>,
    user: Option<String>,
    events: Vec<EventRecord>,
}

impl<S: RecordStore> EventBoard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            user: None,
            events: Vec::new(),
        }
    }

    /// Swap the session identity. The cache empties; the caller refreshes.
    pub fn set_user(&mut self, user: Option<String>) {
        self.user = user;
        self.events.clear();
    }

    /// Reload the cache from the store. No session means an empty view.
    pub async fn refresh(&mut self) -> Result<(), StateError> {
        let Some(user) = self.user.clone() else {
            self.events.clear();
            return Ok(());
        };
        match self
            .store
            .select(Table::Events, &user, Order::CreatedDesc)
            .await
        {
            Ok(rows) => {
                self.events = rows.into_iter().map(EventRecord::from_row).collect();
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to fetch events: {}", e);
                self.events.clear();
                Err(e.into())
            }
        }
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn get(&self, id: RecordId) -> Option<&EventRecord> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Calendar-grid projection: everything that is not a to-do.
    pub fn calendar(&self) -> Vec<&EventRecord> {
        self.events.iter().filter(|e| !e.is_todo()).collect()
    }

    /// To-do-list projection.
    pub fn todos(&self) -> Vec<&EventRecord> {
        self.events.iter().filter(|e| e.is_todo()).collect()
    }

    /// Create a to-do item with the default one-hour window starting now.
    pub async fn create_todo(&mut self, draft: &TodoDraft) -> Result<RecordId, StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;
        let title = draft.title.trim();
        let desc = draft.desc.trim();
        let color = draft.color.trim();
        validate_text(title, desc, color)?;

        let now = Utc::now();
        let info = EventInfo {
            title: title.to_string(),
            start: now,
            end: now + Duration::hours(1),
            desc: desc.to_string(),
            color: if color.is_empty() {
                DEFAULT_TODO_COLOR.to_string()
            } else {
                color.to_string()
            },
            all_day: false,
            todo: true,
        };

        let row = match self
            .store
            .insert(Table::Events, &user, info.to_value())
            .await
        {
            Ok(row) => row,
            Err(e) => {
                log::error!("Failed to create to-do: {}", e);
                return Err(e.into());
            }
        };

        let record = EventRecord::from_row(row);
        let id = record.id;
        log::info!("Created to-do {} ({})", id, record.info.title);
        self.events.push(record);
        Ok(id)
    }

    /// Edit from the dialog: text fields and explicit times. The `todo` and
    /// `allday` flags are not the dialog's to change; they carry over.
    pub async fn edit(&mut self, id: RecordId, draft: &EventDraft) -> Result<(), StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;
        let title = draft.title.trim();
        let desc = draft.desc.trim();
        let color = draft.color.trim();
        validate_text(title, desc, color)?;
        // Both times must parse before anything is written.
        let start = parse_local_datetime(&draft.start)?;
        let end = parse_local_datetime(&draft.end)?;

        let info = {
            let prior = self.get(id).ok_or(StateError::UnknownRecord(id))?;
            EventInfo {
                title: title.to_string(),
                start,
                end,
                desc: desc.to_string(),
                color: color.to_string(),
                all_day: prior.info.all_day,
                todo: prior.info.todo,
            }
        };

        if let Err(e) = self
            .store
            .update(Table::Events, id, &user, info.to_value())
            .await
        {
            log::error!("Failed to update event {}: {}", id, e);
            return Err(e.into());
        }

        if let Some(slot) = self.events.iter_mut().find(|e| e.id == id) {
            slot.info = info;
        }
        Ok(())
    }

    pub async fn delete(&mut self, id: RecordId) -> Result<(), StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;

        if let Err(e) = self.store.delete(Table::Events, id, &user).await {
            log::error!("Failed to delete event {}: {}", id, e);
            return Err(e.into());
        }

        self.events.retain(|e| e.id != id);
        Ok(())
    }

    /// Flip a calendar event into the to-do projection from a drag snapshot.
    ///
    /// Idempotent: if the record is already a to-do (the gesture raced an
    /// earlier flip) nothing is written and `Ok(false)` comes back. On a
    /// write failure the cache is reloaded from the store, since the surface has
    /// already painted the item on the other side, and the reload is what
    /// snaps everything back to the truth.
    pub async fn move_to_todo(&mut self, payload: &DragPayload) -> Result<bool, StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;

        let prior = self
            .get(payload.id)
            .ok_or(StateError::UnknownRecord(payload.id))?;
        if prior.info.todo {
            log::debug!("Event {} is already a to-do; drop ignored", payload.id);
            return Ok(false);
        }

        let info = EventInfo {
            title: payload.title.clone(),
            start: payload.start,
            end: payload.end,
            desc: payload.desc.clone(),
            color: payload.color.clone(),
            all_day: payload.all_day,
            todo: true,
        };

        if let Err(e) = self
            .store
            .update(Table::Events, payload.id, &user, info.to_value())
            .await
        {
            log::error!("Failed to move event {} to the to-do list: {}", payload.id, e);
            self.reload_after_failed_drag().await;
            return Err(e.into());
        }

        if let Some(slot) = self.events.iter_mut().find(|e| e.id == payload.id) {
            slot.info = info;
        }
        log::info!("Moved event {} to the to-do list", payload.id);
        Ok(true)
    }

    /// Reverse direction: a to-do dropped onto the calendar leaves the list
    /// and takes the drop slot's time bounds. Idempotent like
    /// [`Self::move_to_todo`].
    pub async fn move_to_calendar(
        &mut self,
        id: RecordId,
        slot: &TimeSlot,
    ) -> Result<bool, StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;

        let prior = self.get(id).ok_or(StateError::UnknownRecord(id))?;
        if !prior.info.todo {
            log::debug!("Event {} is already on the calendar; drop ignored", id);
            return Ok(false);
        }

        let mut info = prior.info.clone();
        info.start = slot.start;
        info.end = slot.end;
        info.all_day = slot.all_day;
        info.todo = false;

        if let Err(e) = self
            .store
            .update(Table::Events, id, &user, info.to_value())
            .await
        {
            log::error!("Failed to move to-do {} onto the calendar: {}", id, e);
            self.reload_after_failed_drag().await;
            return Err(e.into());
        }

        if let Some(entry) = self.events.iter_mut().find(|e| e.id == id) {
            entry.info = info;
        }
        log::info!("Moved to-do {} onto the calendar", id);
        Ok(true)
    }

    /// In-calendar drag/resize: new time bounds only, `todo` untouched.
    /// Drag path, so a failed write reloads the cache.
    pub async fn reschedule(&mut self, id: RecordId, slot: &TimeSlot) -> Result<(), StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;

        let info = {
            let prior = self.get(id).ok_or(StateError::UnknownRecord(id))?;
            let mut info = prior.info.clone();
            info.start = slot.start;
            info.end = slot.end;
            info.all_day = slot.all_day;
            info
        };

        if let Err(e) = self
            .store
            .update(Table::Events, id, &user, info.to_value())
            .await
        {
            log::error!("Failed to reschedule event {}: {}", id, e);
            self.reload_after_failed_drag().await;
            return Err(e.into());
        }

        if let Some(slot) = self.events.iter_mut().find(|e| e.id == id) {
            slot.info = info;
        }
        Ok(())
    }

    /// Compensating reload for a failed drag write. Best effort: if the
    /// store is unreachable the next successful refresh resolves it.
    async fn reload_after_failed_drag(&mut self) {
        if let Err(e) = self.refresh().await {
            log::warn!("Reload after failed drag write also failed: {}", e);
        }
    }
}

fn validate_text(title: &str, desc: &str, color: &str) -> Result<(), StateError> {
    if title.is_empty() {
        return Err(StateError::EmptyTitle);
    }
    if title.chars().count() > TITLE_MAX {
        return Err(StateError::TooLong {
            field: "title",
            max: TITLE_MAX,
        });
    }
    if desc.chars().count() > DESC_MAX {
        return Err(StateError::TooLong {
            field: "description",
            max: DESC_MAX,
        });
    }
    if color.chars().count() > COLOR_MAX {
        return Err(StateError::TooLong {
            field: "color",
            max: COLOR_MAX,
        });
    }
    Ok(())
}

/// `YYYY-MM-DDTHH:MM` from a datetime-local control (seconds tolerated).
fn parse_local_datetime(raw: &str) -> Result<DateTime<Utc>, StateError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map(|dt| dt.and_utc())
        .map_err(|_| StateError::InvalidDateTime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    const USER: &str = "user-1";

    fn board() -> (EventBoard<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let mut board = EventBoard::new(Arc::new(store.clone()));
        board.set_user(Some(USER.to_string()));
        (board, store)
    }

    fn todo_draft(title: &str) -> TodoDraft {
        TodoDraft {
            title: title.to_string(),
            desc: "details".to_string(),
            color: String::new(),
        }
    }

    /// Seed a calendar event directly through the store, the way rows from
    /// other sessions arrive.
    async fn seed_calendar_event(
        board: &mut EventBoard<MemoryStore>,
        store: &MemoryStore,
        title: &str,
    ) -> RecordId {
        let row = store
            .insert(
                Table::Events,
                USER,
                json!({
                    "start": 1_772_534_400_000u64,
                    "end": 1_772_538_000_000u64,
                    "title": title,
                    "desc": "from calendar",
                    "color": "#ff8800",
                    "allday": false,
                    "toDo": false,
                }),
            )
            .await
            .unwrap();
        board.refresh().await.unwrap();
        row.id
    }

    #[tokio::test]
    async fn every_event_is_in_exactly_one_projection() {
        let (mut board, store) = board();
        seed_calendar_event(&mut board, &store, "Meeting").await;
        board.create_todo(&todo_draft("Chore")).await.unwrap();

        assert_eq!(board.calendar().len(), 1);
        assert_eq!(board.todos().len(), 1);
        assert_eq!(board.records().len(), 2);
    }

    #[tokio::test]
    async fn create_todo_defaults() {
        let (mut board, _) = board();
        let id = board.create_todo(&todo_draft("Chore")).await.unwrap();
        let todo = board.get(id).unwrap();
        assert!(todo.info.todo);
        assert!(!todo.info.all_day);
        assert_eq!(todo.info.color, DEFAULT_TODO_COLOR);
        assert_eq!(todo.info.end - todo.info.start, Duration::hours(1));
    }

    #[tokio::test]
    async fn create_todo_enforces_length_bounds() {
        let (mut board, _) = board();
        let long_title = "x".repeat(TITLE_MAX + 1);
        let err = board.create_todo(&todo_draft(&long_title)).await.unwrap_err();
        assert!(matches!(err, StateError::TooLong { field: "title", .. }));
        assert!(board.records().is_empty());
    }

    #[tokio::test]
    async fn move_to_todo_flips_and_preserves_fields() {
        let (mut board, store) = board();
        let id = seed_calendar_event(&mut board, &store, "Meeting").await;
        let payload = DragPayload::from_record(board.get(id).unwrap());

        let flipped = board.move_to_todo(&payload).await.unwrap();
        assert!(flipped);

        let record = board.get(id).unwrap();
        assert!(record.info.todo);
        assert_eq!(record.info.title, "Meeting");
        assert_eq!(record.info.desc, "from calendar");
        assert_eq!(record.info.color, "#ff8800");
        assert!(board.calendar().is_empty()); // vanished from the grid
        assert_eq!(board.todos().len(), 1);
    }

    #[tokio::test]
    async fn move_to_todo_is_idempotent() {
        let (mut board, store) = board();
        let id = seed_calendar_event(&mut board, &store, "Meeting").await;
        let payload = DragPayload::from_record(board.get(id).unwrap());

        board.move_to_todo(&payload).await.unwrap();
        let writes_after_first = store.update_calls();

        let flipped = board.move_to_todo(&payload).await.unwrap();
        assert!(!flipped);
        assert_eq!(store.update_calls(), writes_after_first);
    }

    #[tokio::test]
    async fn move_to_calendar_takes_the_drop_slot() {
        let (mut board, _) = board();
        let id = board.create_todo(&todo_draft("Chore")).await.unwrap();
        let slot = TimeSlot {
            start: DateTime::UNIX_EPOCH + Duration::days(20_500),
            end: DateTime::UNIX_EPOCH + Duration::days(20_500) + Duration::hours(2),
            all_day: false,
        };

        let flipped = board.move_to_calendar(id, &slot).await.unwrap();
        assert!(flipped);

        let record = board.get(id).unwrap();
        assert!(!record.info.todo);
        assert_eq!(record.info.start, slot.start);
        assert_eq!(record.info.end, slot.end);
        assert!(board.todos().is_empty()); // left the list
        assert_eq!(board.calendar().len(), 1);
    }

    #[tokio::test]
    async fn failed_flip_reloads_cache_from_store() {
        let (mut board, store) = board();
        let id = seed_calendar_event(&mut board, &store, "Meeting").await;
        let payload = DragPayload::from_record(board.get(id).unwrap());

        store.set_fail_writes(true);
        let err = board.move_to_todo(&payload).await.unwrap_err();
        assert!(matches!(err, StateError::Store(_)));

        // The compensating reload put the cache back on the store's truth.
        let record = board.get(id).unwrap();
        assert!(!record.info.todo);
        assert_eq!(board.calendar().len(), 1);
        assert!(board.todos().is_empty());
    }

    #[tokio::test]
    async fn edit_rejects_invalid_datetime_before_any_write() {
        let (mut board, store) = board();
        let id = board.create_todo(&todo_draft("Chore")).await.unwrap();

        let draft = EventDraft {
            title: "Chore".to_string(),
            start: "whenever".to_string(),
            end: "2026-03-01T10:00".to_string(),
            ..EventDraft::default()
        };
        let err = board.edit(id, &draft).await.unwrap_err();
        assert!(matches!(err, StateError::InvalidDateTime));
        assert_eq!(store.update_calls(), 0);
    }

    #[tokio::test]
    async fn edit_preserves_the_todo_flag() {
        let (mut board, _) = board();
        let id = board.create_todo(&todo_draft("Chore")).await.unwrap();

        let draft = EventDraft {
            title: "Chore, renamed".to_string(),
            desc: "new details".to_string(),
            color: "#123456".to_string(),
            start: "2026-03-01T10:00".to_string(),
            end: "2026-03-01T11:30".to_string(),
        };
        board.edit(id, &draft).await.unwrap();

        let record = board.get(id).unwrap();
        assert!(record.info.todo); // the dialog cannot change projections
        assert_eq!(record.info.title, "Chore, renamed");
        assert_eq!(
            record.info.start,
            parse_local_datetime("2026-03-01T10:00").unwrap()
        );
    }

    #[tokio::test]
    async fn reschedule_keeps_projection_and_reloads_on_failure() {
        let (mut board, store) = board();
        let id = seed_calendar_event(&mut board, &store, "Meeting").await;
        let before = board.get(id).unwrap().info.clone();
        let slot = TimeSlot {
            start: before.start + Duration::hours(3),
            end: before.end + Duration::hours(3),
            all_day: false,
        };

        board.reschedule(id, &slot).await.unwrap();
        let moved = board.get(id).unwrap();
        assert_eq!(moved.info.start, slot.start);
        assert!(!moved.info.todo);

        store.set_fail_writes(true);
        let later = TimeSlot {
            start: slot.start + Duration::hours(1),
            end: slot.end + Duration::hours(1),
            all_day: false,
        };
        assert!(board.reschedule(id, &later).await.is_err());
        // Reload left the last confirmed times in place.
        assert_eq!(board.get(id).unwrap().info.start, slot.start);
    }

    #[tokio::test]
    async fn delete_removes_from_its_projection() {
        let (mut board, _) = board();
        let id = board.create_todo(&todo_draft("Chore")).await.unwrap();
        board.delete(id).await.unwrap();
        assert!(board.records().is_empty());
    }
}
