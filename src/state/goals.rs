use std::sync::Arc;

use chrono::NaiveDate;

use super::StateError;
use crate::core::goal::{GoalInfo, GoalRecord};
use crate::core::record::{Order, RecordId, Table};
use crate::store::RecordStore;

/// Raw form fields for creating or editing a goal, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct GoalDraft {
    pub title: String,
    /// `YYYY-MM-DD` from a date control; blank means no deadline.
    pub deadline: String,
    /// Decimal target; blank, non-numeric, or negative means uncounted.
    pub target: String,
}

/// Session cache of the signed-in user's goals plus its mutation handlers.
///
/// Ordering is most-recent-first. Every handler is write-then-reflect: the
/// store write happens first and the cache changes only once it succeeds, so
/// a failed write leaves cache and store agreeing. Handlers take `&mut self`;
/// that exclusive borrow is the per-record write lock, and a second mutation
/// cannot start while one is suspended at the network boundary.
pub struct GoalBoard<S> {
    store: Arc<S>,
    user: Option<String>,
    goals: Vec<GoalRecord>,
    /// Goal currently open in the surface's edit dialog, if any.
    selected: Option<RecordId>,
}

impl<S: RecordStore> GoalBoard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            user: None,
            goals: Vec::new(),
            selected: None,
        }
    }

    /// Swap the session identity. The cache empties; the caller refreshes.
    pub fn set_user(&mut self, user: Option<String>) {
        self.user = user;
        self.goals.clear();
        self.selected = None;
    }

    /// Reload the cache from the store. No session means an empty view.
    pub async fn refresh(&mut self) -> Result<(), StateError> {
        let Some(user) = self.user.clone() else {
            self.goals.clear();
            return Ok(());
        };
        match self
            .store
            .select(Table::Goals, &user, Order::CreatedDesc)
            .await
        {
            Ok(rows) => {
                self.goals = rows.into_iter().map(GoalRecord::from_row).collect();
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to fetch goals: {}", e);
                self.goals.clear();
                Err(e.into())
            }
        }
    }

    pub fn records(&self) -> &[GoalRecord] {
        &self.goals
    }

    pub fn get(&self, id: RecordId) -> Option<&GoalRecord> {
        self.goals.iter().find(|g| g.id == id)
    }

    /// Goals still in progress, cache order.
    pub fn active(&self) -> Vec<&GoalRecord> {
        self.goals.iter().filter(|g| !g.info.completed).collect()
    }

    pub fn completed(&self) -> Vec<&GoalRecord> {
        self.goals.iter().filter(|g| g.info.completed).collect()
    }

    /// Id of the goal open in the edit dialog.
    pub fn selected(&self) -> Option<RecordId> {
        self.selected
    }

    /// Open the edit dialog on a goal. Returns the record the form fields
    /// are seeded from.
    pub fn open_edit(&mut self, id: RecordId) -> Option<&GoalRecord> {
        if self.goals.iter().any(|g| g.id == id) {
            self.selected = Some(id);
            self.get(id)
        } else {
            None
        }
    }

    pub fn close_edit(&mut self) {
        self.selected = None;
    }

    /// Create a goal with a zeroed counter. The new record goes on top.
    pub async fn create(&mut self, draft: &GoalDraft) -> Result<RecordId, StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(StateError::EmptyTitle);
        }

        let info = GoalInfo {
            title: title.to_string(),
            deadline: parse_deadline(&draft.deadline)?,
            target: parse_target(&draft.target),
            counter: 0,
            completed: false,
        };

        let row = match self.store.insert(Table::Goals, &user, info.to_value()).await {
            Ok(row) => row,
            Err(e) => {
                log::error!("Failed to create goal: {}", e);
                return Err(e.into());
            }
        };

        let record = GoalRecord::from_row(row);
        let id = record.id;
        log::info!("Created goal {} ({})", id, record.info.title);
        self.goals.insert(0, record);
        Ok(id)
    }

    /// Replace title/deadline/target; counter and completion carry over from
    /// the prior parsed state. The record keeps its position in the cache.
    pub async fn edit(&mut self, id: RecordId, draft: &GoalDraft) -> Result<(), StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(StateError::EmptyTitle);
        }

        let info = {
            let prior = self.get(id).ok_or(StateError::UnknownRecord(id))?;
            let target = parse_target(&draft.target);
            let mut counter = prior.info.counter;
            // A lowered target pulls the carried counter down with it.
            if let Some(t) = target {
                counter = counter.min(t);
            }
            GoalInfo {
                title: title.to_string(),
                deadline: parse_deadline(&draft.deadline)?,
                target,
                counter,
                completed: prior.info.completed,
            }
        };

        if let Err(e) = self
            .store
            .update(Table::Goals, id, &user, info.to_value())
            .await
        {
            log::error!("Failed to update goal {}: {}", id, e);
            return Err(e.into());
        }

        if let Some(slot) = self.goals.iter_mut().find(|g| g.id == id) {
            slot.info = info;
        }
        Ok(())
    }

    /// Remove a goal. Closes the edit dialog if it was open on this record.
    pub async fn delete(&mut self, id: RecordId) -> Result<(), StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;

        if let Err(e) = self.store.delete(Table::Goals, id, &user).await {
            log::error!("Failed to delete goal {}: {}", id, e);
            return Err(e.into());
        }

        self.goals.retain(|g| g.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(())
    }

    /// ±1 progress step, clamped to `[0, target]` in the handler no matter
    /// what the surface's buttons allowed. A step that lands where it
    /// started is a true no-op: nothing is written.
    pub async fn change_counter(&mut self, id: RecordId, delta: i64) -> Result<(), StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;

        let info = {
            let prior = self.get(id).ok_or(StateError::UnknownRecord(id))?;
            let next = prior.info.stepped_counter(delta);
            if next == prior.info.counter {
                return Ok(());
            }
            let mut info = prior.info.clone();
            info.counter = next;
            info
        };

        if let Err(e) = self
            .store
            .update(Table::Goals, id, &user, info.to_value())
            .await
        {
            log::error!("Failed to update progress for goal {}: {}", id, e);
            return Err(e.into());
        }

        if let Some(slot) = self.goals.iter_mut().find(|g| g.id == id) {
            slot.info = info;
        }
        Ok(())
    }

    /// Flip the completed flag, write-then-reflect.
    pub async fn toggle_complete(&mut self, id: RecordId) -> Result<(), StateError> {
        let user = self.user.clone().ok_or(StateError::NoSession)?;

        let info = {
            let prior = self.get(id).ok_or(StateError::UnknownRecord(id))?;
            let mut info = prior.info.clone();
            info.completed = !info.completed;
            info
        };

        if let Err(e) = self
            .store
            .update(Table::Goals, id, &user, info.to_value())
            .await
        {
            log::error!("Failed to toggle goal {}: {}", id, e);
            return Err(e.into());
        }

        if let Some(slot) = self.goals.iter_mut().find(|g| g.id == id) {
            slot.info = info;
        }
        Ok(())
    }
}

/// Blank, non-numeric, and negative targets are all "no target".
fn parse_target(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(n) if (0..=u32::MAX as i64).contains(&n) => Some(n as u32),
        _ => None,
    }
}

/// Blank collapses to no deadline; anything else must be a calendar date.
fn parse_deadline(raw: &str) -> Result<Option<NaiveDate>, StateError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| StateError::InvalidDateTime)
}
