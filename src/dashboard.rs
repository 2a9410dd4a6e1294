use std::sync::Arc;

use futures::join;
use uuid::Uuid;

use crate::core::event::EventRecord;
use crate::core::goal::GoalRecord;
use crate::core::record::RecordId;
use crate::drag::zones::{DropZone, Rect};
use crate::drag::{DragCoordinator, DragPayload, ResolvedDrop};
use crate::state::StateError;
use crate::state::events::{EventBoard, EventDraft, TimeSlot, TodoDraft};
use crate::state::goals::{GoalBoard, GoalDraft};
use crate::store::RecordStore;

/// Listener invoked after every confirmed change to the event cache, so the
/// calendar and the to-do list re-render from the same source of truth.
pub type EventsListener = Box<dyn Fn(&[EventRecord]) + Send + Sync>;

/// Signed-in identity as supplied by the external identity provider.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl Session {
    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }

    /// Display name for the account corner: the part of the email before
    /// the '@', or "User" when unknown.
    pub fn display_name(&self) -> String {
        match &self.email {
            Some(email) if !email.is_empty() => {
                email.split('@').next().unwrap_or("User").to_string()
            }
            _ => "User".to_string(),
        }
    }
}

/// Top-level coordinator for the dashboard's synchronization core.
///
/// Owns the store handle, the goal and event boards, the drag coordinator,
/// and the session identity, and exposes the operations a rendering surface
/// drives. All state behind it changes only through these methods; the
/// surfaces read projections back out and re-render.
pub struct Dashboard<S> {
    goals: GoalBoard<S>,
    events: EventBoard<S>,
    drag: DragCoordinator,
    session: Session,
    on_events_change: Option<EventsListener>,
}

impl<S: RecordStore> Dashboard<S> {
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        Self {
            goals: GoalBoard::new(store.clone()),
            events: EventBoard::new(store),
            drag: DragCoordinator::new(),
            session: Session::default(),
            on_events_change: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn goals(&self) -> &GoalBoard<S> {
        &self.goals
    }

    pub fn events(&self) -> &EventBoard<S> {
        &self.events
    }

    pub fn set_events_listener(&mut self, listener: EventsListener) {
        self.on_events_change = Some(listener);
    }

    /// Identity change from the provider. `None` drops both boards to the
    /// read-only empty state; a signed-in user reloads both tables.
    pub async fn set_user(
        &mut self,
        user_id: Option<String>,
        email: Option<String>,
    ) -> Result<(), StateError> {
        match &user_id {
            Some(id) => log::info!("Session user changed to {}", id),
            None => log::info!("Session ended"),
        }
        self.session = Session {
            user_id: user_id.clone(),
            email,
        };
        self.goals.set_user(user_id.clone());
        self.events.set_user(user_id);
        self.refresh().await
    }

    /// Reload both caches from the store, concurrently.
    pub async fn refresh(&mut self) -> Result<(), StateError> {
        let (goals, events) = join!(self.goals.refresh(), self.events.refresh());
        self.notify_events();
        goals.and(events)
    }

    // --- Goal operations ---

    pub async fn create_goal(&mut self, draft: &GoalDraft) -> Result<RecordId, StateError> {
        self.goals.create(draft).await
    }

    pub async fn edit_goal(&mut self, id: RecordId, draft: &GoalDraft) -> Result<(), StateError> {
        self.goals.edit(id, draft).await
    }

    pub async fn delete_goal(&mut self, id: RecordId) -> Result<(), StateError> {
        self.goals.delete(id).await
    }

    pub async fn change_counter(&mut self, id: RecordId, delta: i64) -> Result<(), StateError> {
        self.goals.change_counter(id, delta).await
    }

    pub async fn toggle_complete(&mut self, id: RecordId) -> Result<(), StateError> {
        self.goals.toggle_complete(id).await
    }

    pub fn open_goal_edit(&mut self, id: RecordId) -> Option<&GoalRecord> {
        self.goals.open_edit(id)
    }

    pub fn close_goal_edit(&mut self) {
        self.goals.close_edit();
    }

    // --- Event operations ---

    pub async fn create_todo(&mut self, draft: &TodoDraft) -> Result<RecordId, StateError> {
        let id = self.events.create_todo(draft).await?;
        self.notify_events();
        Ok(id)
    }

    pub async fn edit_event(&mut self, id: RecordId, draft: &EventDraft) -> Result<(), StateError> {
        self.events.edit(id, draft).await?;
        self.notify_events();
        Ok(())
    }

    pub async fn delete_event(&mut self, id: RecordId) -> Result<(), StateError> {
        self.events.delete(id).await?;
        self.notify_events();
        Ok(())
    }

    /// In-calendar drag/resize. Drag path: the cache may have been reloaded
    /// even on failure, so the listener fires either way.
    pub async fn reschedule_event(
        &mut self,
        id: RecordId,
        slot: &TimeSlot,
    ) -> Result<(), StateError> {
        let result = self.events.reschedule(id, slot).await;
        self.notify_events();
        result
    }

    // --- Drag operations ---

    /// Start dragging an event. Returns the gesture ticket and the payload
    /// serialized for the native transfer channel.
    pub fn begin_drag(&mut self, id: RecordId) -> Option<(Uuid, String)> {
        let record = self.events.get(id)?;
        Some(self.drag.begin(DragPayload::from_record(record)))
    }

    pub fn register_drop_zone(&mut self, zone: DropZone, bounds: Rect) {
        self.drag.register_zone(zone, bounds);
    }

    pub fn unregister_drop_zone(&mut self, zone: DropZone) {
        self.drag.unregister_zone(zone);
    }

    /// Native drop on a surface. Applies the flip the zone implies; a
    /// consumed or stale gesture applies nothing.
    pub async fn drop_on_zone(
        &mut self,
        ticket: Uuid,
        zone: DropZone,
        transfer: Option<&str>,
    ) -> Result<(), StateError> {
        let Some(resolved) = self.drag.resolve_native_drop(ticket, zone, transfer) else {
            return Ok(());
        };
        self.apply_drop(resolved).await
    }

    /// Pointer released at page coordinates: the geometric fallback for
    /// gestures the native drop mechanism never delivered.
    pub async fn release_at(
        &mut self,
        ticket: Uuid,
        x: f64,
        y: f64,
        transfer: Option<&str>,
    ) -> Result<(), StateError> {
        let Some(resolved) = self.drag.resolve_release(ticket, x, y, transfer) else {
            return Ok(());
        };
        self.apply_drop(resolved).await
    }

    pub fn end_drag(&mut self, ticket: Uuid) {
        self.drag.end(ticket);
    }

    /// Reverse direction with an explicit slot: a to-do dropped onto a
    /// concrete calendar slot.
    pub async fn drop_on_calendar(
        &mut self,
        id: RecordId,
        slot: &TimeSlot,
    ) -> Result<(), StateError> {
        let result = self.events.move_to_calendar(id, slot).await;
        self.notify_events();
        result.map(|_| ())
    }

    async fn apply_drop(&mut self, resolved: ResolvedDrop) -> Result<(), StateError> {
        let result = match resolved.zone {
            DropZone::TodoList => self.events.move_to_todo(&resolved.payload).await,
            DropZone::Calendar => {
                // A zone-level drop carries no slot; the payload's own time
                // bounds stand in for one.
                let slot = TimeSlot {
                    start: resolved.payload.start,
                    end: resolved.payload.end,
                    all_day: resolved.payload.all_day,
                };
                self.events.move_to_calendar(resolved.payload.id, &slot).await
            }
        };
        // Flip or compensating reload; both sides re-render either way.
        self.notify_events();
        result.map(|_| ())
    }

    fn notify_events(&self) {
        if let Some(listener) = &self.on_events_change {
            listener(self.events.records());
        }
    }
}
