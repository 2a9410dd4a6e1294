pub mod mailbox;
pub mod zones;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::event::EventRecord;
use crate::core::record::RecordId;
use mailbox::DragMailbox;
use zones::{DropZone, DropZoneRegistry, Rect};

/// Start-of-drag snapshot of an event, carried to the drop surface.
///
/// Travels over two redundant channels: serialized into the platform's
/// native drag transfer, and parked in the coordinator's mailbox for drags
/// the native mechanism never delivers (a gesture that never crosses a
/// native drop boundary, for one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragPayload {
    pub id: RecordId,
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub color: String,
    pub desc: String,
    pub todo: bool,
}

impl DragPayload {
    pub fn from_record(record: &EventRecord) -> Self {
        Self {
            id: record.id,
            title: record.info.title.clone(),
            start: record.info.start,
            end: record.info.end,
            all_day: record.info.all_day,
            color: record.info.color.clone(),
            desc: record.info.desc.clone(),
            todo: record.info.todo,
        }
    }

    /// Wire form attached to the native drag transfer.
    pub fn to_transfer(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_transfer(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// A drop gesture resolved to a zone and the payload that was dragged there.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDrop {
    pub zone: DropZone,
    pub payload: DragPayload,
}

#[derive(Debug)]
struct ActiveDrag {
    ticket: Uuid,
    consumed: bool,
}

/// Coordinates the drag lifecycle across visually separate surfaces.
///
/// One gesture, one ticket: `begin` hands the ticket to the dragging
/// surface, and whichever drop path fires first (native drop or the
/// geometric pointer-release fallback) consumes it. The other path then
/// resolves to nothing, so both can be wired unconditionally without
/// double-applying the mutation. `end` with a stale ticket is ignored, so a
/// late drag-end event from a previous gesture cannot clear a new drag.
#[derive(Debug, Default)]
pub struct DragCoordinator {
    mailbox: DragMailbox,
    zones: DropZoneRegistry,
    active: Option<ActiveDrag>,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_zone(&mut self, zone: DropZone, bounds: Rect) {
        self.zones.register(zone, bounds);
    }

    pub fn unregister_zone(&mut self, zone: DropZone) {
        self.zones.unregister(zone);
    }

    /// Start a drag. Parks the payload in the mailbox and returns the
    /// ticket plus the serialized payload for the native transfer channel.
    pub fn begin(&mut self, payload: DragPayload) -> (Uuid, String) {
        let ticket = Uuid::new_v4();
        log::debug!("Drag {} started for event {}", ticket, payload.id);
        let transfer = payload.to_transfer();
        self.mailbox.set(payload);
        self.active = Some(ActiveDrag {
            ticket,
            consumed: false,
        });
        (ticket, transfer)
    }

    /// Resolve a native drop on a known zone. `transfer` is the payload as
    /// recovered from the platform's transfer mechanism, when it survived.
    pub fn resolve_native_drop(
        &mut self,
        ticket: Uuid,
        zone: DropZone,
        transfer: Option<&str>,
    ) -> Option<ResolvedDrop> {
        let payload = self.consume(ticket, transfer)?;
        Some(ResolvedDrop { zone, payload })
    }

    /// Fallback path: a raw pointer release at page coordinates, hit-tested
    /// against the registered zone bounds. A release over no zone leaves the
    /// gesture unconsumed (a native drop may still arrive).
    pub fn resolve_release(
        &mut self,
        ticket: Uuid,
        x: f64,
        y: f64,
        transfer: Option<&str>,
    ) -> Option<ResolvedDrop> {
        let zone = self.zones.zone_at(x, y)?;
        let payload = self.consume(ticket, transfer)?;
        Some(ResolvedDrop { zone, payload })
    }

    /// The gesture ended (dropped or abandoned). The mailbox keeps its
    /// payload for the post-end grace window only.
    pub fn end(&mut self, ticket: Uuid) {
        match &self.active {
            Some(drag) if drag.ticket == ticket => self.mailbox.end_drag(),
            _ => log::debug!("Ignoring stale drag end {}", ticket),
        }
    }

    fn consume(&mut self, ticket: Uuid, transfer: Option<&str>) -> Option<DragPayload> {
        let drag = self.active.as_mut()?;
        if drag.ticket != ticket {
            log::debug!("Ignoring drop for stale drag {}", ticket);
            return None;
        }
        if drag.consumed {
            // The other delivery path already applied this gesture.
            return None;
        }
        drag.consumed = true;
        // Either way the slot is emptied, so nothing outlives the gesture.
        let parked = self.mailbox.take();
        match transfer.and_then(DragPayload::from_transfer) {
            Some(payload) => Some(payload),
            None => parked,
        }
    }
}
