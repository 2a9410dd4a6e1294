use std::time::{Duration, Instant};

use super::DragPayload;

/// How long a parked payload stays live while a drag is in progress.
pub const DRAG_TTL: Duration = Duration::from_secs(30);
/// Grace window after drag end: long enough for a drop handler firing just
/// after the gesture to still resolve the payload, short enough that an
/// abandoned drag cannot leak into the next one.
pub const END_GRACE: Duration = Duration::from_millis(100);

/// Single-slot, time-bounded channel for the in-flight drag payload.
///
/// The dragging surface parks a snapshot here at drag start; a drop surface
/// that never received the native transfer payload takes it from here
/// instead. `take` consumes the slot either way, and the deadline bounds how
/// long anything can sit in it.
#[derive(Debug, Default)]
pub struct DragMailbox {
    slot: Option<(DragPayload, Instant)>,
}

impl DragMailbox {
    pub fn set(&mut self, payload: DragPayload) {
        self.set_with_ttl(payload, DRAG_TTL);
    }

    fn set_with_ttl(&mut self, payload: DragPayload, ttl: Duration) {
        self.slot = Some((payload, Instant::now() + ttl));
    }

    /// Consume the parked payload. Expired payloads are dropped, not
    /// delivered.
    pub fn take(&mut self) -> Option<DragPayload> {
        let (payload, deadline) = self.slot.take()?;
        if Instant::now() <= deadline {
            Some(payload)
        } else {
            None
        }
    }

    /// The drag gesture ended; shorten the remaining lifetime to the
    /// post-drag grace window.
    pub fn end_drag(&mut self) {
        if let Some((_, deadline)) = &mut self.slot {
            *deadline = (*deadline).min(Instant::now() + END_GRACE);
        }
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
