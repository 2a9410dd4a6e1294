pub mod events;
pub mod goals;

use crate::core::record::RecordId;
use crate::store::StoreError;

/// Failures surfaced by mutation handlers.
///
/// The validation variants come back before any write is attempted; `Store`
/// wraps a write that reached the record store and failed, after which the
/// cache was left untouched (or reloaded, on the drag paths). The rendering
/// surface decides what deserves a dialog; a control that was already
/// disabled can swallow the validation variants silently.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StateError {
    #[error("no signed-in user")]
    NoSession,
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("{field} is limited to {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("invalid date/time input")]
    InvalidDateTime,
    #[error("no record with id {0}")]
    UnknownRecord(RecordId),
    #[error("record store write failed: {0}")]
    Store(#[from] StoreError),
}
