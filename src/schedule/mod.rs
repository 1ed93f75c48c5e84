//! Slot availability and conflict detection.
//!
//! Three layers, leaf to root:
//!
//! - [`overlap`]: pure half-open interval intersection, the foundation for
//!   every conflict decision in the crate.
//! - [`slots`]: walks a provider's working window in duration-sized steps and
//!   tags each candidate slot free or taken. The list is regenerated on every
//!   call — a previously returned slot may have been booked by another client
//!   in the meantime, so nothing here is cacheable.
//! - [`conflict`]: the store-backed guard that decides whether a candidate
//!   booking overlaps any *active* (slot-holding) appointment of the same
//!   provider, with optional self-exclusion for edits.

pub mod conflict;
pub mod overlap;
pub mod slots;

pub use conflict::ConflictGuard;
pub use overlap::{overlaps, overlaps_any, TimeWindow};
pub use slots::{generate_slots, Slot};
