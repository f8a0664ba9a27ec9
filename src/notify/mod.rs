//! Burst coalescing for change notifications.
//!
//! Observers of the engine get "something changed, go refresh" pushes. A
//! burst of triggers within a short window must collapse into one publish per
//! (signal, observer) pair carrying the latest data, while a throttle ceiling
//! guarantees at least one publish per window under continuous triggering.
//!
//! Implemented with one deadline-tracking timer per burst instead of a
//! debounce/throttle timer pair: every dispatch moves the deadline to
//! `min(now + debounce, window_start + throttle)`.

mod coalescer;
mod hub;
pub use coalescer::*;
pub use hub::*;

#[cfg(test)]
mod notify_test;
