//! Domain tests module.
//!
//! - Golden tests: end-to-end flows through the reducer
//! - Property tests: proptest-based checks of the reducer invariants
//! - Replay tests: replayed logs against live delivery

mod golden;
mod support;
