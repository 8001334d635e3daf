//! Domain services used alongside the synchronizer.
//!
//! ARCHITECTURE
//! ============
//! `workout` owns persistence for plans, exercises, logged sessions and 1RM
//! records. `progress` holds the pure arithmetic the dashboard and workout
//! generator display, so it can be tested without a database.

pub mod progress;
pub mod workout;
