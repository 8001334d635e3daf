//! fitsync — keeps a fitness tracker's signed-in user consistent with its
//! hosted auth session, plus the workout data layer behind the dashboard.
//!
//! ARCHITECTURE
//! ============
//! `sync::Synchronizer` is the core: it reconciles `auth::AuthProvider`
//! sessions with `profile::ProfileStore` rows and publishes the result as a
//! reactive `AuthState`. Concrete collaborators (`auth::gotrue`,
//! `profile::postgres`) live beside their traits; `services` carries the
//! workout CRUD and progress arithmetic.

pub mod auth;
pub mod config;
pub mod db;
pub mod nav;
pub mod profile;
pub mod services;
pub mod sync;
