//! SkillDrops core: offline-first persistence for a micro-learning client.
//!
//! The crate is organized around a shared repository contract with two
//! backends:
//!
//! - [`store::LocalStore`]: SQLite-backed on-device store (skills,
//!   favorites, ratings, key-value settings), used while signed out.
//! - [`store::RemoteStore`]: the same contract layered over a per-user
//!   document store, used while signed in.
//!
//! [`migration::MigrationCoordinator`] moves local favorites into the
//! signed-in user's remote namespace exactly once, [`stats`] derives the
//! display counters (including the day streak), and [`offline`] keeps a
//! versioned cache of app-shell resources so the client loads without a
//! network. [`app::AppContext`] ties the pieces together and selects the
//! active store from the current [`identity::AuthState`].

pub mod app;
pub mod config;
pub mod identity;
pub mod migration;
pub mod offline;
pub mod stats;
pub mod store;
