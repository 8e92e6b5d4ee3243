//! Shared test utilities for the notebook-store workspace.
//!
//! This crate is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`root`]: [`TestRoot`] temporary store root backed by the host filesystem
//! - [`faulty`]: [`FaultyFs`] backend wrapper for fault injection

pub mod faulty;
pub mod root;

pub use faulty::{FaultyFs, Occupant};
pub use root::TestRoot;
