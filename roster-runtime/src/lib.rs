//! Roster Runtime
//!
//! A [`Crew`] holds one agent per role and runs single commands or whole
//! workflow plans against them.

pub mod crew;

pub use crew::*;
