//! # Pelada Core
//!
//! Domain types and the pure parts of the attendance engine: session
//! recurrence, capacity and admission rules, notification due checks, reply
//! parsing, message templates and calendar validation.
//!
//! Nothing in this crate performs I/O. Persistence lives in `pelada-db` and
//! message delivery in `pelada-notifier`.

pub mod capacity;
pub mod errors;
pub mod messages;
pub mod models;
pub mod recurrence;
pub mod reply;
pub mod schedule;
pub mod validation;

pub use errors::{PeladaError, PeladaResult};
