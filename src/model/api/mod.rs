//! API-compatible (e.g. de/serialisable) types.
//!
//! The types in this module face the outside world: forms and fixtures coming
//! in, view contexts going out. IDs are plain hex strings and datetimes are
//! RFC 3339.

pub mod auth;
pub mod credentials;
pub mod question;
pub mod views;
