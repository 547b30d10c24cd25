//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//!
//! Each record comes in two flavours: `NewX` without an ID, and `X` with one.

pub mod choice;
pub mod question;
pub mod user;
pub mod vote;

pub use choice::{Choice, NewChoice};
pub use question::{NewQuestion, Question};
pub use user::{NewUser, User};
pub use vote::{NewVote, Vote};
