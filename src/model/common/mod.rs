//! Types shared between the database and API representations.

pub mod window;

pub use window::VotingWindow;
