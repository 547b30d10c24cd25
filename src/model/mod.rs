//! Data types, in the shapes they take at each boundary.
//!
//! - [`db`]: records as stored.
//! - [`api`]: forms, fixtures and view contexts.
//! - [`common`]: logic shared by both, such as the voting window.
//! - [`mongodb`]: IDs, collections and database error helpers.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
