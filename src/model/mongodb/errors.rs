//! The mongodb crate doesn't provide error code constants.

use mongodb::error::{
    Error as DbError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR,
};

pub const DUPLICATE_KEY: i32 = 11000;

/// Did this error come from violating a unique index?
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(ref e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Did this error come from two writers racing on the same record, either
/// through a unique index or a conflicting transaction?
pub fn is_write_conflict(err: &DbError) -> bool {
    is_duplicate_key_error(err) || err.contains_label(TRANSIENT_TRANSACTION_ERROR)
}
