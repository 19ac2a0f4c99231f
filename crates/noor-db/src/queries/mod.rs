pub mod content;
pub mod provision;
pub mod questions;
pub mod roster;
pub mod sessions;
pub mod tokens;

use anyhow::Result;

/// SQLite `datetime()` modifier for an offset in hours, e.g. `+24 hours`.
pub(crate) fn hours_modifier(hours: i64) -> String {
    format!("{:+} hours", hours)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
