//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Parse a UUID stored as TEXT in the database
///
/// Stored identifiers are always written by this crate, so a parse failure
/// means the row is corrupt.
pub fn parse_stored(column: &str, s: &str) -> crate::Result<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| crate::Error::CorruptRow {
            column: column.to_string(),
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_v4() {
        let id = generate();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_parse_stored_rejects_garbage() {
        let err = parse_stored("book_id", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("book_id"));
    }
}
