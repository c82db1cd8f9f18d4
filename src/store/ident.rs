use std::sync::LazyLock;

use regex::Regex;

use crate::store::StoreError;

static IDENTIFIER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").ok());

/// Labels, relationship types and property names are spliced into queries,
/// so only plain identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<&str, StoreError> {
    match IDENTIFIER.as_ref() {
        Some(re) if re.is_match(name) => Ok(name),
        _ => Err(StoreError::InvalidIdentifier(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        for name in ["ZoneCell", "h3_cell", "HAS_CELL", "_private"] {
            assert!(validate_identifier(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_injection_attempts() {
        for name in ["", "1abc", "Zone`) DETACH DELETE n //", "moku id", "a-b"] {
            assert!(validate_identifier(name).is_err(), "{name}");
        }
    }
}
