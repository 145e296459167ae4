//! Parsing of the `dp:<name>` / `dp:<name>:<table>` external identifiers
//! used by the resource API facade (C5).

use crate::error::ServerError;

/// Parse a product identifier of the form `dp:<name>`.
pub fn parse_product_id(id: &str) -> Result<String, ServerError> {
    let name = id
        .strip_prefix("dp:")
        .ok_or_else(|| ServerError::BadIdentifier(format!("Invalid id: {id}")))?;

    if name.is_empty() || name.contains(':') || !registry_core::model::NAME_RE.is_match(name) {
        return Err(ServerError::BadIdentifier(format!("Invalid id: {id}")));
    }

    Ok(name.to_string())
}

/// Parse a schema identifier of the form `dp:<name>:<table>`.
pub fn parse_schema_id(id: &str) -> Result<(String, String), ServerError> {
    let rest = id
        .strip_prefix("dp:")
        .ok_or_else(|| ServerError::BadIdentifier(format!("Invalid id: {id}")))?;

    let (name, table) = rest
        .split_once(':')
        .ok_or_else(|| ServerError::BadIdentifier(format!("Invalid id: {id}")))?;

    if name.is_empty()
        || table.is_empty()
        || table.contains(':')
        || !registry_core::model::NAME_RE.is_match(name)
        || !registry_core::model::NAME_RE.is_match(table)
    {
        return Err(ServerError::BadIdentifier(format!("Invalid id: {id}")));
    }

    Ok((name.to_string(), table.to_string()))
}

/// Format a product's external identifier.
pub fn product_id(name: &str) -> String {
    format!("dp:{name}")
}

/// Format a schema's external identifier.
pub fn schema_id(product_name: &str, table_name: &str) -> String {
    format!("dp:{product_name}:{table_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_product_id() {
        assert_eq!(parse_product_id("dp:hmpps_use_of_force").unwrap(), "hmpps_use_of_force");
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(parse_product_id("hmpps_use_of_force").is_err());
    }

    #[test]
    fn rejects_extra_segment() {
        assert!(parse_product_id("dp:hmpps:extra").is_err());
    }

    #[test]
    fn parses_valid_schema_id() {
        assert_eq!(
            parse_schema_id("dp:p:t").unwrap(),
            ("p".to_string(), "t".to_string())
        );
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(parse_product_id("dp:hmpps_use_of_the_force!").is_err());
    }
}
