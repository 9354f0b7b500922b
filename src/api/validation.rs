use super::{ApiError, MAX_PAGE_LIMIT as MAX_LIMIT};

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {resource} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    const MIN_LIMIT: u64 = 1;

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between {MIN_LIMIT} and {MAX_LIMIT}"
        )));
    }
    Ok(limit)
}

/// Accepts `asc`/`desc` in any case. Returns `true` for descending.
pub fn validate_sort_order(order: Option<&str>) -> Result<bool, ApiError> {
    match order.map(str::to_ascii_lowercase).as_deref() {
        None | Some("asc") => Ok(false),
        Some("desc") => Ok(true),
        Some(other) => Err(ApiError::validation(format!(
            "Invalid sort order: {other}. Use 'asc' or 'desc'"
        ))),
    }
}

pub fn validate_search_query(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("User", 1).is_ok());
        assert!(validate_id("User", 12345).is_ok());
        assert!(validate_id("User", 0).is_err());
        assert!(validate_id("User", -1).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(500).is_ok());
        assert!(validate_limit(1000).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(1001).is_err());
    }

    #[test]
    fn test_validate_sort_order() {
        assert!(!validate_sort_order(None).unwrap());
        assert!(!validate_sort_order(Some("asc")).unwrap());
        assert!(validate_sort_order(Some("DESC")).unwrap());
        assert!(validate_sort_order(Some("sideways")).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query(Some("  alice ")), Some("alice".into()));
        assert_eq!(validate_search_query(Some("   ")), None);
        assert_eq!(validate_search_query(None), None);
    }
}
