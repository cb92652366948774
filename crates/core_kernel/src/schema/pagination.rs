//! Pagination schema

use serde_json::Value;

use super::{coerce_i64, ObjectReader, Path, Schema};
use crate::error::DomainError;
use crate::pagination::{PageRequest, Pagination, PaginationConfig};

pub(crate) const PAGINATION_KEYS: &[&str] = &["page", "elementsByPage"];

/// Schema of `{page?, elementsByPage?}`, producing `{skip, take}`
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationSchema {
    config: PaginationConfig,
}

impl PaginationSchema {
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    /// Reads the two paging keys from an object that may carry other keys
    pub(crate) fn read(&self, reader: &ObjectReader<'_>) -> Result<PageRequest, DomainError> {
        let page = self.bounded(reader, "page")?.unwrap_or(1);
        let elements_by_page = self
            .bounded(reader, "elementsByPage")?
            .unwrap_or(self.config.default_page_size);
        PageRequest::with_config(page, elements_by_page, &self.config)
            .map_err(|error| reader.path().error(error.description()))
    }

    fn bounded(&self, reader: &ObjectReader<'_>, key: &str) -> Result<Option<u32>, DomainError> {
        let Some(value) = reader.scalar(key, coerce_i64)? else {
            return Ok(None);
        };
        if value > i64::from(u32::MAX) {
            return Err(reader
                .path()
                .key(key)
                .error(format!("must be less than or equal to {}", u32::MAX)));
        }
        // Negative and zero values fall through to the range check
        Ok(Some(u32::try_from(value.max(0)).unwrap_or(0)))
    }
}

impl Schema for PaginationSchema {
    type Output = Pagination;

    fn parse_at(&self, input: &Value, path: &Path) -> Result<Pagination, DomainError> {
        let reader = ObjectReader::new(input, path, PAGINATION_KEYS)?;
        Ok(self.read(&reader)?.to_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_three() {
        let window = PaginationSchema::default()
            .parse(&json!({ "page": 3, "elementsByPage": 10 }))
            .unwrap();
        assert_eq!(window, Pagination { skip: 20, take: 10 });
    }

    #[test]
    fn test_query_string_values() {
        let window = PaginationSchema::default()
            .parse(&json!({ "page": "2", "elementsByPage": "25" }))
            .unwrap();
        assert_eq!(window, Pagination { skip: 25, take: 25 });
    }

    #[test]
    fn test_defaults_when_absent() {
        let window = PaginationSchema::default().parse(&json!({})).unwrap();
        assert_eq!(window, Pagination { skip: 0, take: 10 });
    }

    #[test]
    fn test_rejections() {
        let schema = PaginationSchema::default();
        assert!(schema.parse(&json!({ "elementsByPage": 101 })).is_err());
        assert!(schema.parse(&json!({ "page": 0 })).is_err());
        assert!(schema.parse(&json!({ "page": -4 })).is_err());
        assert!(schema.parse(&json!({ "offset": 5 })).is_err());
    }

    #[test]
    fn test_page_beyond_u32_is_rejected_not_clamped() {
        let schema = PaginationSchema::default();
        let error = schema.parse(&json!({ "page": 4_294_967_296u64 })).unwrap_err();
        assert_eq!(error.error_code(), "com-1000");
        assert_eq!(error.description(), "$.page: must be less than or equal to 4294967295");

        let error = schema.parse(&json!({ "elementsByPage": "9999999999" })).unwrap_err();
        assert_eq!(error.description(), "$.elementsByPage: must be less than or equal to 4294967295");

        let last = schema.parse(&json!({ "page": 4_294_967_295u64, "elementsByPage": 1 })).unwrap();
        assert_eq!(last, Pagination { skip: 4_294_967_294, take: 1 });
    }
}
