//! Page-based pagination
//!
//! Requests address pages (`page`, `elementsByPage`); stores want an offset
//! window (`skip`, `take`). [`PageRequest`] validates the former and
//! [`PageRequest::to_window`] converts it.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Paging limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "max_page_size")]
    pub max_page_size: u32,
}

fn default_page_size() -> u32 {
    10
}

fn max_page_size() -> u32 {
    100
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: max_page_size(),
        }
    }
}

impl PaginationConfig {
    pub fn with_max_page_size(mut self, max: u32) -> Self {
        self.max_page_size = max;
        self
    }
}

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    page: u32,
    elements_by_page: u32,
}

/// Offset window handed to stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub skip: u64,
    pub take: u64,
}

impl PageRequest {
    /// Validates against the default limits
    pub fn new(page: u32, elements_by_page: u32) -> Result<Self, DomainError> {
        Self::with_config(page, elements_by_page, &PaginationConfig::default())
    }

    /// Validates against the given limits
    pub fn with_config(
        page: u32,
        elements_by_page: u32,
        config: &PaginationConfig,
    ) -> Result<Self, DomainError> {
        if page < 1 {
            return Err(DomainError::validation("page must be greater than or equal to 1"));
        }
        if elements_by_page < 1 {
            return Err(DomainError::validation(
                "elementsByPage must be greater than or equal to 1",
            ));
        }
        if elements_by_page > config.max_page_size {
            return Err(DomainError::validation(format!(
                "elementsByPage must be less than or equal to {}",
                config.max_page_size
            )));
        }
        Ok(Self {
            page,
            elements_by_page,
        })
    }

    /// First page at the configured default size
    pub fn first(config: &PaginationConfig) -> Self {
        Self {
            page: 1,
            elements_by_page: config.default_page_size.clamp(1, config.max_page_size.max(1)),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn elements_by_page(&self) -> u32 {
        self.elements_by_page
    }

    /// Converts to `{skip, take}`; total for every validated request
    pub fn to_window(&self) -> Pagination {
        let take = u64::from(self.elements_by_page);
        Pagination {
            skip: take.saturating_mul(u64::from(self.page) - 1),
            take,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(&PaginationConfig::default())
    }
}

impl From<PageRequest> for Pagination {
    fn from(request: PageRequest) -> Self {
        request.to_window()
    }
}
