use serde::{Deserialize, Serialize};

pub(crate) const MAX_LIMIT: i64 = 100;
pub(crate) const QUIZ_PAGE_SIZE: i64 = 12;
pub(crate) const RESULTS_PAGE_SIZE: i64 = 10;

pub(crate) const fn default_limit() -> i64 {
    MAX_LIMIT
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

/// `?page=N` (1-based) or `?skip=&limit=`; `page` wins when both are given.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    skip: i64,
    #[serde(default)]
    limit: Option<i64>,
}

impl PageQuery {
    /// Resolves to `(skip, limit)` with `page_size` as the default limit.
    pub(crate) fn window(&self, page_size: i64) -> (i64, i64) {
        let limit = self.limit.unwrap_or(page_size).clamp(1, MAX_LIMIT);
        let skip = match self.page {
            Some(page) => (page.max(1) - 1) * limit,
            None => self.skip.max(0),
        };
        (skip, limit)
    }
}
