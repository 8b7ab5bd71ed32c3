/// Default page size for user and tenant listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Default page size for activity and error logs.
pub const DEFAULT_LOG_LIMIT: u32 = 100;

/// Pagination and search for list endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub limit: u32,
    pub offset: u32,
    pub search: Option<String>,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            search: None,
        }
    }
}

impl PageParams {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("limit", Some(self.limit.to_string())),
            ("offset", Some(self.offset.to_string())),
            ("search", non_empty(&self.search)),
        ]
    }
}

/// Filters for the activity log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilters {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub since: Option<String>,
}

impl ActivityFilters {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("user_id", non_empty(&self.user_id)),
            ("action", non_empty(&self.action)),
            ("since", non_empty(&self.since)),
        ]
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|s| !s.is_empty())
}
