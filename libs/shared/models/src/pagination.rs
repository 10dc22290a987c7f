use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MIN_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

/// Normalized page window. `per_page` is clamped to 10..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(MIN_PER_PAGE, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total: i64) -> Self {
        let per_page = pagination.per_page as i64;
        let last_page = ((total + per_page - 1) / per_page).max(1) as u32;
        Self {
            data,
            meta: PageMeta {
                current_page: pagination.page,
                per_page: pagination.per_page,
                total,
                last_page,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}
