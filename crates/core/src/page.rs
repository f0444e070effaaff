//! Paginated collections.

use serde::{Deserialize, Serialize};

/// Page metadata as returned by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl Pagination {
    /// Metadata for a collection that fits on one page.
    #[must_use]
    pub fn single_page(len: usize) -> Self {
        let len32 = u32::try_from(len).unwrap_or(u32::MAX);
        Self {
            page: 1,
            limit: len32,
            total: u64::try_from(len).unwrap_or(u64::MAX),
            pages: 1,
        }
    }

    /// Whether a page after this one exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

/// One page of a collection.
///
/// Deserializes from either `{"items": [...], "pagination": {...}}` or a bare
/// array, which is treated as a single complete page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PageRepr<T>")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageRepr<T> {
    Paged { items: Vec<T>, pagination: Pagination },
    Bare(Vec<T>),
}

impl<T> From<PageRepr<T>> for Paginated<T> {
    fn from(repr: PageRepr<T>) -> Self {
        match repr {
            PageRepr::Paged { items, pagination } => Self { items, pagination },
            PageRepr::Bare(items) => {
                let pagination = Pagination::single_page(items.len());
                Self { items, pagination }
            }
        }
    }
}
