// src/common/pagination.rs

use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// A page cut out of an already filtered, in-memory list.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

impl<T> Paginated<T> {
    /// Pages are 1-based. Out-of-range pages yield an empty `items`.
    pub fn from_vec(all: Vec<T>, page: Option<usize>, limit: Option<usize>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = page.unwrap_or(1).max(1);
        let total = all.len();
        let total_pages = total.div_ceil(limit);

        let items = all.into_iter().skip((page - 1) * limit).take(limit).collect();

        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

/// Case-insensitive substring match used by the list filters.
pub fn matches_search(needle: &str, haystacks: &[Option<&str>]) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    haystacks
        .iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_the_requested_page() {
        let page = Paginated::from_vec((1..=25).collect::<Vec<_>>(), Some(3), Some(10));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn clamps_page_and_limit() {
        let page = Paginated::from_vec(vec![1, 2, 3], Some(0), Some(0));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.items, vec![1]);

        let past_end = Paginated::from_vec(vec![1, 2, 3], Some(9), None);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_pages, 1);
    }

    #[test]
    fn search_ignores_case_and_missing_fields() {
        assert!(matches_search("ANNA", &[None, Some("anna haddad")]));
        assert!(!matches_search("zed", &[Some("anna"), None]));
        assert!(matches_search("  ", &[None]));
    }
}
