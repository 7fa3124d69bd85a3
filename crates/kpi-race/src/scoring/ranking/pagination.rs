use serde::{Deserialize, Serialize};

/// 1-based page request. A missing size falls back to the configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "first_page")]
    pub page: usize,
    #[serde(default)]
    pub size: Option<usize>,
}

fn first_page() -> usize {
    1
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: first_page(),
            size: None,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: Some(size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: usize,
    pub page_size: usize,
    pub pages: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("page numbers start at 1")]
    ZeroPage,
    #[error("page size must be at least 1")]
    ZeroSize,
}

/// Slices an already ordered list. Pages past the end come back empty with accurate metadata.
pub fn paginate<T>(
    items: Vec<T>,
    request: PageRequest,
    default_size: usize,
) -> Result<Page<T>, PageError> {
    if request.page == 0 {
        return Err(PageError::ZeroPage);
    }
    let page_size = request.size.unwrap_or(default_size);
    if page_size == 0 {
        return Err(PageError::ZeroSize);
    }

    let total = items.len();
    let pages = total.div_ceil(page_size);
    let start = (request.page - 1).saturating_mul(page_size);
    let items = items.into_iter().skip(start).take(page_size).collect();

    Ok(Page {
        items,
        meta: PageMeta {
            page: request.page,
            page_size,
            pages,
            total,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_requested_page() {
        let page = paginate((1..=7).collect::<Vec<_>>(), PageRequest::new(2, 3), 10)
            .expect("valid request");
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(
            page.meta,
            PageMeta {
                page: 2,
                page_size: 3,
                pages: 3,
                total: 7
            }
        );
    }

    #[test]
    fn last_page_may_be_short_and_later_pages_empty() {
        let items: Vec<_> = (1..=7).collect();
        let last = paginate(items.clone(), PageRequest::new(3, 3), 10).expect("valid");
        assert_eq!(last.items, vec![7]);

        let beyond = paginate(items, PageRequest::new(9, 3), 10).expect("valid");
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.meta.pages, 3);
    }

    #[test]
    fn default_size_applies_when_absent() {
        let page = paginate(vec!['a'; 12], PageRequest::default(), 10).expect("valid");
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.meta.pages, 2);
    }

    #[test]
    fn empty_list_has_zero_pages() {
        let page = paginate(Vec::<u8>::new(), PageRequest::default(), 10).expect("valid");
        assert!(page.items.is_empty());
        assert_eq!(page.meta.pages, 0);
        assert_eq!(page.meta.total, 0);
    }

    #[test]
    fn zero_page_or_size_is_rejected() {
        assert_eq!(
            paginate(vec![1], PageRequest::new(0, 5), 10),
            Err(PageError::ZeroPage)
        );
        assert_eq!(
            paginate(vec![1], PageRequest::new(1, 0), 10),
            Err(PageError::ZeroSize)
        );
    }
}
