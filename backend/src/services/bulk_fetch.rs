//! Paginated bulk loading
//!
//! Large per-week datasets are read in fixed-size offset pages until a page
//! comes back shorter than requested.

use std::future::Future;

use shared::PageRequest;

use crate::error::{AppError, AppResult};

/// Running totals reported after each page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub pages: usize,
    pub records: usize,
}

/// Fetch pages of `page_size` until exhaustion and return every row.
///
/// When the total is an exact multiple of the page size the last request
/// returns an empty page. There is no cancellation; the first failing page
/// aborts the whole load.
pub async fn fetch_all_pages<T, F, Fut, P>(
    page_size: usize,
    mut fetch_page: F,
    mut on_page: P,
) -> AppResult<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = AppResult<Vec<T>>>,
    P: FnMut(PageProgress),
{
    if page_size == 0 {
        return Err(AppError::Configuration(
            "page size must be greater than zero".to_string(),
        ));
    }

    let mut page = PageRequest::first(page_size);
    let mut rows = Vec::new();
    let mut pages = 0;

    loop {
        let batch = fetch_page(page).await?;
        let returned = batch.len();
        pages += 1;
        rows.extend(batch);

        let (from, to) = page.range();
        tracing::debug!(from, to, returned, total = rows.len(), "Fetched page");
        on_page(PageProgress {
            pages,
            records: rows.len(),
        });

        if page.is_last(returned) {
            break;
        }
        page = page.next();
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    async fn run(total: usize, page_size: usize) -> (Vec<usize>, usize) {
        let calls = RefCell::new(0);
        let data: Vec<usize> = (0..total).collect();
        let rows = fetch_all_pages(
            page_size,
            |page| {
                *calls.borrow_mut() += 1;
                let slice: Vec<usize> = data.iter().skip(page.offset).take(page.limit).copied().collect();
                async move { Ok(slice) }
            },
            |_| {},
        )
        .await
        .unwrap();
        let n = *calls.borrow();
        (rows, n)
    }

    #[tokio::test]
    async fn test_partial_last_page_stops() {
        let (rows, calls) = run(12, 5).await;
        assert_eq!(rows.len(), 12);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_empty_page() {
        let (rows, calls) = run(10, 5).await;
        assert_eq!(rows.len(), 10);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let result = fetch_all_pages(0, |_| async { Ok(Vec::<u8>::new()) }, |_| {}).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
