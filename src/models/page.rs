use serde::Serialize;

/// Highest page a caller can ask for; keeps offsets well inside `i64`.
pub const MAX_PAGE: usize = 1_000_000;

/// A 1-based page turned into an offset window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub page: usize,
    pub limit: usize,
}

impl PageRange {
    pub fn new(page: usize, limit: usize) -> Self {
        PageRange {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Unparseable values fall back to the defaults. `page` is clamped to
    /// `1..=MAX_PAGE` and `limit` to `1..=max_limit`.
    pub fn from_params(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_PAGE as i64) as usize;
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(default_limit as i64)
            .clamp(1, max_limit as i64) as usize;

        PageRange { page, limit }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Paged<T> {
    /// Slices an already ordered collection.
    pub fn from_sorted(all: Vec<T>, range: PageRange) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(range.offset())
            .take(range.limit)
            .collect();
        Paged { items, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub count: usize,
    pub has_more: bool,
}

impl<T> PageResponse<T> {
    pub fn new(paged: Paged<T>, range: PageRange) -> Self {
        let has_more = range.offset().saturating_add(paged.items.len()) < paged.total;
        PageResponse {
            items: paged.items,
            page: range.page,
            limit: range.limit,
            count: paged.total,
            has_more,
        }
    }
}
