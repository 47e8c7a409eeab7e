//! Fixed-size pagination and page-number labels.

use tracing::warn;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page sizes offered to the user.
pub const PAGE_SIZE_OPTIONS: [usize; 5] = [5, 10, 20, 50, 100];

/// Page counts up to this many are listed without ellipses.
const MAX_UNCOLLAPSED_PAGES: usize = 7;

/// Current page (1-based) and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page_index: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 1,
            page_size: page_size.max(1),
        }
    }

    /// Change the page size; always returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == 0 {
            warn!("Ignoring page size of zero");
            return;
        }
        self.page_size = page_size;
        self.page_index = 1;
    }

    /// Clamp the page index into `[1, page_count(total)]`.
    pub fn clamp_to(&mut self, total: usize) {
        self.page_index = self.page_index.clamp(1, page_count(total, self.page_size));
    }
}

/// `max(1, ceil(total / page_size))`
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// One page of an ordered record set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub page_count: usize,
    /// 0-based, inclusive
    pub start_index: usize,
    /// 0-based, exclusive
    pub end_index: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// "Showing 11–20 of 42"
    pub fn summary(&self) -> String {
        if self.total == 0 {
            return "Showing 0–0 of 0".to_string();
        }
        format!(
            "Showing {}–{} of {}",
            self.start_index + 1,
            self.end_index,
            self.total
        )
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_index < self.page_count
    }
}

/// Slice out the requested page. An out-of-range page index is a caller
/// error; it is logged and clamped rather than returned as an empty page.
pub fn apply<T>(records: Vec<T>, state: &PageState) -> Page<T> {
    let total = records.len();
    let page_size = state.page_size.max(1);
    let page_count = page_count(total, page_size);
    let page_index = if (1..=page_count).contains(&state.page_index) {
        state.page_index
    } else {
        warn!(
            requested = state.page_index,
            page_count, "Page index out of range, clamping"
        );
        state.page_index.clamp(1, page_count)
    };

    let start_index = ((page_index - 1) * page_size).min(total);
    let end_index = (start_index + page_size).min(total);
    let items: Vec<T> = records
        .into_iter()
        .skip(start_index)
        .take(end_index - start_index)
        .collect();

    Page {
        items,
        page_index,
        page_count,
        start_index,
        end_index,
        total,
    }
}

/// A page-number affordance: a page to jump to, or a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabel {
    Page(usize),
    Ellipsis,
}

impl std::fmt::Display for PageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageLabel::Page(n) => write!(f, "{}", n),
            PageLabel::Ellipsis => f.write_str("..."),
        }
    }
}

/// Page numbers to show for `current` out of `page_count` pages.
///
/// Seven or fewer pages are all listed. Otherwise the first and last page
/// are always present, with a three-page window around the current page
/// and an ellipsis on each side where pages are skipped. Every emitted page
/// lies in `[1, page_count]`.
pub fn page_labels(current: usize, page_count: usize) -> Vec<PageLabel> {
    let page_count = page_count.max(1);
    let current = current.clamp(1, page_count);

    if page_count <= MAX_UNCOLLAPSED_PAGES {
        return (1..=page_count).map(PageLabel::Page).collect();
    }

    let mut labels = vec![PageLabel::Page(1)];
    if current > 3 {
        labels.push(PageLabel::Ellipsis);
    }

    let mut start = current.saturating_sub(1).max(2);
    let mut end = (current + 1).min(page_count - 1);
    if current <= 3 {
        end = 4;
    }
    if current >= page_count - 2 {
        start = page_count - 3;
    }
    labels.extend((start..=end).map(PageLabel::Page));

    if current < page_count - 2 {
        labels.push(PageLabel::Ellipsis);
    }
    labels.push(PageLabel::Page(page_count));
    labels
}
