//! Page arithmetic for search results.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Page size assumed when the query does not set one.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Paging metadata of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Total matching documents.
    pub total_count: i64,
    /// Documents per page.
    pub page_size: i64,
    /// Current page, starting at 1.
    pub page_current: i64,
    /// Number of pages, at least 1.
    pub page_nb: i64,
}

impl PageInfo {
    /// Derive paging metadata from the query offset/limit and the hit count.
    pub fn compute(from: Option<u32>, size: Option<u32>, total_count: i64) -> Self {
        let page_size = size.map_or(DEFAULT_PAGE_SIZE, i64::from);

        let page_current = match from {
            Some(from) if from > 0 && page_size > 0 => i64::from(from) / page_size + 1,
            _ => 1,
        };

        Self {
            total_count,
            page_size,
            page_current,
            page_nb: page_count(total_count, page_size),
        }
    }

    /// Whether a page follows the current one.
    pub fn has_next(&self) -> bool {
        self.page_current < self.page_nb
    }

    /// Whether a page precedes the current one.
    pub fn has_previous(&self) -> bool {
        self.page_current > 1
    }
}

/// Number of pages needed for `total_count` documents.
///
/// The quotient is first rounded half-up to two decimal places and only then raised to
/// the next integer, so a remainder below half a hundredth of a page does not open a
/// new page (1001 documents by 1000 make a single page).
pub fn page_count(total_count: i64, page_size: i64) -> i64 {
    if page_size == 0 {
        return 1;
    }

    Decimal::from(total_count)
        .checked_div(Decimal::from(page_size))
        .map(|ratio| ratio.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|ratio| ratio.ceil().to_i64())
        .unwrap_or(1)
        .max(1)
}
