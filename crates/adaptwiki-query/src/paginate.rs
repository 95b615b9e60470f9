// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

pub const PAGE_SIZE: usize = 10;

/// Raw page-number input. Anything that did not parse as an integer is
/// `NotANumber`; clamping turns it into page 1, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageParam {
    Number(i64),
    NotANumber,
}

impl Default for PageParam {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl PageParam {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map_or(Self::NotANumber, Self::Number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub number: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub page_size: usize,
}

impl PageWindow {
    #[must_use]
    pub const fn offset(&self) -> usize {
        (self.number - 1) * self.page_size
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Defensive pagination: non-integer input lands on page 1, an integer
/// outside `1..=total_pages` lands on the last valid page. An empty result
/// set has exactly one empty page.
#[must_use]
pub fn clamp_page(total_results: usize, requested: PageParam) -> PageWindow {
    let total_pages = total_results.div_ceil(PAGE_SIZE).max(1);
    let number = match requested {
        PageParam::NotANumber => 1,
        PageParam::Number(n) => {
            if n < 1 || n as usize > total_pages {
                total_pages
            } else {
                n as usize
            }
        }
    };
    PageWindow {
        number,
        total_pages,
        total_results,
        page_size: PAGE_SIZE,
    }
}
