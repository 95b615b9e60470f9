// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Wire contract for the AdaptWiki service.

mod dto;
mod errors;
mod params;

pub use dto::{
    HistoryResponse, HistoryRow, LoginResponse, MessageResponse, SearchResponse, UpdatePageRequest,
};
pub use errors::{ApiError, ApiErrorCode};
pub use params::parse_search_params;

pub const CRATE_NAME: &str = "adaptwiki-api";
