//! Listing options and result pages

use serde::{Deserialize, Serialize};

use crate::store::OrderField;
use crate::types::wire_enum;

wire_enum! {
    /// Direction of a listing
    SortOrder {
        Asc => "ASC",
        Desc => "DESC",
    }
}

/// Caller-facing listing options
///
/// All fields absent means store default page size, store default ordering
/// and no filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// Maximum number of items in the page
    pub page_size: Option<usize>,
    /// Field to order by
    pub order_by: Option<OrderField>,
    /// Direction; ascending when only `order_by` is given
    pub sort_order: Option<SortOrder>,
    /// Cursor returned by the previous page
    pub next_page_token: Option<String>,
    /// Additional caller filter in the store query language
    pub filter_query: Option<String>,
}

impl ListOptions {
    /// Options with only a page size
    pub fn page(size: usize) -> Self {
        Self {
            page_size: Some(size),
            ..Default::default()
        }
    }

    /// Same options continuing from a cursor
    pub fn after(&self, token: impl Into<String>) -> Self {
        Self {
            next_page_token: Some(token.into()),
            ..self.clone()
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    /// Items of the page
    pub items: Vec<T>,
    /// Cursor for the next page; empty when this is the last page
    pub next_page_token: String,
    /// Requested page size (0 when the store default was used)
    pub page_size: usize,
    /// Number of items in this page
    pub size: usize,
}

impl<T> ListPage<T> {
    /// Build a page from its items
    pub fn new(items: Vec<T>, next_page_token: String, page_size: Option<usize>) -> Self {
        Self {
            size: items.len(),
            items,
            next_page_token,
            page_size: page_size.unwrap_or(0),
        }
    }
}
