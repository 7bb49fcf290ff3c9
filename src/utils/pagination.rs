use serde::{Deserialize, Serialize};
use url::Url;

use crate::db::{Listing, Window};
use crate::errors::AppError;
use crate::models::employee::Employee;

pub const MAX_PAGE_SIZE: usize = 100;
pub const INVALID_PAGE: &str = "Invalid page.";

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// A page that is not a positive integer is an invalid page; a bad
    /// `page_size` falls back to the default.
    pub fn from_params(params: &PageParams, default_page_size: usize) -> Result<Self, AppError> {
        let page = match params.page.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            None => 1,
            Some(raw) => match raw.parse::<usize>() {
                Ok(page) if page >= 1 => page,
                _ => return Err(AppError::NotFound(INVALID_PAGE.to_string())),
            },
        };

        let page_size = params
            .page_size
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(default_page_size)
            .min(MAX_PAGE_SIZE);

        // A page whose offset does not fit a signed 64-bit row offset lies
        // past the end of any listing.
        let offset = (page - 1).checked_mul(page_size);
        if offset.map_or(true, |offset| i64::try_from(offset).is_err()) {
            return Err(AppError::NotFound(INVALID_PAGE.to_string()));
        }

        Ok(Self { page, page_size })
    }

    pub fn window(&self) -> Window {
        Window {
            offset: (self.page - 1) * self.page_size,
            limit: self.page_size,
        }
    }

    fn num_pages(&self, count: usize) -> usize {
        ((count + self.page_size - 1) / self.page_size).max(1)
    }

    /// Wraps a listing into the `{count, next, previous, results}` envelope,
    /// linking neighbouring pages relative to `url`.
    pub fn paginate(
        &self,
        listing: Listing,
        url: &Url,
    ) -> Result<PaginatedResponse<Employee>, AppError> {
        let num_pages = self.num_pages(listing.count);
        if self.page > num_pages {
            return Err(AppError::NotFound(INVALID_PAGE.to_string()));
        }

        Ok(PaginatedResponse {
            count: listing.count,
            next: (self.page < num_pages).then(|| page_link(url, Some(self.page + 1))),
            previous: (self.page > 1).then(|| {
                let previous = self.page - 1;
                page_link(url, (previous > 1).then_some(previous))
            }),
            results: listing.items,
        })
    }
}

/// `url` with its `page` parameter replaced, or removed when `page` is `None`.
fn page_link(url: &Url, page: Option<usize>) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if let Some(page) = page {
        pairs.push(("page".to_string(), page.to_string()));
    }

    let mut link = url.clone();
    link.set_query(None);
    if !pairs.is_empty() {
        link.query_pairs_mut().extend_pairs(pairs);
    }
    link.to_string()
}
