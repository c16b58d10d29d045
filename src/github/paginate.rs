//! Lazy walk over a paginated collection endpoint.

use super::client::{decode, error_for_status, GitHubClient};
use crate::error::{ApiError, ApiResult};
use reqwest::header::LINK;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Finite, non-restartable sequence of pages from one collection endpoint.
///
/// Holds at most one page at a time. The sequence ends on an empty page, a
/// short page, or a `Link` header without `rel="next"`; after that
/// [`next_page`](Self::next_page) keeps returning `None`.
pub struct Paginator<'a, T> {
    client: &'a GitHubClient,
    path: String,
    query: Vec<(&'static str, String)>,
    page: u32,
    per_page: u32,
    lenient: bool,
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> Paginator<'a, T> {
    pub fn new(client: &'a GitHubClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            query: Vec::new(),
            page: 1,
            per_page: client.per_page(),
            lenient: false,
            finished: false,
            _marker: PhantomData,
        }
    }

    /// Add a fixed query parameter sent with every page.
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// End the sequence quietly on a client error instead of failing.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Fetch the next page, or `None` once the collection is exhausted.
    pub async fn next_page(&mut self) -> ApiResult<Option<Vec<T>>> {
        if self.finished {
            return Ok(None);
        }

        let mut query = self.query.clone();
        query.push(("per_page", self.per_page.to_string()));
        query.push(("page", self.page.to_string()));

        let response = match self.client.send(&self.path, &query).await {
            Ok(response) => response,
            Err(ApiError::Forbidden(_)) if self.lenient => {
                self.finished = true;
                return Ok(None);
            }
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.finished = true;
            if self.lenient && status.is_client_error() {
                return Ok(None);
            }
            return Err(error_for_status(&self.path, response).await);
        }

        let has_next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(has_next_link);

        let items: Vec<T> = match decode(&self.path, response).await {
            Ok(items) => items,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        if items.is_empty() {
            self.finished = true;
            return Ok(None);
        }
        if items.len() < self.per_page as usize || has_next == Some(false) {
            self.finished = true;
        }
        self.page += 1;
        Ok(Some(items))
    }

    /// Drain the whole collection into memory.
    pub async fn collect_all(mut self) -> ApiResult<Vec<T>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }

    /// Count the items of the collection without keeping them.
    pub async fn count(mut self) -> ApiResult<u64> {
        let mut total = 0u64;
        while let Some(page) = self.next_page().await? {
            total += page.len() as u64;
        }
        Ok(total)
    }
}

/// Whether a `Link` header advertises a next page.
fn has_next_link(link: &str) -> bool {
    link.split(',')
        .any(|part| part.split(';').skip(1).any(|p| p.trim() == r#"rel="next""#))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_next_link() {
        let link = r#"<https://api.github.com/orgs/a/repos?page=2>; rel="next", <https://api.github.com/orgs/a/repos?page=5>; rel="last""#;
        assert!(has_next_link(link));
    }

    #[test]
    fn test_last_page_link() {
        let link = r#"<https://api.github.com/orgs/a/repos?page=1>; rel="first", <https://api.github.com/orgs/a/repos?page=4>; rel="prev""#;
        assert!(!has_next_link(link));
    }
}
