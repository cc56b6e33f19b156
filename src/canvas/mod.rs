//! Fetch collaborator: the Canvas LMS REST API. Pagination and auth live
//! here; the reconciler only sees complete batches of records.

pub mod dto;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{AssignmentUpsert, Course};

const DEFAULT_PER_PAGE: u32 = 100;

#[async_trait]
pub trait CanvasClient: Send + Sync {
    async fn fetch_courses(&self) -> Result<Vec<Course>, AppError>;
    async fn fetch_assignments(&self, course_id: i64) -> Result<Vec<AssignmentUpsert>, AppError>;
}

pub struct CanvasHttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CanvasHttpClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, AppError> {
        if base_url.is_empty() || token.is_empty() {
            return Err(AppError::Config(
                "Canvas base URL and token are required".to_string(),
            ));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// GET a collection endpoint, following `Link: <..>; rel="next"`
    /// headers until the last page.
    async fn get_paginated<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, AppError> {
        let mut url = format!(
            "{}/{}?per_page={}",
            self.base_url,
            path.trim_start_matches('/'),
            DEFAULT_PER_PAGE
        );
        let mut all = Vec::new();

        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| AppError::Canvas(format!("request failed: {e}")))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Canvas(format!("{status}: {body}")));
            }

            let next = next_link(response.headers());
            let page: Vec<T> = response
                .json()
                .await
                .map_err(|e| AppError::Canvas(format!("failed to parse response: {e}")))?;
            all.extend(page);

            match next {
                Some(n) => url = n,
                None => break,
            }
        }

        Ok(all)
    }
}

fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    for part in link.split(',') {
        if part.contains("rel=\"next\"") {
            let start = part.find('<')? + 1;
            let end = part.find('>')?;
            return Some(part[start..end].to_string());
        }
    }
    None
}

#[async_trait]
impl CanvasClient for CanvasHttpClient {
    async fn fetch_courses(&self) -> Result<Vec<Course>, AppError> {
        let pages: Vec<dto::CourseDto> = self.get_paginated("courses").await?;
        Ok(pages
            .into_iter()
            .filter_map(|c| {
                Some(Course {
                    id: c.id?,
                    name: c.name?,
                    course_code: c.course_code,
                    start_at: c.start_at,
                    end_at: c.end_at,
                })
            })
            .collect())
    }

    async fn fetch_assignments(&self, course_id: i64) -> Result<Vec<AssignmentUpsert>, AppError> {
        let path = format!("courses/{course_id}/assignments");
        let pages: Vec<dto::AssignmentDto> = self.get_paginated(&path).await?;
        Ok(pages
            .into_iter()
            .filter_map(|a| {
                Some(AssignmentUpsert {
                    id: a.id?,
                    course_id,
                    name: a.name?,
                    due_at: a.due_at,
                    html_url: a.html_url,
                    submitted: a.has_submitted_submissions,
                })
            })
            .collect())
    }
}

/// Returns no records. Stands in when no Canvas token is configured.
pub struct NoopCanvasClient;

#[async_trait]
impl CanvasClient for NoopCanvasClient {
    async fn fetch_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_assignments(&self, _course_id: i64) -> Result<Vec<AssignmentUpsert>, AppError> {
        Ok(Vec::new())
    }
}
