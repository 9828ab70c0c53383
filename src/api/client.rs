use super::auth::{TgtManager, TGT_HEADER};
use super::endpoints::{Endpoint, RequestMethod};
use crate::config::settings::Settings;
use crate::core::cache::DiskCache;
use crate::core::processors::extract_content;
use crate::domain::model::ApiEnvelope;
use crate::utils::error::{EpiasError, Result};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on pages walked by [`EpiasClient::get_paginated`].
pub const MAX_PAGES: u32 = 100;

/// Authenticated JSON client for the transparency platform.
#[derive(Debug, Clone)]
pub struct EpiasClient {
    http: Client,
    base_url: String,
    auth: Arc<TgtManager>,
    cache: Option<Arc<DiskCache>>,
    max_retries: u32,
    retry_delay: Duration,
    default_page_size: u32,
    max_page_size: u32,
}

impl EpiasClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = Client::builder().timeout(settings.api_timeout()).build()?;
        let auth = TgtManager::from_settings(http.clone(), settings)?;

        let cache = settings.cache.enabled.then(|| {
            Arc::new(DiskCache::new(&settings.cache.dir, settings.cache_ttl()))
        });

        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            auth: Arc::new(auth),
            cache,
            max_retries: settings.api_max_retries,
            retry_delay: settings.retry_delay(),
            default_page_size: settings.default_page_size,
            max_page_size: settings.max_page_size,
        })
    }

    pub fn with_cache(mut self, cache: Option<DiskCache>) -> Self {
        self.cache = cache.map(Arc::new);
        self
    }

    pub fn cache(&self) -> Option<&DiskCache> {
        self.cache.as_deref()
    }

    pub async fn get(&self, endpoint: Endpoint) -> Result<Value> {
        self.call(RequestMethod::Get, endpoint.path(), None).await
    }

    pub async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Value> {
        self.call(RequestMethod::Post, endpoint.path(), Some(body)).await
    }

    /// Dispatch on the endpoint's catalogue method.
    pub async fn request(&self, endpoint: Endpoint, body: Option<&Value>) -> Result<Value> {
        match endpoint.method() {
            RequestMethod::Get => self.call(RequestMethod::Get, endpoint.path(), None).await,
            RequestMethod::Post => {
                let empty = json!({});
                self.call(RequestMethod::Post, endpoint.path(), Some(body.unwrap_or(&empty)))
                    .await
            }
        }
    }

    /// Walk a paged POST endpoint and return every item.
    ///
    /// Stops on an empty or short page, once the reported total is reached,
    /// or after [`MAX_PAGES`] pages.
    pub async fn get_paginated(&self, endpoint: Endpoint, body: &Value) -> Result<Vec<Value>> {
        let mut body = match body {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(EpiasError::ValidationError {
                    message: format!("paginated request body must be an object, got {}", other),
                })
            }
        };

        let requested = body
            .get("page")
            .and_then(|p| p.get("size"))
            .and_then(Value::as_u64)
            .map(|s| s as u32)
            .unwrap_or(self.default_page_size);
        let size = requested.clamp(1, self.max_page_size.max(1));

        let mut items = Vec::new();
        let mut number = 1;
        loop {
            body.insert("page".to_string(), json!({ "number": number, "size": size }));
            let response = self
                .call(RequestMethod::Post, endpoint.path(), Some(&Value::Object(body.clone())))
                .await?;

            let total = reported_total(&response);
            let batch = extract_content(&response);
            let count = batch.len();
            items.extend(batch);

            tracing::debug!(
                "{} page {}: {} items (total {:?})",
                endpoint.path(),
                number,
                count,
                total
            );

            if count == 0 || count < size as usize {
                break;
            }
            if total.is_some_and(|t| items.len() as u64 >= t) {
                break;
            }
            if number >= MAX_PAGES {
                tracing::warn!("{}: stopped after {} pages", endpoint.path(), MAX_PAGES);
                break;
            }
            number += 1;
        }

        Ok(items)
    }

    async fn call(&self, method: RequestMethod, path: &str, body: Option<&Value>) -> Result<Value> {
        let key = DiskCache::key(method.as_str(), path, body);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                return Ok(hit);
            }
        }

        let mut attempt = 0;
        let value = loop {
            match self.send_authenticated(method, path, body).await {
                Ok(value) => break value,
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} {} failed ({}), retry {}/{}",
                        method.as_str(),
                        path,
                        e,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, &value).await {
                tracing::warn!("Could not write cache entry for {}: {}", path, e);
            }
        }
        Ok(value)
    }

    /// One attempt; a 401/406 triggers a single ticket refresh and repeat.
    async fn send_authenticated(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let ticket = self.auth.current(false).await?;
        let response = self.send(method, path, body, &ticket).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_ACCEPTABLE {
            tracing::warn!("{} answered {}, refreshing TGT", path, status.as_u16());
            let ticket = self.auth.current_after_rejection(&ticket).await?;
            let response = self.send(method, path, body, &ticket).await?;
            return Self::decode(path, response).await;
        }

        Self::decode(path, response).await
    }

    async fn send(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&Value>,
        ticket: &str,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method.as_str(), url);

        let builder = match method {
            RequestMethod::Get => self.http.get(&url),
            RequestMethod::Post => self.http.post(&url),
        }
        .header(TGT_HEADER, ticket)
        .header(reqwest::header::ACCEPT, "application/json")
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .header(reqwest::header::ACCEPT_LANGUAGE, "en");

        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };

        Ok(builder.send().await?)
    }

    async fn decode(path: &str, response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message: String = text.chars().take(500).collect();
            return Err(EpiasError::HttpStatusError {
                endpoint: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = response.json().await?;
        if value.get("resultCode").is_some() {
            let envelope: ApiEnvelope = serde_json::from_value(value.clone())?;
            if !envelope.is_success() {
                return Err(EpiasError::ProcessingError {
                    message: format!(
                        "{} rejected the request ({}): {}",
                        path,
                        envelope.result_code.unwrap_or_default(),
                        envelope.result_description.unwrap_or_default()
                    ),
                });
            }
        }
        Ok(value)
    }
}

fn reported_total(response: &Value) -> Option<u64> {
    let body = response.get("body").unwrap_or(response);
    body.get("page")
        .and_then(|p| p.get("total"))
        .or_else(|| body.get("totalElements"))
        .and_then(Value::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_total_locations() {
        assert_eq!(
            reported_total(&json!({"body": {"page": {"total": 250}, "content": []}})),
            Some(250)
        );
        assert_eq!(reported_total(&json!({"totalElements": 7, "items": []})), Some(7));
        assert_eq!(reported_total(&json!({"items": []})), None);
    }
}
