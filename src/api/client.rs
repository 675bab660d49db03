use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::parse::{api_errors, parse_fixtures, parse_team_stats};
use super::source::FootballDataSource;
use crate::db::models::{Match, TeamStats};

/// Longest we are willing to honour a `Retry-After` header.
const MAX_RETRY_AFTER_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API access denied (403): invalid key or inactive subscription")]
    AccessDenied,
    #[error("API rate limit exceeded (429)")]
    RateLimited,
    #[error("API returned errors: {0}")]
    Api(String),
    #[error("invalid API response format: missing 'response'")]
    InvalidFormat,
    #[error("no statistics for team {0}")]
    NoStatistics(i64),
    #[error("API request failed with status {0}")]
    Status(StatusCode),
    #[error("gave up after {0} attempts")]
    RetriesExhausted(u32),
}

/// Client for the API-Football v3 REST API.
#[derive(Clone)]
pub struct FootballApiClient {
    http: Client,
    base_url: String,
    api_host: String,
    api_key: String,
    max_retries: u32,
    /// Base unit for exponential back-off; shortened in tests
    backoff_unit: Duration,
}

impl FootballApiClient {
    pub fn new(base_url: &str, api_host: &str, api_key: &str, max_retries: u32) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        info!(
            "FootballApiClient initialised ({}), key length {}",
            base_url,
            api_key.len()
        );
        Ok(FootballApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_host: api_host.to_string(),
            api_key: api_key.to_string(),
            max_retries: max_retries.max(1),
            backoff_unit: Duration::from_secs(1),
        })
    }

    #[cfg(test)]
    fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    fn url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params.iter().map(|(k, v)| (*k, v.as_str())))
        };
        url.with_context(|| format!("Invalid API URL: {}", raw))
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("x-rapidapi-host", &self.api_host)
            .header("x-rapidapi-key", &self.api_key)
    }

    /// Check that the key is accepted, using the cheap `/timezone` endpoint.
    pub async fn verify_connection(&self) -> Result<()> {
        info!("Verifying API connection...");
        let resp = self
            .get(self.url("timezone", &[])?)
            .send()
            .await
            .context("API connection check failed")?;

        let status = resp.status();
        info!("API status code: {}", status);
        match status {
            StatusCode::FORBIDDEN => return Err(ApiError::AccessDenied.into()),
            StatusCode::TOO_MANY_REQUESTS => return Err(ApiError::RateLimited.into()),
            s if !s.is_success() => return Err(ApiError::Status(s).into()),
            _ => {}
        }

        let remaining = resp
            .headers()
            .get("X-RateLimit-requests-Remaining")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        info!("API connection verified, requests remaining: {}", remaining);
        Ok(())
    }

    /// GET an endpoint, retrying on rate limits and transport failures.
    /// In-band API errors and malformed envelopes are not retried.
    pub async fn make_request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = self.url(endpoint, params)?;

        for attempt in 0..self.max_retries {
            let last = attempt + 1 == self.max_retries;
            debug!("API request {} (attempt {}/{})", url, attempt + 1, self.max_retries);

            let resp = match self.get(url.clone()).send().await {
                Ok(r) => r,
                Err(e) => {
                    error!(
                        "Request error on attempt {}/{}: {}",
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    if last {
                        break;
                    }
                    self.backoff(attempt).await;
                    continue;
                }
            };

            let status = resp.status();
            if status == StatusCode::OK {
                let data: Value = resp.json().await.context("Failed to parse API response")?;
                if let Some(errors) = api_errors(&data) {
                    error!("API returned errors: {}", errors);
                    return Err(ApiError::Api(errors).into());
                }
                if data.get("response").is_none() {
                    error!("Invalid API response format from {}", endpoint);
                    return Err(ApiError::InvalidFormat.into());
                }
                return Ok(data);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(60)
                    .min(MAX_RETRY_AFTER_SECS);
                if last {
                    return Err(ApiError::RateLimited.into());
                }
                warn!("Rate limit hit, retrying after {}s", retry_after);
                tokio::time::sleep(self.backoff_unit * retry_after as u32).await;
                continue;
            }

            if status == StatusCode::FORBIDDEN {
                return Err(ApiError::AccessDenied.into());
            }

            let body = resp.text().await.unwrap_or_default();
            error!(
                "API error {} on attempt {}/{}: {}",
                status,
                attempt + 1,
                self.max_retries,
                body
            );
            if last {
                return Err(ApiError::Status(status).into());
            }
            self.backoff(attempt).await;
        }

        error!("Max retries reached for {}, giving up", endpoint);
        Err(ApiError::RetriesExhausted(self.max_retries).into())
    }

    async fn backoff(&self, attempt: u32) {
        let base = self.backoff_unit * 2u32.pow(attempt.min(6));
        let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis().max(1) as u64 / 4);
        let wait = base + Duration::from_millis(jitter_ms);
        info!("Waiting {:?} before retry", wait);
        tokio::time::sleep(wait).await;
    }

    pub async fn get_fixtures(
        &self,
        league_id: i64,
        season: i32,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Value> {
        let mut params = vec![("league", league_id.to_string()), ("season", season.to_string())];
        if let Some(from) = from {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = to {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        self.make_request("fixtures", &params).await
    }

    pub async fn get_head_to_head(&self, team1_id: i64, team2_id: i64, last: u32) -> Result<Value> {
        let params = [
            ("h2h", format!("{}-{}", team1_id, team2_id)),
            ("last", last.to_string()),
        ];
        self.make_request("fixtures/headtohead", &params).await
    }

    pub async fn get_team_statistics(&self, team_id: i64, league_id: i64, season: i32) -> Result<Value> {
        let params = [
            ("team", team_id.to_string()),
            ("league", league_id.to_string()),
            ("season", season.to_string()),
        ];
        self.make_request("teams/statistics", &params).await
    }
}

#[async_trait]
impl FootballDataSource for FootballApiClient {
    fn name(&self) -> &str {
        "API-Football"
    }

    async fn fixtures(
        &self,
        league_id: i64,
        season: i32,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Match>> {
        let raw = self.get_fixtures(league_id, season, Some(from), Some(to)).await?;
        Ok(parse_fixtures(&raw))
    }

    async fn team_stats(&self, team_id: i64, league_id: i64, season: i32) -> Result<TeamStats> {
        let raw = self.get_team_statistics(team_id, league_id, season).await?;
        parse_team_stats(team_id, &raw).ok_or_else(|| {
            warn!("No statistics returned for team {} in league {} ({})", team_id, league_id, season);
            ApiError::NoStatistics(team_id).into()
        })
    }

    async fn head_to_head(&self, team1_id: i64, team2_id: i64, last: u32) -> Result<Vec<Match>> {
        let raw = self.get_head_to_head(team1_id, team2_id, last).await?;
        Ok(parse_fixtures(&raw))
    }
}
