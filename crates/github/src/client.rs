//! GitHub client implementation
//!
//! Talks to the REST contents API and implements the ContentProvider trait
//! from ghstat-core. HTTP failures are classified here, once, into the core
//! error taxonomy so the resilience layer can act on them.

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Deserialize;
use url::Url;

use ghstat_core::{ContentEntry, ContentKind, ContentProvider, Error, GitHubConfig, Result};

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// GitHub contents API client for one repository
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base: Url,
    owner: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// A directory answers with an array, a file path with a single object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Directory(Vec<RawEntry>),
    Single(RawEntry),
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

impl GitHubClient {
    /// Create a client from the `[github]` configuration section
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| Error::Config(format!("invalid api_url '{}': {e}", config.api_url)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            API_VERSION_HEADER,
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(token) = config.token.as_deref().filter(|t| !t.trim().is_empty()) {
            // Authenticated requests get a much higher rate limit
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| Error::Config("token contains invalid characters".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let user_agent = format!("{}/{}", config.product_name, config.product_version);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        })
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}`, root mapped to no path
    fn contents_url(&self, path: &str) -> Result<Url> {
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();

        let mut url = format!(
            "{}/repos/{}/{}/contents",
            self.base.as_str().trim_end_matches('/'),
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
        );
        if !segments.is_empty() {
            url.push('/');
            url.push_str(&segments.join("/"));
        }

        Url::parse(&url).map_err(|e| Error::Config(format!("invalid contents URL '{url}': {e}")))
    }

    async fn get(&self, path: &str, accept: &'static str) -> Result<reqwest::Response> {
        let url = self.contents_url(path)?;
        tracing::debug!(url = %url, "GET");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(classify_response(status, &headers, &body, path))
    }
}

#[async_trait]
impl ContentProvider for GitHubClient {
    async fn list_directory(&self, path: &str) -> Result<Vec<ContentEntry>> {
        let body = self
            .get(path, ACCEPT_JSON)
            .await?
            .text()
            .await
            .map_err(transport_error)?;

        let raw = match serde_json::from_str::<Listing>(&body)? {
            Listing::Directory(entries) => entries,
            Listing::Single(entry) => vec![entry],
        };

        Ok(raw.into_iter().filter_map(into_entry).collect())
    }

    async fn get_raw_content(&self, path: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get(path, ACCEPT_RAW)
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;

        Ok(bytes.to_vec())
    }
}

fn into_entry(raw: RawEntry) -> Option<ContentEntry> {
    let kind = match raw.kind.as_str() {
        "dir" => ContentKind::Directory,
        "file" => ContentKind::File,
        other => {
            tracing::debug!(path = %raw.path, kind = other, "Skipping unsupported entry");
            return None;
        }
    };

    Some(ContentEntry {
        path: raw.path,
        name: raw.name,
        kind,
    })
}

/// Failures before a status line was received
fn transport_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::Config(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

/// Map a non-success response onto the core error taxonomy
fn classify_response(status: StatusCode, headers: &HeaderMap, body: &str, path: &str) -> Error {
    let message = serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.to_string()
            } else {
                trimmed.to_string()
            }
        });

    if let Some(reset_at) = rate_limit_reset(status, headers) {
        return Error::RateLimited { reset_at, message };
    }

    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            Error::Unavailable(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
        StatusCode::NOT_FOUND => Error::NotFound(path.to_string()),
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Reset instant for primary (`x-ratelimit-*`) and secondary (`retry-after`) limits
fn rate_limit_reset(status: StatusCode, headers: &HeaderMap) -> Option<Timestamp> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };

    if let Some(secs) = header(RETRY_AFTER.as_str()).and_then(|v| v.parse::<i64>().ok()) {
        return Timestamp::now()
            .checked_add(SignedDuration::from_secs(secs))
            .ok();
    }

    if header(RATELIMIT_REMAINING) == Some("0") {
        let reset = header(RATELIMIT_RESET)
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| Timestamp::from_second(secs).ok());
        return Some(reset.unwrap_or_else(Timestamp::now));
    }

    // A bare 429 is still a rate limit; the retry policy applies its minimum wait.
    (status == StatusCode::TOO_MANY_REQUESTS).then(Timestamp::now)
}
