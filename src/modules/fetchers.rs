use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use percent_encoding::percent_decode_str;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;

use crate::modules::contract::CSRF_HEADER;
use crate::modules::error::DashboardError;
use crate::modules::serialize::DashboardConfig;
use crate::modules::types::{ApiReply, ContentAnalysis, ProfileData};

/// The dashboard endpoints the controller talks to.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, DashboardError>;
    async fn analyze_content(&self, content: &str) -> Result<ContentAnalysis, DashboardError>;
    async fn claim_offer(&self, offer_id: &str) -> Result<(), DashboardError>;
}

/// Value of cookie `name` in a `Cookie` header string, percent-decoded.
pub fn read_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let value = pair.trim().strip_prefix(name)?.strip_prefix('=')?;
        Some(percent_decode_str(value).decode_utf8_lossy().into_owned())
    })
}

fn unwrap_reply<T>(reply: ApiReply<T>) -> Result<T, DashboardError> {
    if !reply.success {
        return Err(DashboardError::Rejected {
            message: reply.message.filter(|m| !m.is_empty()),
        });
    }
    reply.data.ok_or(DashboardError::MissingPayload)
}

/// HTTP implementation of [`Backend`] with a cookie jar holding the CSRF cookie.
pub struct DashboardClient {
    client: Client,
    jar: Arc<Jar>,
    base: Url,
    config: DashboardConfig,
}

impl DashboardClient {
    pub fn new(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let base = Url::parse(&config.base_url)?;
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("haip-dashboard/0.1"));

        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            jar,
            base,
            config: config.clone(),
        })
    }

    /// Adds a `name=value` cookie for the dashboard origin.
    pub fn seed_cookie(&self, cookie: &str) {
        self.jar.add_cookie_str(cookie, &self.base);
    }

    pub fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base)?;
        let header = header.to_str().ok()?;
        read_cookie(header, &self.config.csrf_cookie)
    }

    /// GETs a dashboard page. Cookies it sets (the CSRF cookie among them)
    /// land in the jar.
    pub async fn load_page(&self, path: &str) -> Result<String, DashboardError> {
        let url = self.base.join(path)?;
        debug!("loading page {url}");
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }

    async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, DashboardError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.base.join(path)?;
        let mut request = self.client.post(url.clone());
        match self.csrf_token() {
            Some(token) => request = request.header(CSRF_HEADER, token),
            None => warn!(
                "no {} cookie for {}, sending without {CSRF_HEADER}",
                self.config.csrf_cookie, self.base
            ),
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("POST {url}");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!("POST {url} -> {status}");

        let reply: ApiReply<T> = serde_json::from_str(&text)?;
        unwrap_reply(reply)
    }
}

#[async_trait]
impl Backend for DashboardClient {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, DashboardError> {
        let body = json!({ "username": username });
        self.post(&self.config.endpoints.fetch_profile, Some(&body)).await
    }

    async fn analyze_content(&self, content: &str) -> Result<ContentAnalysis, DashboardError> {
        let body = json!({ "content": content });
        self.post(&self.config.endpoints.analyze_content, Some(&body)).await
    }

    async fn claim_offer(&self, offer_id: &str) -> Result<(), DashboardError> {
        let path = self.config.endpoints.claim_path(offer_id);
        let reply: Result<IgnoredAny, DashboardError> =
            self.post::<serde_json::Value, _>(&path, None).await;
        match reply {
            Ok(_) | Err(DashboardError::MissingPayload) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
