use crate::domain::payment::{PaymentAction, PaymentId};
use crate::domain::ports::PaymentAuthority;
use crate::domain::user::VerifiedUser;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, Url};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.minepi.com";

const APP_SECRET_HEADER: &str = "X-Pi-App-Secret";

/// Connection settings for the Pi Platform API.
#[derive(Debug, Clone)]
pub struct PiApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub app_secret: Option<String>,
    pub timeout: Duration,
}

/// HTTP client for the Pi Platform API.
///
/// Payment calls authenticate with the service key (`Authorization: Key ...`),
/// never with an end user's token.
pub struct PiApiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    app_secret: Option<String>,
}

impl PiApiClient {
    pub fn new(config: PiApiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RelayError::Config("Pi API key is empty".to_string()));
        }

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            RelayError::Config(format!("invalid Pi API base URL '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::Config(format!(
                "Pi API base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
            app_secret: config.app_secret,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::internal("Pi API base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RelayError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PaymentAuthority for PiApiClient {
    async fn forward(&self, payment_id: &PaymentId, action: PaymentAction) -> Result<()> {
        let url = self.endpoint(&["v2", "payments", payment_id.as_str(), action.as_str()])?;
        debug!(%url, "Forwarding payment action");

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn verify_user(&self, access_token: &str) -> Result<VerifiedUser> {
        let url = self.endpoint(&["v2", "me"])?;

        let mut request = self.http.get(url).bearer_auth(access_token);
        if let Some(secret) = &self.app_secret {
            request = request.header(APP_SECRET_HEADER, secret);
        }

        let response = Self::ensure_success(request.send().await?).await?;
        Ok(response.json::<VerifiedUser>().await?)
    }
}
