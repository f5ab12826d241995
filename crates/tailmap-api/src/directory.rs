// Directory API HTTP client
//
// Wraps `reqwest::Client` with bearer auth and tailnet-scoped URL
// construction. The directory exposes one read surface we care about:
// the device roster for a tailnet.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;

const DEFAULT_BASE_URL: &str = "https://api.tailscale.com/api/v2";

/// One device record as the directory reports it.
///
/// Only the fields the topology layer consumes are modeled; the API
/// returns many more, which serde ignores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryDevice {
    pub id: String,
    pub name: String,
    pub hostname: String,
    #[serde(default)]
    pub addresses: Vec<String>,
    pub os: String,
    #[serde(default)]
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceListResponse {
    devices: Vec<DirectoryDevice>,
}

/// Async client for the tailnet directory API.
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: Url,
    tailnet: String,
    api_key: SecretString,
}

impl DirectoryClient {
    /// Create a client against the public directory endpoint.
    pub fn new(tailnet: impl Into<String>, api_key: SecretString) -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_URL, tailnet, api_key)
    }

    /// Create a client against a custom base URL (tests, proxies).
    pub fn with_base_url(
        base_url: &str,
        tailnet: impl Into<String>,
        api_key: SecretString,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url).map_err(|e| Error::Deserialization {
            message: format!("invalid base URL: {e}"),
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            tailnet: tailnet.into(),
            api_key,
        })
    }

    /// The tailnet this client is scoped to.
    pub fn tailnet(&self) -> &str {
        &self.tailnet
    }

    /// List every device in the tailnet.
    ///
    /// Some key scopes only accept the tailnet name without its
    /// `.ts.net` suffix. On HTTP 403 the request is retried once with
    /// the suffix stripped before the error is surfaced.
    pub async fn list_devices(&self) -> Result<Vec<DirectoryDevice>, Error> {
        match self.fetch_devices(&self.tailnet).await {
            Ok(devices) => Ok(devices),
            Err(Error::Api { status: 403, .. }) if self.tailnet.ends_with(".ts.net") => {
                let short = self.tailnet.trim_end_matches(".ts.net");
                warn!(tailnet = short, "403 from directory, retrying with short tailnet name");
                self.fetch_devices(short).await
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_devices(&self, tailnet: &str) -> Result<Vec<DirectoryDevice>, Error> {
        let url = self.device_list_url(tailnet)?;
        debug!(%url, "GET device roster");

        let resp = self
            .http
            .get(url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let body = resp.text().await?;
        let parsed: DeviceListResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
            })?;
        Ok(parsed.devices)
    }

    fn device_list_url(&self, tailnet: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/tailnet/{tailnet}/devices");
        Url::parse(&full).map_err(|e| Error::Deserialization {
            message: format!("invalid device list URL: {e}"),
        })
    }
}

fn api_error(status: StatusCode, body: &str) -> Error {
    Error::Api {
        status: status.as_u16(),
        message: preview(body).to_owned(),
    }
}

/// First 200 characters of a response body, char-boundary safe.
fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
