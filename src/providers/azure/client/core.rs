use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Credential;
use crate::error::{ExporterError, Result};

pub(super) const API_VERSION: &str = "7.0";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated Azure DevOps REST client for one organization/project.
///
/// Every call is a single GET with no retries; the refresh scheduler owns
/// the retry policy.
pub struct AzureDevOpsClient {
    client: Client,
    credential: Credential,
}

impl AzureDevOpsClient {
    /// `timeout` bounds each request end to end; see [`REQUEST_TIMEOUT`].
    pub fn new(credential: Credential, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ado-exporter/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ExporterError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, credential })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Builds `{base}/{organization}/{project}/_apis/{path}?api-version=..`.
    pub(super) fn api_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!(
            "{}/{}/{}/_apis/{}",
            self.credential.base_url().trim_end_matches('/'),
            self.credential.organization(),
            self.credential.project(),
            path
        );

        let mut url = Url::parse(&raw)
            .map_err(|e| ExporterError::Config(format!("Invalid API URL '{raw}': {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", API_VERSION);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Issues an authenticated GET and decodes the JSON body.
    ///
    /// Basic auth with an empty username and the access token as password.
    pub(super) async fn get_json<T>(&self, url: Url, entity: &'static str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .basic_auth("", Some(self.credential.access_token()))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ExporterError::ApiStatus {
                code: status.as_u16(),
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|source| ExporterError::Decode { entity, source })
    }
}
