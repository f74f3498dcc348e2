//! Microsoft Graph REST client.
//!
//! Clients are constructed per session, bound to the session's pooled
//! transport and current access token. The API surface (default `v1.0` or
//! the `beta` preview surface) and the authority domain select the base URL:
//! `https://graph.microsoft{domain}/{version}`.

use crate::auth::errors::AuthError;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Graph API surface a client targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ApiSurface {
    /// The general-availability surface
    #[default]
    V1,
    /// The preview surface
    Beta,
}

impl ApiSurface {
    /// URL path segment for this surface.
    pub fn version_segment(&self) -> &'static str {
        match self {
            ApiSurface::V1 => "v1.0",
            ApiSurface::Beta => "beta",
        }
    }
}

impl fmt::Display for ApiSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version_segment())
    }
}

/// OData error envelope returned by Graph.
#[derive(Debug, Deserialize)]
struct ODataError {
    error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    code: String,
    message: String,
}

/// Paginated OData list response.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// A Graph API client bound to one session's transport and token.
///
/// Rebuilt by the owning session whenever its token is replaced.
#[derive(Clone, Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    bearer: String,
    base_url: String,
}

impl GraphClient {
    pub(crate) fn new(
        http_client: reqwest::Client,
        token: &str,
        authority_domain: &str,
        surface: ApiSurface,
    ) -> Self {
        Self {
            http_client,
            bearer: format!("Bearer {token}"),
            base_url: format!(
                "https://graph.microsoft{authority_domain}/{}",
                surface.version_segment()
            ),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("https://") {
            // nextLink URLs come back absolute
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET a single resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        let response = self
            .http_client
            .get(self.url(path))
            .header(AUTHORIZATION, &self.bearer)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;
        Self::decode(response).await
    }

    /// GET a collection, following `@odata.nextLink` pagination to the end.
    pub async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, AuthError> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path));
        while let Some(url) = next {
            let page: ODataResponse<T> = self.get(&url).await?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    /// POST a resource, returning the decoded response body.
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let response = self
            .http_client
            .post(self.url(path))
            .header(AUTHORIZATION, &self.bearer)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AuthError::Response(format!("failed to decode Graph response: {e}")));
        }
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ODataError>(&body) {
            Ok(odata) => Err(AuthError::Response(format!(
                "Graph API error ({status}): {} - {}",
                odata.error.code, odata.error.message
            ))),
            Err(_) => Err(AuthError::Response(format!(
                "Graph API error ({status}): {body}"
            ))),
        }
    }
}
